use std::sync::Arc;

use timeline_layout::DataLayout;
use timeline_memory::SymbolLookup;

use crate::{DataError, DataPathCache, GlobalDataPath, LocalDataPath};

/// Combines a [DataLayout] with a way to look up global variable addresses, and caches
/// compiled data paths so repeated lookups of the same path avoid re-parsing.
pub trait MemoryLayout {
    /// The symbol lookup used to resolve global variable addresses.
    type SymbolLookup: SymbolLookup;

    /// The data layout describing the binary's types, globals, and constants.
    fn data_layout(&self) -> &DataLayout;

    /// The symbol lookup backing global variable address resolution.
    fn symbol_lookup(&self) -> &Self::SymbolLookup;

    /// Compile (or fetch from cache) a global data path.
    fn global_path(&self, source: &str) -> Result<Arc<GlobalDataPath>, DataError>;

    /// Compile (or fetch from cache) a local data path.
    fn local_path(&self, source: &str) -> Result<Arc<LocalDataPath>, DataError>;
}

/// A straightforward [MemoryLayout] implementation backed by an owned layout, symbol lookup,
/// and path cache.
#[derive(Debug)]
pub struct MemoryLayoutImpl<S> {
    data_layout: Arc<DataLayout>,
    symbol_lookup: Arc<S>,
    path_cache: DataPathCache,
}

impl<S> MemoryLayoutImpl<S> {
    /// Construct a layout view from an existing data layout and symbol lookup.
    pub fn new(data_layout: Arc<DataLayout>, symbol_lookup: Arc<S>) -> Self {
        Self {
            data_layout,
            symbol_lookup,
            path_cache: DataPathCache::default(),
        }
    }
}

impl<S> MemoryLayout for MemoryLayoutImpl<S>
where
    S: SymbolLookup,
{
    type SymbolLookup = S;

    fn data_layout(&self) -> &DataLayout {
        &self.data_layout
    }

    fn symbol_lookup(&self) -> &Self::SymbolLookup {
        &self.symbol_lookup
    }

    fn global_path(&self, source: &str) -> Result<Arc<GlobalDataPath>, DataError> {
        Ok(self.path_cache.global(self, source)?)
    }

    fn local_path(&self, source: &str) -> Result<Arc<LocalDataPath>, DataError> {
        Ok(self.path_cache.local(self, source)?)
    }
}
