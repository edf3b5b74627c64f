use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{DataPathError, GlobalDataPath, LocalDataPath, MemoryLayout};

/// A cache for data path compilation.
///
/// Compiling a path re-walks its debug-info type chain, which is wasted work if the same
/// path string is evaluated every frame (as is typical for a TAS editor's watch list).
#[derive(Debug, Default)]
pub struct DataPathCache {
    globals: Mutex<HashMap<String, Arc<GlobalDataPath>>>,
    locals: Mutex<HashMap<String, Arc<LocalDataPath>>>,
}

impl DataPathCache {
    /// Compile (or fetch from cache) a global data path.
    pub fn global(
        &self,
        layout: &impl MemoryLayout,
        source: &str,
    ) -> Result<Arc<GlobalDataPath>, DataPathError> {
        let mut cache = self.globals.lock().unwrap();
        match cache.get(source) {
            Some(path) => Ok(Arc::clone(path)),
            None => {
                let path = Arc::new(GlobalDataPath::compile(layout, source)?);
                cache.insert(source.to_string(), path.clone());
                Ok(path)
            }
        }
    }

    /// Compile (or fetch from cache) a local data path.
    pub fn local(
        &self,
        layout: &impl MemoryLayout,
        source: &str,
    ) -> Result<Arc<LocalDataPath>, DataPathError> {
        let mut cache = self.locals.lock().unwrap();
        match cache.get(source) {
            Some(path) => Ok(Arc::clone(path)),
            None => {
                let path = Arc::new(LocalDataPath::compile(layout, source)?);
                cache.insert(source.to_string(), path.clone());
                Ok(path)
            }
        }
    }
}
