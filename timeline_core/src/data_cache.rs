use std::collections::HashMap;

use lru::LruCache;
use timeline_data_path::GlobalDataPath;
use timeline_types::Value;

use crate::State;

/// A cache for data path reads, keyed by frame, with the goal of minimizing calls to
/// [SlotManager::frame](crate::SlotManager::frame).
///
/// Besides caching individual values, it preloads every "hot" path (one that has been read at
/// least once) as soon as a frame is visited for the first time, since the frame's slot is
/// already paid for at that point.
#[derive(Debug)]
pub struct DataCache {
    path_intern: HashMap<String, usize>,
    path_unintern: HashMap<usize, GlobalDataPath>,
    hot_paths: LruCache<usize, ()>,
    cache: LruCache<u32, HashMap<usize, Value>>,
}

impl DataCache {
    /// Construct an empty data cache.
    pub fn new() -> Self {
        Self {
            path_intern: HashMap::new(),
            path_unintern: HashMap::new(),
            hot_paths: LruCache::new(100),
            cache: LruCache::new(100),
        }
    }

    fn intern(&mut self, path: &GlobalDataPath) -> usize {
        match self.path_intern.get(path.source()) {
            Some(&key) => key,
            None => {
                let key = self.path_intern.len();
                self.path_intern.insert(path.source().to_owned(), key);
                self.path_unintern.insert(key, path.clone());
                key
            }
        }
    }

    fn unintern(&self, key: usize) -> &GlobalDataPath {
        self.path_unintern.get(&key).expect("interned path key")
    }

    /// Look up a cached value for `path` at `frame`, if present.
    pub fn get(&mut self, frame: u32, path: &GlobalDataPath) -> Option<Value> {
        let path_key = self.intern(path);
        self.hot_paths.put(path_key, ());
        self.cache
            .get(&frame)
            .and_then(|cache| cache.get(&path_key))
            .cloned()
    }

    /// Record a value for `path` at `frame`.
    pub fn insert(&mut self, frame: u32, path: &GlobalDataPath, value: Value) {
        let path_key = self.intern(path);
        let cache = match self.cache.get_mut(&frame) {
            Some(cache) => cache,
            None => {
                self.cache.put(frame, HashMap::new());
                self.cache.peek_mut(&frame).expect("just inserted")
            }
        };
        cache.insert(path_key, value);
    }

    /// Eagerly read every hot path for `state`'s frame, if it isn't already cached.
    pub fn preload_frame(&mut self, state: &impl State) {
        if self.cache.contains(&state.frame()) {
            return;
        }
        let mut cache = HashMap::new();
        for (&path_key, ()) in self.hot_paths.iter() {
            let path = self.unintern(path_key);
            // Ignore errors so that they surface when the path is directly requested instead.
            if let Ok(value) = state.path_read(path) {
                cache.insert(path_key, value);
            }
        }
        self.cache.put(state.frame(), cache);
    }

    /// Drop every cached entry at or after `invalidated_frame`.
    pub fn invalidate_frame(&mut self, invalidated_frame: u32) {
        let stale_frames: Vec<u32> = self
            .cache
            .iter()
            .filter(|&(&frame, _)| frame >= invalidated_frame)
            .map(|(&frame, _)| frame)
            .collect();
        for frame in stale_frames {
            self.cache.pop(&frame);
        }
    }
}

impl Default for DataCache {
    fn default() -> Self {
        Self::new()
    }
}
