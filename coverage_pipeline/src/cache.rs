//! Load-once storage for datasets.
//!
//! The sources do not change while the program runs, so a dataset is built
//! at most once per source and then shared read-only.

use log::{debug, info};

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use crate::config::Dataset;

/// Identifies a source: where it comes from and how it is read.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct SourceKey {
    pub location: String,
    pub schema_id: String,
}

impl SourceKey {
    pub fn new(location: &str, schema_id: &str) -> SourceKey {
        SourceKey {
            location: location.to_string(),
            schema_id: schema_id.to_string(),
        }
    }
}

/// Holds the datasets that have been loaded so far.
///
/// Loading happens under the lock, so concurrent callers asking for the same
/// source wait for the first load instead of repeating it. Failed loads are
/// not remembered.
///
/// The lock is shared by all the keys: while a source loads, lookups of
/// every other source wait too. Callers that load sources from several
/// workers should keep one cache per source.
pub struct DatasetCache<K = SourceKey> {
    entries: Mutex<HashMap<K, Arc<Dataset>>>,
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> DatasetCache<K> {
    pub fn new() -> DatasetCache<K> {
        DatasetCache {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the dataset for `key`, calling `loader` if it is not present.
    pub fn get_or_load<E, F>(&self, key: &K, loader: F) -> Result<Arc<Dataset>, E>
    where
        F: FnOnce() -> Result<Dataset, E>,
    {
        // A panic in another loader does not corrupt the map itself.
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ds) = entries.get(key) {
            debug!("get_or_load: cache hit for {:?}", key);
            return Ok(ds.clone());
        }
        info!("get_or_load: loading {:?}", key);
        let ds = Arc::new(loader()?);
        entries.insert(key.clone(), ds.clone());
        Ok(ds)
    }

    pub fn get(&self, key: &K) -> Option<Arc<Dataset>> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone + std::fmt::Debug> Default for DatasetCache<K> {
    fn default() -> Self {
        DatasetCache::new()
    }
}
