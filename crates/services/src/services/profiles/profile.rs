use std::{
    path::{Path, PathBuf},
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use serde_json::{Map, Value};

use super::store::ProfileError;

/// A disk-persisted configuration document.
///
/// Owns its key/value map; callers mutate through `set`/`remove`/`clear` and
/// persist with an explicit `save`. Instances are handed out as `Arc`s by the
/// [`ProfileStore`](super::ProfileStore) cache, so every caller for a given
/// path shares the same document.
#[derive(Debug)]
pub struct Profile {
    path: PathBuf,
    data: RwLock<Map<String, Value>>,
}

impl Profile {
    pub(crate) fn new(path: PathBuf, data: Map<String, Value>) -> Self {
        Self {
            path,
            data: RwLock::new(data),
        }
    }

    /// Resolved on-disk location of this profile.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.write().insert(key.into(), value);
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    /// Snapshot of the current key/value state.
    pub fn data(&self) -> Map<String, Value> {
        self.read().clone()
    }

    /// Serialize the current state to disk as pretty JSON, overwriting the
    /// whole file. Write failures propagate.
    pub fn save(&self) -> Result<(), ProfileError> {
        super::store::write_document(&self.path, &self.read())
    }

    /// Remove all data keys in place. The handle stays usable; a subsequent
    /// `save` persists the emptied document.
    pub fn clear(&self) {
        self.write().clear();
    }

    fn read(&self) -> RwLockReadGuard<'_, Map<String, Value>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Map<String, Value>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }
}
