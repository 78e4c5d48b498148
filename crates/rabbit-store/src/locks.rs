use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::{Result, StoreError};

/// One mutex per table file. Every read-modify-write of a table runs under
/// its lock so concurrent writers serialize instead of dropping updates.
/// An entry lives only while some caller holds or waits for it.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock<F, T>(&self, path: &Path, f: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| StoreError::LockPoisoned)?;
            Arc::clone(locks.entry(path.to_path_buf()).or_default())
        };
        let result = match lock.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(StoreError::LockPoisoned),
        };

        // Clones are only taken under the map lock, so a count of two (map
        // plus ours) means nobody else is waiting on this path.
        let mut locks = self.locks.lock().map_err(|_| StoreError::LockPoisoned)?;
        if Arc::strong_count(&lock) == 2 {
            locks.remove(path);
        }
        result
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}
