//! In-memory blob store backend.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{LwM2MError, Result};

use super::BlobStore;

/// A plain mutex-guarded map. Lives for the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        entries
            .get(key)
            .cloned()
            .ok_or_else(|| LwM2MError::NotFound(key.to_string()))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_on_missing_key_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(store.get("/0/0/0"), Err(LwM2MError::NotFound(_))));
    }

    #[test]
    fn put_then_get_returns_independent_copy() {
        let store = MemoryStore::new();
        let mut original = vec![1, 2, 3];
        store.put("/0/0/0", &original).unwrap();
        original[0] = 99;

        let fetched = store.get("/0/0/0").unwrap();
        assert_eq!(fetched, vec![1, 2, 3]);
    }

    #[test]
    fn put_overwrites_prior_value() {
        let store = MemoryStore::new();
        store.put("/0/0/0", &[1]).unwrap();
        store.put("/0/0/0", &[2]).unwrap();
        assert_eq!(store.get("/0/0/0").unwrap(), vec![2]);
    }
}
