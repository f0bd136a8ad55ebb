//! In-memory key-value store.
//!
//! Holds the same JSON documents the SQLite store does, so tests exercise
//! the real encoding and legacy migration path.

use std::cell::RefCell;
use std::collections::HashMap;

use super::KvStore;
use crate::error::Result;

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, e.g. a payload written by an older client.
    pub fn with_raw(self, key: &str, value: &str) -> Self {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KvStore for MemoryStore {
    fn kv_get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn kv_delete(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{keys, Store};

    #[test]
    fn kv_roundtrip_and_delete() {
        let store = MemoryStore::new();
        assert!(store.kv_get("k").unwrap().is_none());
        store.kv_set("k", "v").unwrap();
        assert_eq!(store.kv_get("k").unwrap().as_deref(), Some("v"));
        store.kv_delete("k").unwrap();
        assert!(store.raw("k").is_none());
    }

    #[test]
    fn empty_store_reads_as_empty() {
        let store = MemoryStore::new();
        assert!(store.get_chains().unwrap().is_empty());
        assert!(store.get_scheduled_sessions().unwrap().is_empty());
        assert!(store.get_active_session().unwrap().is_none());
        assert!(store.get_completion_history().unwrap().is_empty());
    }

    #[test]
    fn clearing_active_session_removes_key() {
        let store = MemoryStore::new().with_raw(keys::ACTIVE_SESSION, "{}");
        store.save_active_session(None).unwrap();
        assert!(store.raw(keys::ACTIVE_SESSION).is_none());
    }
}
