use chrono::Utc;
use indexmap::IndexMap;
use kestrel_common::mapping::{LearnedMapping, MappingSnapshot};
use std::sync::{Arc, Mutex, MutexGuard};

/// Process-lifetime knowledge base of taught descriptions.
///
/// Cloning yields another handle to the same entries. The lock is only held
/// for the duration of a single call and never across an await point.
#[derive(Clone, Default)]
pub struct MappingStore {
    entries: Arc<Mutex<IndexMap<String, LearnedMapping>>>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(IndexMap::new())),
        }
    }

    /// Insert or wholesale-replace the mapping for `description`.
    ///
    /// Empty notes are stored as no notes.
    pub fn put(&self, description: &str, target: &str, notes: Option<&str>) -> LearnedMapping {
        let mapping = LearnedMapping {
            description: description.to_string(),
            target: target.to_string(),
            notes: notes.filter(|n| !n.is_empty()).map(str::to_string),
            recorded_at: Utc::now(),
        };
        self.lock()
            .insert(description.to_string(), mapping.clone());
        mapping
    }

    pub fn get(&self, description: &str) -> Option<LearnedMapping> {
        self.lock().get(description).cloned()
    }

    /// Owned copy of every entry in insertion order.
    pub fn get_all(&self) -> MappingSnapshot {
        self.lock().clone()
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, LearnedMapping>> {
        // A panic while holding the lock cannot leave a half-written entry:
        // every mutation is a single insert.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_keeps_single_entry() {
        let store = MappingStore::new();
        store.put("x", "a", None);
        store.put("x", "b", None);

        let all = store.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all["x"].target, "b");
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_overwrite_replaces_notes_wholesale() {
        let store = MappingStore::new();
        store.put("x", "a", Some("first"));
        store.put("x", "b", None);
        assert!(store.get("x").unwrap().notes.is_none());
    }

    #[test]
    fn test_empty_notes_stored_as_absent() {
        let store = MappingStore::new();
        let mapping = store.put("x", "a", Some(""));
        assert!(mapping.notes.is_none());
        assert!(store.get("x").unwrap().notes.is_none());
    }

    #[test]
    fn test_insertion_order_preserved() {
        let store = MappingStore::new();
        store.put("b", "1", None);
        store.put("a", "2", None);
        store.put("c", "3", None);
        store.put("b", "4", None);

        let keys: Vec<_> = store.get_all().keys().cloned().collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = MappingStore::new();
        store.put("x", "a", None);

        let mut snapshot = store.get_all();
        snapshot.clear();
        assert_eq!(store.size(), 1);

        store.put("y", "b", None);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_keys_preserve_case_and_whitespace() {
        let store = MappingStore::new();
        store.put("Login ", "#a", None);
        store.put("login", "#b", None);
        assert_eq!(store.size(), 2);
        assert_eq!(store.get("Login ").unwrap().target, "#a");
    }

    #[test]
    fn test_clones_share_entries() {
        let store = MappingStore::new();
        let other = store.clone();
        other.put("x", "a", None);
        assert_eq!(store.size(), 1);
    }

    #[test]
    fn test_recorded_at_refreshed_on_overwrite() {
        let store = MappingStore::new();
        let first = store.put("x", "a", None);
        let second = store.put("x", "b", None);
        assert!(second.recorded_at >= first.recorded_at);
    }
}
