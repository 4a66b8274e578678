//! CASK - In-Memory Index
//! Maps every live key to the location of its latest record in the current
//! log file. Tombstoned keys are removed outright, so an absent key means
//! either "never written" or "deleted".

use std::collections::HashMap;

use crate::types::Key;

/// Location of a key's latest record in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    /// Byte offset where the record starts.
    pub offset: u64,
    /// Total encoded length of the record.
    pub length: u64,
    /// Always false: tombstoned keys are removed rather than stored.
    pub tombstone: bool,
}

/// Hash index from key to record location.
#[derive(Debug, Default)]
pub struct Index {
    entries: HashMap<Key, IndexEntry>,
    /// Sum of `length` over all entries.
    live_bytes: u64,
}

impl Index {
    /// Create a new, empty Index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `key` at a new record, replacing any earlier location.
    pub fn put(&mut self, key: Key, offset: u64, length: u64, tombstone: bool) {
        let entry = IndexEntry {
            offset,
            length,
            tombstone,
        };
        if let Some(old) = self.entries.insert(key, entry) {
            self.live_bytes -= old.length;
        }
        self.live_bytes += length;
    }

    pub fn get(&self, key: &[u8]) -> Option<IndexEntry> {
        self.entries.get(key).copied()
    }

    /// Remove `key`, returning its previous location if it had one.
    pub fn delete(&mut self, key: &[u8]) -> Option<IndexEntry> {
        let old = self.entries.remove(key)?;
        self.live_bytes -= old.length;
        Some(old)
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bytes of the log occupied by live records.
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes
    }

    /// Iterate entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&Key, &IndexEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_get() {
        let mut index = Index::new();
        index.put(b"key".to_vec(), 0, 20, false);
        assert_eq!(
            index.get(b"key"),
            Some(IndexEntry {
                offset: 0,
                length: 20,
                tombstone: false
            })
        );
        assert_eq!(index.get(b"missing"), None);
    }

    #[test]
    fn test_put_overwrites_location() {
        let mut index = Index::new();
        index.put(b"key".to_vec(), 0, 20, false);
        index.put(b"key".to_vec(), 20, 30, false);

        assert_eq!(index.len(), 1);
        assert_eq!(index.get(b"key").unwrap().offset, 20);
        assert_eq!(index.live_bytes(), 30);
    }

    #[test]
    fn test_delete_removes_entry() {
        let mut index = Index::new();
        index.put(b"key".to_vec(), 0, 20, false);

        assert!(index.delete(b"key").is_some());
        assert!(!index.contains_key(b"key"));
        assert!(index.is_empty());
        assert_eq!(index.live_bytes(), 0);
        assert!(index.delete(b"key").is_none());
    }

    #[test]
    fn test_iter_visits_every_entry() {
        let mut index = Index::new();
        index.put(b"a".to_vec(), 0, 15, false);
        index.put(b"b".to_vec(), 15, 15, false);

        let mut keys: Vec<_> = index.iter().map(|(k, _)| k.clone()).collect();
        keys.sort();
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);
    }
}
