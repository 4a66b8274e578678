//! CASK - Concurrent Store Handle
//! Thread-safe wrapper around the Cask engine using Arc + RwLock.
//!
//! ## Concurrency Model
//! - **Read operations** (`get`, `len`, `stats`, ...) acquire a **read lock** (shared)
//! - **Write operations** (`put`, `delete`, `compact`) acquire a **write lock** (exclusive)
//! - Multiple concurrent readers allowed, writers block all
//!
//! Writes are linearized by the lock, so the byte order of the log is a
//! total order over all puts and deletes. A reader never observes a
//! record whose append has not finished together with its index update.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::config::Config;
use crate::error::Result;
use crate::types::{Key, Value};

use super::compaction::CompactionStats;
use super::metrics::EngineMetrics;
use super::{Cask, CaskStats};

/// Thread-safe handle to a Cask store. Cloning is cheap and every clone
/// refers to the same log file and index.
///
/// ## Example
/// ```no_run
/// use cask::Store;
/// use std::thread;
///
/// let store = Store::open("data/cask.log").unwrap();
///
/// // Clone for multiple threads
/// let writer = store.clone();
///
/// // Thread 1: Write
/// thread::spawn(move || {
///     writer.put(b"key", b"value").unwrap();
/// });
///
/// // Thread 2: Read
/// let result = store.get(b"key").unwrap();
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<RwLock<Cask>>,
}

impl Store {
    /// Open or create a store backed by the log file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open_with_config(Config::new(path))
    }

    /// Open or create a store with a full configuration.
    pub fn open_with_config(config: Config) -> Result<Self> {
        let engine = Cask::open(config)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(engine)),
        })
    }

    /// Insert a key-value pair (write lock).
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.inner.write().put(key, value)
    }

    /// Get a value by key (read lock).
    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        self.inner.read().get(key)
    }

    /// Delete a key (write lock).
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.inner.write().delete(key)
    }

    /// Compact the log (write lock, held for the whole rewrite).
    pub fn compact(&self) -> Result<CompactionStats> {
        self.inner.write().compact()
    }

    /// Flush the log to stable storage (read lock).
    pub fn sync(&self) -> Result<()> {
        self.inner.read().sync()
    }

    /// Flush the log and release this handle. The file stays open until
    /// the last clone is dropped.
    pub fn close(self) -> Result<()> {
        match Arc::try_unwrap(self.inner) {
            Ok(lock) => lock.into_inner().close(),
            Err(shared) => shared.read().sync(),
        }
    }

    /// Get number of live keys (read lock).
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if store is empty (read lock).
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Check whether a key holds a value (read lock).
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.inner.read().contains_key(key)
    }

    /// Snapshot of live keys (read lock).
    pub fn keys(&self) -> Vec<Key> {
        self.inner.read().keys()
    }

    /// Current size statistics (read lock).
    pub fn stats(&self) -> CaskStats {
        self.inner.read().stats()
    }

    /// Run `f` against the engine metrics (read lock).
    pub fn with_metrics<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&EngineMetrics) -> R,
    {
        let engine = self.inner.read();
        f(engine.metrics())
    }
}
