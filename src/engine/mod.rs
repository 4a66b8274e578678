//! CASK - Storage Engine Module
//! Top-level module for the log-structured storage engine components.

pub mod codec;
pub mod compaction;
pub mod index;
pub mod log_file;
pub mod metrics;
pub mod recovery;
pub mod store;

use std::path::Path;

use crate::config::Config;
use crate::error::{CaskError, Result};
use crate::types::{Key, Value};

use self::codec::Record;
use self::compaction::{CompactionPolicy, CompactionStats};
use self::index::Index;
use self::log_file::LogFile;
use self::metrics::EngineMetrics;

/// Point-in-time sizes of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaskStats {
    /// Keys with a live value.
    pub live_keys: usize,
    /// Log bytes occupied by the latest record of each live key.
    pub live_bytes: u64,
    /// Total size of the log file.
    pub log_bytes: u64,
    /// Bytes compaction would reclaim (superseded records and tombstones).
    pub dead_bytes: u64,
}

/// The core Cask storage engine.
/// Owns exactly one log file and the index describing it. This type is
/// single-threaded: writes take `&mut self`. Share it across threads
/// through [`store::Store`].
pub struct Cask {
    /// Append-only record log.
    log: LogFile,
    /// Key to latest-record location.
    index: Index,
    /// Engine configuration.
    config: Config,
    /// When writers compact on their own.
    policy: CompactionPolicy,
    /// Runtime counters.
    metrics: EngineMetrics,
    /// Set after an automatic compaction fails; cleared by the next
    /// successful `compact()`.
    auto_compaction_suspended: bool,
}

impl Cask {
    /// Open or create a Cask store at the configured path, rebuilding the
    /// index from the log.
    pub fn open(config: Config) -> Result<Self> {
        config.ensure_dirs()?;

        let mut log = LogFile::open(&config.path, config.sync_writes)?;
        let (index, report) = recovery::recover(&mut log)?;

        let metrics = EngineMetrics::new();
        metrics.record_recovery(report.records_replayed);

        log::info!(
            "Cask store opened at {:?} ({} records replayed, {} live keys, {} torn bytes discarded)",
            config.path,
            report.records_replayed,
            index.len(),
            report.truncated_bytes
        );

        Ok(Self {
            log,
            index,
            policy: CompactionPolicy::new(config.compaction_threshold),
            config,
            metrics,
            auto_compaction_suspended: false,
        })
    }

    /// Store `value` under `key`, superseding any previous value.
    /// The log append happens before the index update, so a failed append
    /// leaves the index unchanged.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(CaskError::EmptyKey);
        }

        let record = Record::put(key.to_vec(), value.to_vec());
        let encoded = record.encode()?;
        let offset = self.log.append(&encoded)?;
        self.index
            .put(record.key, offset, encoded.len() as u64, false);
        self.metrics.record_put(encoded.len());

        self.maybe_compact();
        Ok(())
    }

    /// Fetch the latest value for `key`, or `None` if it was never written
    /// or has been deleted.
    pub fn get(&self, key: &[u8]) -> Result<Option<Value>> {
        let Some(entry) = self.index.get(key) else {
            self.metrics.record_get(None);
            return Ok(None);
        };

        let bytes = self.log.read_at(entry.offset, entry.length)?;
        let record = Record::decode_at(&bytes[..], 0).map_err(|err| match err {
            CaskError::Io(err) => CaskError::Io(err),
            other => CaskError::Corruption {
                offset: entry.offset,
                reason: other.to_string(),
            },
        })?;
        if record.key != key {
            return Err(CaskError::Corruption {
                offset: entry.offset,
                reason: "indexed record belongs to a different key".to_string(),
            });
        }

        self.metrics.record_get(Some(record.value.len()));
        Ok(Some(record.value))
    }

    /// Append a tombstone for `key` and drop it from the index.
    /// Deleting a key that does not exist still writes the tombstone.
    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(CaskError::EmptyKey);
        }

        let encoded = Record::tombstone(key.to_vec()).encode()?;
        self.log.append(&encoded)?;
        self.index.delete(key);
        self.metrics.record_delete(encoded.len());

        self.maybe_compact();
        Ok(())
    }

    /// Rewrite the log keeping only live records, then swap in the new
    /// file and index together. On failure nothing changes.
    ///
    /// A successful call also re-enables automatic compaction if an earlier
    /// automatic attempt failed.
    pub fn compact(&mut self) -> Result<CompactionStats> {
        let compacted = match compaction::compact(&self.log, &self.index, self.config.sync_writes)
        {
            Ok(compacted) => compacted,
            Err(err) => {
                self.metrics.record_compaction_failure();
                return Err(err);
            }
        };

        self.auto_compaction_suspended = false;
        self.log = compacted.log;
        self.index = compacted.index;
        let stats = compacted.stats;
        self.metrics.record_compaction(stats.bytes_reclaimed());

        log::info!(
            "compacted {:?}: {} keys migrated, {} -> {} bytes",
            self.config.path,
            stats.keys_migrated,
            stats.bytes_before,
            stats.bytes_after
        );
        Ok(stats)
    }

    /// Compact if the configured threshold says so. The write that
    /// triggered this has already succeeded, so a failed compaction is
    /// logged rather than returned, and automatic compaction stays off until
    /// an explicit `compact()` succeeds.
    fn maybe_compact(&mut self) {
        if self.auto_compaction_suspended
            || !self
                .policy
                .should_compact(self.log.len(), self.index.live_bytes())
        {
            return;
        }

        log::debug!(
            "log {:?} reached {} bytes, compacting",
            self.config.path,
            self.log.len()
        );
        if let Err(err) = self.compact() {
            self.auto_compaction_suspended = true;
            log::warn!(
                "automatic compaction of {:?} failed, suspended until compact() succeeds: {}",
                self.config.path,
                err
            );
        }
    }

    /// Returns true while automatic compaction is off after a failure.
    pub fn auto_compaction_suspended(&self) -> bool {
        self.auto_compaction_suspended
    }

    /// Force all appended records to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.log.sync()
    }

    /// Flush the log and release the file handle.
    pub fn close(self) -> Result<()> {
        self.log.sync()?;
        log::info!("Cask store at {:?} closed", self.config.path);
        Ok(())
    }

    /// Returns the number of live keys.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Returns true if no key holds a value.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check whether `key` holds a value, without touching the log.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    /// Snapshot of all live keys, in no particular order.
    pub fn keys(&self) -> Vec<Key> {
        self.index.iter().map(|(key, _)| key.clone()).collect()
    }

    pub fn stats(&self) -> CaskStats {
        let log_bytes = self.log.len();
        let live_bytes = self.index.live_bytes();
        CaskStats {
            live_keys: self.index.len(),
            live_bytes,
            log_bytes,
            dead_bytes: log_bytes.saturating_sub(live_bytes),
        }
    }

    /// Returns the path of the backing log file.
    pub fn path(&self) -> &Path {
        self.log.path()
    }

    /// Returns a reference to the engine metrics.
    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }
}
