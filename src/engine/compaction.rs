//! CASK - Log Compaction
//! Rewrites the log keeping only the latest live record of every key.
//!
//! ## Copy-and-swap
//! 1. Create an empty sibling file `<log>.compact`
//! 2. Copy each indexed record byte-for-byte into it, noting new offsets
//! 3. Sync it and rename it over the live log
//! 4. Hand back the new file handle and a freshly built index
//!
//! The live log and index are never touched until step 3 succeeds. Any
//! failure before that removes the sibling file and leaves the caller's
//! state exactly as it was. Tombstones never survive: they are not in the
//! index, so there is nothing to copy.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CaskError, Result};

use super::codec::Record;
use super::index::Index;
use super::log_file::LogFile;

/// Decides when writers compact without being asked.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompactionPolicy {
    threshold: Option<u64>,
}

impl CompactionPolicy {
    pub fn new(threshold: Option<u64>) -> Self {
        Self { threshold }
    }

    /// True once the log has reached the threshold and at least half the
    /// threshold's worth of it is garbage. The garbage condition keeps a
    /// store whose live data alone exceeds the threshold from recompacting
    /// on every write.
    pub fn should_compact(&self, log_bytes: u64, live_bytes: u64) -> bool {
        let Some(threshold) = self.threshold else {
            return false;
        };
        let dead = log_bytes.saturating_sub(live_bytes);
        log_bytes >= threshold && dead > 0 && dead >= threshold / 2
    }
}

/// Summary of a finished compaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactionStats {
    pub keys_migrated: usize,
    pub bytes_before: u64,
    pub bytes_after: u64,
}

impl CompactionStats {
    pub fn bytes_reclaimed(&self) -> u64 {
        self.bytes_before.saturating_sub(self.bytes_after)
    }
}

/// A fully built replacement generation, already installed on disk.
pub struct Compacted {
    pub log: LogFile,
    pub index: Index,
    pub stats: CompactionStats,
}

/// Path of the scratch file compaction writes into.
pub fn compaction_path(log_path: &Path) -> PathBuf {
    let mut name = log_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".compact");
    log_path.with_file_name(name)
}

/// Rewrite `log` to hold only the records referenced by `index`.
///
/// On success the new file has replaced the old one at the same path; the
/// caller must install the returned log and index together.
pub fn compact(log: &LogFile, index: &Index, sync_writes: bool) -> Result<Compacted> {
    let scratch = compaction_path(log.path());

    let (mut new_log, new_index) = match copy_live_records(log, index, &scratch) {
        Ok(built) => built,
        Err(err) => {
            discard_scratch(&scratch);
            return Err(err);
        }
    };

    if let Err(err) = fs::rename(&scratch, log.path()) {
        discard_scratch(&scratch);
        return Err(err.into());
    }
    sync_parent_dir(log.path());

    new_log.set_path(log.path().to_path_buf());
    new_log.set_sync_writes(sync_writes);

    let stats = CompactionStats {
        keys_migrated: new_index.len(),
        bytes_before: log.len(),
        bytes_after: new_log.len(),
    };
    Ok(Compacted {
        log: new_log,
        index: new_index,
        stats,
    })
}

fn copy_live_records(log: &LogFile, index: &Index, scratch: &Path) -> Result<(LogFile, Index)> {
    // Appends are synced once at the end rather than per record.
    let mut new_log = LogFile::create(scratch, false)?;
    let mut new_index = Index::new();

    for (key, entry) in index.iter() {
        let bytes = log.read_at(entry.offset, entry.length)?;
        let record = Record::decode_at(&bytes[..], 0).map_err(|err| CaskError::Corruption {
            offset: entry.offset,
            reason: format!("live record failed to decode: {err}"),
        })?;
        if record.key != *key || record.tombstone {
            return Err(CaskError::Corruption {
                offset: entry.offset,
                reason: "index entry does not point at a live record for its key".to_string(),
            });
        }

        let offset = new_log.append(&bytes)?;
        new_index.put(key.clone(), offset, entry.length, false);
    }

    new_log.sync()?;
    Ok((new_log, new_index))
}

fn discard_scratch(scratch: &Path) {
    if let Err(err) = fs::remove_file(scratch) {
        if err.kind() != std::io::ErrorKind::NotFound {
            log::warn!("failed to remove compaction file {:?}: {}", scratch, err);
        }
    }
}

/// Persist the rename itself. Best effort: failure only costs durability
/// of the rename, never the data.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if let Err(err) = fs::File::open(parent).and_then(|dir| dir.sync_all()) {
        log::debug!("could not sync directory {:?}: {}", parent, err);
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}
