//! CASK - Engine Configuration
//! Defines tunable parameters for the log-structured storage engine.

use std::path::PathBuf;

/// Configuration for the Cask storage engine.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the single log file backing the store.
    pub path: PathBuf,

    /// Whether to sync every append to disk immediately (fsync).
    pub sync_writes: bool,

    /// Log size in bytes at which writers compact automatically.
    /// `None` disables automatic compaction.
    pub compaction_threshold: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./cask.log"),
            sync_writes: true,
            compaction_threshold: None,
        }
    }
}

impl Config {
    /// Create a new Config for the log file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Set whether appends are fsynced before returning.
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Enable automatic compaction once the log reaches `bytes`.
    pub fn with_compaction_threshold(mut self, bytes: u64) -> Self {
        self.compaction_threshold = Some(bytes);
        self
    }

    /// Ensure the directory holding the log file exists.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
            _ => Ok(()),
        }
    }
}
