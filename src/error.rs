//! CASK - Custom Error Types
//! Defines the error hierarchy for the log-structured storage engine.

use thiserror::Error;

/// Custom Result type for the Cask engine.
pub type Result<T> = std::result::Result<T, CaskError>;

/// Error types for the Cask storage engine.
#[derive(Error, Debug)]
pub enum CaskError {
    /// I/O errors from file operations (open, seek, read, write, sync).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Keys must contain at least one byte.
    #[error("Key must not be empty")]
    EmptyKey,

    /// Fewer bytes remain in the log than a record header declares.
    #[error("Truncated record at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedRecord {
        offset: u64,
        needed: u64,
        available: u64,
    },

    /// Header could not be decoded at the given offset.
    #[error("Corrupt record header at offset {offset}: {reason}")]
    CorruptHeader { offset: u64, reason: String },

    /// The log is damaged somewhere other than its tail.
    #[error("Data corruption detected at offset {offset}: {reason}")]
    Corruption { offset: u64, reason: String },

    /// Key or value length does not fit in a 32-bit length field.
    #[error("Record field too large: {len} bytes")]
    RecordTooLarge { len: usize },
}

impl CaskError {
    /// Returns true for errors that describe a partially written record.
    pub fn is_truncation(&self) -> bool {
        matches!(self, CaskError::TruncatedRecord { .. })
    }
}
