//! CASK - Core Type Definitions
//! Defines fundamental types used across the storage engine.

use std::time::{SystemTime, UNIX_EPOCH};

/// Key type for the storage engine.
/// Using Vec<u8> allows arbitrary binary keys.
pub type Key = Vec<u8>;

/// Value type for the storage engine.
/// Using Vec<u8> allows arbitrary binary values.
pub type Value = Vec<u8>;

/// Current wall-clock time as seconds since the Unix epoch.
/// Saturates at `u32::MAX` and falls back to 0 if the clock is before 1970.
pub fn now_secs() -> u32 {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    u32::try_from(secs).unwrap_or(u32::MAX)
}
