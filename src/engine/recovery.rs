//! CASK - Crash Recovery
//! Rebuilds the in-memory index by replaying the log from offset 0.
//!
//! Log order is recency order: a later record for a key always supersedes
//! an earlier one. A record cut short at the end of the file (a torn write
//! from a crash) marks the effective end of the log and is cut off, so the
//! recovered store always reflects a prefix of the writes ever issued.
//! Damage anywhere else fails the open, including a length field that
//! points past the end of the file while whole records still follow it.

use crate::error::{CaskError, Result};

use super::codec::{Header, Record, HEADER_SIZE};
use super::index::Index;
use super::log_file::LogFile;

/// Outcome of replaying a log file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// Records decoded and applied to the index.
    pub records_replayed: u64,
    /// How many of those records were tombstones.
    pub tombstones: u64,
    /// Length of the valid prefix of the log.
    pub valid_len: u64,
    /// Bytes of torn tail dropped from the end of the file.
    pub truncated_bytes: u64,
}

/// Replay `log` into a fresh index, truncating any torn tail in place.
pub fn recover(log: &mut LogFile) -> Result<(Index, RecoveryReport)> {
    let mut index = Index::new();
    let mut report = RecoveryReport::default();
    let mut offset = 0u64;

    while offset < log.len() {
        let record = match Record::decode_at(&*log, offset) {
            Ok(record) => record,
            Err(err) if err.is_truncation() => {
                if intact_records_follow(log, offset)? {
                    return Err(CaskError::Corruption {
                        offset,
                        reason: format!("record length runs past intact records: {err}"),
                    });
                }
                report.truncated_bytes = log.len() - offset;
                log::warn!(
                    "discarding {} bytes of torn tail at offset {} in {:?}: {}",
                    report.truncated_bytes,
                    offset,
                    log.path(),
                    err
                );
                log.truncate_to(offset)?;
                break;
            }
            Err(CaskError::CorruptHeader { offset, reason }) => {
                return Err(CaskError::Corruption { offset, reason });
            }
            Err(err) => return Err(err),
        };

        let length = record.encoded_len() as u64;
        if record.tombstone {
            index.delete(&record.key);
            report.tombstones += 1;
        } else {
            index.put(record.key, offset, length, false);
        }
        report.records_replayed += 1;
        offset += length;
    }

    report.valid_len = offset;
    log::debug!(
        "replayed {} records ({} tombstones) from {:?}",
        report.records_replayed,
        report.tombstones,
        log.path()
    );
    Ok((index, report))
}

/// A torn write leaves part of one record at the end of the file and
/// nothing after it. If the bytes past a complete header at `offset` instead
/// contain a run of whole records ending exactly at end of file, the
/// header's lengths are damaged and the tail is not torn.
fn intact_records_follow(log: &LogFile, offset: u64) -> Result<bool> {
    let start = offset + HEADER_SIZE as u64;
    if start >= log.len() {
        return Ok(false);
    }
    let tail = log.read_at(start, log.len() - start)?;
    Ok((0..tail.len()).any(|from| chains_to_end(&tail, from)))
}

fn chains_to_end(tail: &[u8], mut at: usize) -> bool {
    loop {
        let Some(raw) = tail.get(at..at + HEADER_SIZE) else {
            return false;
        };
        // Cheap rejection before a full header parse.
        if raw[HEADER_SIZE - 1] > 1 {
            return false;
        }
        let Ok(raw) = <&[u8; HEADER_SIZE]>::try_from(raw) else {
            return false;
        };
        let Ok(header) = Header::decode(raw, at as u64) else {
            return false;
        };
        let next = at as u64 + header.record_len();
        if next == tail.len() as u64 {
            return true;
        }
        if next > tail.len() as u64 {
            return false;
        }
        at = next as usize;
    }
}
