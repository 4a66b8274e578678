//! CASK - Record Codec
//! Serializes a single record to its on-disk byte layout and back.
//!
//! ## Binary Format (per record, big-endian)
//! ```text
//! [timestamp: 4][key_len: 4][value_len: 4][tombstone: 1][key: key_len][value: value_len]
//! ```
//! The 13-byte header is fixed; the body length is fully determined by the
//! header, so decoding never scans for delimiters.

use bytes::{Buf, BufMut};

use crate::error::{CaskError, Result};
use crate::types::{now_secs, Key, Value};

/// Size of the fixed record header in bytes.
pub const HEADER_SIZE: usize = 13;

/// Anything records can be decoded from: positional reads plus a known size.
pub trait ByteSource {
    /// Total number of readable bytes.
    fn size(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;
}

impl ByteSource for [u8] {
    fn size(&self) -> u64 {
        self.len() as u64
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let start = offset as usize;
        let end = start + buf.len();
        let src = self.get(start..end).ok_or(CaskError::TruncatedRecord {
            offset,
            needed: buf.len() as u64,
            available: self.size().saturating_sub(offset),
        })?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

/// Decoded fixed-size header of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub timestamp: u32,
    pub key_len: u32,
    pub value_len: u32,
    pub tombstone: bool,
}

impl Header {
    /// Parse a header read from `offset`. Rejects tombstone bytes other
    /// than 0/1 and zero-length keys.
    pub fn decode(raw: &[u8; HEADER_SIZE], offset: u64) -> Result<Self> {
        let mut cur = &raw[..];
        let timestamp = cur.get_u32();
        let key_len = cur.get_u32();
        let value_len = cur.get_u32();
        let tombstone = match cur.get_u8() {
            0 => false,
            1 => true,
            other => {
                return Err(CaskError::CorruptHeader {
                    offset,
                    reason: format!("invalid tombstone flag {other:#04x}"),
                })
            }
        };

        if key_len == 0 {
            return Err(CaskError::CorruptHeader {
                offset,
                reason: "zero-length key".to_string(),
            });
        }

        Ok(Self {
            timestamp,
            key_len,
            value_len,
            tombstone,
        })
    }

    /// Bytes following the header.
    pub fn body_len(&self) -> u64 {
        self.key_len as u64 + self.value_len as u64
    }

    /// Total encoded size of the record this header describes.
    pub fn record_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.body_len()
    }
}

/// The unit of persistence. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Key,
    pub value: Value,
    pub timestamp: u32,
    pub tombstone: bool,
}

impl Record {
    /// A live record stamped with the current time.
    pub fn put(key: Key, value: Value) -> Self {
        Self {
            key,
            value,
            timestamp: now_secs(),
            tombstone: false,
        }
    }

    /// A deletion marker for `key` with an empty value.
    pub fn tombstone(key: Key) -> Self {
        Self {
            key,
            value: Vec::new(),
            timestamp: now_secs(),
            tombstone: true,
        }
    }

    /// Size of the encoded record in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_SIZE + self.key.len() + self.value.len()
    }

    /// Encode into exactly `HEADER_SIZE + key.len() + value.len()` bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let key_len = field_len(&self.key)?;
        let value_len = field_len(&self.value)?;

        let mut buf = Vec::with_capacity(self.encoded_len());
        buf.put_u32(self.timestamp);
        buf.put_u32(key_len);
        buf.put_u32(value_len);
        buf.put_u8(self.tombstone as u8);
        buf.put_slice(&self.key);
        buf.put_slice(&self.value);

        debug_assert_eq!(buf.len(), self.encoded_len());
        Ok(buf)
    }

    /// Decode the record starting at `offset` in `src`.
    ///
    /// Fails with `CorruptHeader` when `offset` is at or past the end of the
    /// source, and with `TruncatedRecord` when fewer bytes remain than the
    /// header (or the header's declared lengths) require.
    pub fn decode_at<S: ByteSource + ?Sized>(src: &S, offset: u64) -> Result<Self> {
        let size = src.size();
        if offset >= size {
            return Err(CaskError::CorruptHeader {
                offset,
                reason: "offset is past the end of the log".to_string(),
            });
        }

        let available = size - offset;
        if available < HEADER_SIZE as u64 {
            return Err(CaskError::TruncatedRecord {
                offset,
                needed: HEADER_SIZE as u64,
                available,
            });
        }

        let mut raw = [0u8; HEADER_SIZE];
        src.read_exact_at(offset, &mut raw)?;
        let header = Header::decode(&raw, offset)?;

        if available < header.record_len() {
            return Err(CaskError::TruncatedRecord {
                offset,
                needed: header.record_len(),
                available,
            });
        }

        let mut key = vec![0u8; header.key_len as usize];
        src.read_exact_at(offset + HEADER_SIZE as u64, &mut key)?;
        let mut value = vec![0u8; header.value_len as usize];
        src.read_exact_at(offset + HEADER_SIZE as u64 + header.key_len as u64, &mut value)?;

        Ok(Self {
            key,
            value,
            timestamp: header.timestamp,
            tombstone: header.tombstone,
        })
    }
}

fn field_len(field: &[u8]) -> Result<u32> {
    u32::try_from(field.len()).map_err(|_| CaskError::RecordTooLarge { len: field.len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: &[u8], value: &[u8], tombstone: bool) -> Record {
        Record {
            key: key.to_vec(),
            value: value.to_vec(),
            timestamp: 0x0102_0304,
            tombstone,
        }
    }

    #[test]
    fn test_fields_at_their_own_offsets() {
        let encoded = record(b"key", b"value", false).encode().unwrap();

        assert_eq!(encoded.len(), HEADER_SIZE + 3 + 5);
        assert_eq!(&encoded[0..4], &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(&encoded[4..8], &3u32.to_be_bytes());
        assert_eq!(&encoded[8..12], &5u32.to_be_bytes());
        assert_eq!(encoded[12], 0);
        assert_eq!(&encoded[13..16], b"key");
        assert_eq!(&encoded[16..], b"value");
    }

    #[test]
    fn test_roundtrip() {
        for r in [
            record(b"k", b"v", false),
            record(b"empty-value", b"", false),
            record(b"gone", b"", true),
            record(&[0xff; 300], &[0u8; 4096], false),
        ] {
            let encoded = r.encode().unwrap();
            assert_eq!(Record::decode_at(&encoded[..], 0).unwrap(), r);
        }
    }

    #[test]
    fn test_decode_at_offset() {
        let mut log = record(b"first", b"1", false).encode().unwrap();
        let second_at = log.len() as u64;
        log.extend(record(b"second", b"2", true).encode().unwrap());

        let decoded = Record::decode_at(&log[..], second_at).unwrap();
        assert_eq!(decoded.key, b"second");
        assert!(decoded.tombstone);
    }

    #[test]
    fn test_decode_past_end_is_corrupt_header() {
        let encoded = record(b"k", b"v", false).encode().unwrap();
        let err = Record::decode_at(&encoded[..], encoded.len() as u64).unwrap_err();
        assert!(matches!(err, CaskError::CorruptHeader { .. }));
    }

    #[test]
    fn test_truncated_header() {
        let encoded = record(b"k", b"v", false).encode().unwrap();
        let err = Record::decode_at(&encoded[..7], 0).unwrap_err();
        assert!(matches!(
            err,
            CaskError::TruncatedRecord {
                needed: 13,
                available: 7,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_body() {
        let encoded = record(b"key", b"value", false).encode().unwrap();
        let err = Record::decode_at(&encoded[..encoded.len() - 2], 0).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_invalid_tombstone_flag() {
        let mut encoded = record(b"k", b"v", false).encode().unwrap();
        encoded[12] = 7;
        let err = Record::decode_at(&encoded[..], 0).unwrap_err();
        assert!(matches!(err, CaskError::CorruptHeader { .. }));
    }

    #[test]
    fn test_zero_length_key_rejected() {
        let mut encoded = record(b"k", b"v", false).encode().unwrap();
        encoded[4..8].copy_from_slice(&0u32.to_be_bytes());
        let err = Record::decode_at(&encoded[..], 0).unwrap_err();
        assert!(matches!(err, CaskError::CorruptHeader { .. }));
    }

    #[test]
    fn test_does_not_read_past_declared_lengths() {
        let mut log = record(b"a", b"1", false).encode().unwrap();
        log.extend_from_slice(b"trailing garbage");
        let decoded = Record::decode_at(&log[..], 0).unwrap();
        assert_eq!(decoded.value, b"1");
    }
}
