//! CASK - Log File
//! Append-only byte store backing the engine. Writers append at the end of
//! the file; readers fetch byte ranges by offset without moving a shared
//! cursor, so reads can proceed while holding only a shared reference.

use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{CaskError, Result};

use super::codec::ByteSource;

/// Append-only log file.
pub struct LogFile {
    /// Path to the log file on disk.
    path: PathBuf,
    /// Handle opened for reading and writing.
    file: File,
    /// Logical end of the log; the next append lands here.
    len: u64,
    /// Whether to fsync after each append.
    sync_writes: bool,
    /// Set when a failed append could not be rolled back. Bytes of unknown
    /// content may sit past `len`, so no further appends are accepted.
    poisoned: bool,
}

impl LogFile {
    /// Open or create the log file at the specified path.
    pub fn open(path: impl Into<PathBuf>, sync_writes: bool) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            path,
            file,
            len,
            sync_writes,
            poisoned: false,
        })
    }

    /// Create an empty log file at `path`, discarding anything already there.
    pub fn create(path: impl Into<PathBuf>, sync_writes: bool) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        Ok(Self {
            path,
            file,
            len: 0,
            sync_writes,
            poisoned: false,
        })
    }

    /// Returns the path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append `bytes` at the end of the log and return their start offset.
    ///
    /// If the write fails the file is cut back to its previous length. If
    /// that fails too, the log is poisoned and every later append is
    /// refused; reopening the store runs recovery over the leftover tail.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        if self.poisoned {
            return Err(CaskError::Io(io::Error::new(
                io::ErrorKind::Other,
                format!(
                    "log {:?} holds an unrecoverable partial append; reopen the store",
                    self.path
                ),
            )));
        }

        let offset = self.len;
        if let Err(err) = self.write_at_end(offset, bytes) {
            if let Err(rollback) = self.file.set_len(offset) {
                log::error!(
                    "failed to roll back partial append at offset {} in {:?}, refusing further writes: {}",
                    offset,
                    self.path,
                    rollback
                );
                self.poisoned = true;
            }
            return Err(err);
        }

        self.len += bytes.len() as u64;
        Ok(offset)
    }

    fn write_at_end(&mut self, offset: u64, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(bytes)?;
        if self.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }

    /// Returns true once a failed append could not be rolled back.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Read `length` bytes starting at `offset`.
    pub fn read_at(&self, offset: u64, length: u64) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; length as usize];
        self.read_exact_at(offset, &mut buf)?;
        Ok(buf)
    }

    /// Force all appended data to stable storage.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Discard everything past `len`. Only recovery uses this, to drop a
    /// torn tail before new appends follow it.
    pub(crate) fn truncate_to(&mut self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        self.file.sync_all()?;
        self.len = len;
        Ok(())
    }

    pub(crate) fn set_sync_writes(&mut self, sync_writes: bool) {
        self.sync_writes = sync_writes;
    }

    /// Record that the underlying file now lives at `path` (after a rename).
    pub(crate) fn set_path(&mut self, path: PathBuf) {
        self.path = path;
    }

    /// Swap the handle for a read-only one so that writes and truncation
    /// fail the way they do on a full or revoked disk.
    #[cfg(test)]
    pub(crate) fn reopen_read_only(&mut self) -> Result<()> {
        self.file = OpenOptions::new().read(true).open(&self.path)?;
        Ok(())
    }
}

impl ByteSource for LogFile {
    fn size(&self) -> u64 {
        self.len
    }

    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let end = offset.saturating_add(buf.len() as u64);
        if end > self.len {
            return Err(CaskError::TruncatedRecord {
                offset,
                needed: buf.len() as u64,
                available: self.len.saturating_sub(offset),
            });
        }
        read_exact_at(&self.file, buf, offset)?;
        Ok(())
    }
}

#[cfg(unix)]
fn read_exact_at(file: &File, buf: &mut [u8], offset: u64) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;
    file.read_exact_at(buf, offset)
}

#[cfg(windows)]
fn read_exact_at(file: &File, mut buf: &mut [u8], mut offset: u64) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;
    while !buf.is_empty() {
        match file.seek_read(buf, offset) {
            Ok(0) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to fill whole buffer",
                ))
            }
            Ok(n) => {
                buf = &mut buf[n..];
                offset += n as u64;
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_returns_start_offsets() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LogFile::open(dir.path().join("a.log"), false).unwrap();

        assert_eq!(log.append(b"hello").unwrap(), 0);
        assert_eq!(log.append(b"world!").unwrap(), 5);
        assert_eq!(log.len(), 11);
        assert_eq!(log.read_at(5, 6).unwrap(), b"world!");
        assert_eq!(log.read_at(0, 5).unwrap(), b"hello");
    }

    #[test]
    fn test_reopen_appends_after_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        {
            let mut log = LogFile::open(&path, true).unwrap();
            log.append(b"abc").unwrap();
        }

        let mut log = LogFile::open(&path, true).unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log.append(b"def").unwrap(), 3);
        assert_eq!(log.read_at(0, 6).unwrap(), b"abcdef");
    }

    #[test]
    fn test_read_past_end_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = LogFile::open(dir.path().join("a.log"), false).unwrap();
        log.append(b"abc").unwrap();

        let err = log.read_at(1, 10).unwrap_err();
        assert!(err.is_truncation());
    }

    #[test]
    fn test_create_discards_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        LogFile::open(&path, false).unwrap().append(b"old").unwrap();

        let log = LogFile::create(&path, false).unwrap();
        assert!(log.is_empty());
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_truncate_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        let mut log = LogFile::open(&path, false).unwrap();
        log.append(b"keep-this-drop").unwrap();
        log.truncate_to(9).unwrap();

        assert_eq!(log.len(), 9);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 9);
        assert_eq!(log.append(b"!").unwrap(), 9);
    }

    #[test]
    fn test_failed_append_without_rollback_poisons_log() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        let mut log = LogFile::open(&path, false).unwrap();
        log.append(b"abc").unwrap();
        log.reopen_read_only().unwrap();

        assert!(matches!(log.append(b"def"), Err(CaskError::Io(_))));
        assert!(log.is_poisoned());
        assert_eq!(log.len(), 3);
        assert_eq!(log.read_at(0, 3).unwrap(), b"abc");

        // Still refused once the handle could write again.
        log.file = OpenOptions::new().read(true).write(true).open(&path).unwrap();
        assert!(matches!(log.append(b"ghi"), Err(CaskError::Io(_))));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 3);

        let reopened = LogFile::open(&path, false).unwrap();
        assert!(!reopened.is_poisoned());
        assert_eq!(reopened.len(), 3);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_append_to_full_device_fails() {
        let Ok(mut log) = LogFile::open("/dev/full", false) else {
            return;
        };
        assert!(matches!(log.append(b"no room"), Err(CaskError::Io(_))));
        assert_eq!(log.len(), 0);
    }
}
