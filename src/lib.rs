//! CASK - Append-Only Key-Value Storage Engine
//!
//! An embedded, single-file storage engine following the log-structured
//! (Bitcask) design: every write is a sequential append, and an in-memory
//! index maps each key to the offset of its most recent record.
//!
//! ## Features
//! - **Record Codec**: fixed 13-byte big-endian header, variable body
//! - **Log File**: append-only, positional reads that don't block each other
//! - **Index**: hash map from key to the latest record location
//! - **Recovery**: replays the log on open, discarding a torn tail
//! - **Compaction**: copy-and-swap rewrite keeping only live records
//! - **Concurrency**: single writer / many readers through `Store`
//! - **Metrics**: lock-free atomic counters for observability
//!
//! ## Example
//! ```no_run
//! use cask::Store;
//!
//! let store = Store::open("data/cask.log").unwrap();
//!
//! store.put(b"key", b"value").unwrap();
//! assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));
//!
//! store.delete(b"key").unwrap();
//! store.compact().unwrap();
//! store.close().unwrap();
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use config::Config;
pub use engine::store::Store;
pub use engine::{Cask, CaskStats};
pub use error::{CaskError, Result};
