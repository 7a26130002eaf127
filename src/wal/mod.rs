//! Write-ahead log: ordered, checksummed, durable record of every mutation
//! applied to the store before it takes effect in memory.
//!
//! Records are appended as JSON lines to a segment file named
//! `wal_<unix-seconds>.log`; segments rotate by size or on checkpoint.
//! Every record carries a CRC32 checksum computed over itself with the
//! checksum field zeroed, so a single bit flip on disk is caught on replay.

mod checksum;
mod errors;
mod reader;
mod record;
mod segment;
mod writer;

pub use errors::{WalError, WalErrorKind, WalResult};
pub use reader::{read_segment, ReadOutcome};
pub use record::{BatchUpdateOp, RecordKind, WalOp, WalRecord};
pub use segment::{list_segments, segment_path, segment_timestamp};
pub use writer::{sorted_by_timestamp, DurabilityLevel, WalWriter};
