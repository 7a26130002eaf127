//! CRC32 (IEEE) checksum computation for WAL records.
//!
//! Every WAL record carries a checksum computed over the record with the
//! checksum field itself zeroed. A mismatch on read means corruption.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided bytes.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that `data` hashes to `expected`.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}
