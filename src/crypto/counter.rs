//! CTR counter arithmetic.
//!
//! AES-CTR derives the keystream for a block purely from (key, counter),
//! so random access only requires computing the counter for the target
//! block: `start_counter + floor(offset / 16)`, big-endian, wrapping
//! modulo 2^128.

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// A 16-byte big-endian CTR counter block.
pub type CounterBlock = [u8; BLOCK_SIZE];

/// Compute the counter block for the given byte offset.
///
/// Interprets `start` as a big-endian 128-bit integer, adds the block
/// index `offset / 16`, and re-encodes. Wraps modulo 2^128 per CTR
/// semantics; unreachable for any asset smaller than 2^132 bytes, so
/// not guarded.
///
/// Pure: identical arguments always yield identical bytes.
pub fn seek(start: &CounterBlock, offset: u128) -> CounterBlock {
    if offset == 0 {
        return *start;
    }

    let base = u128::from_be_bytes(*start);
    base.wrapping_add(offset / BLOCK_SIZE as u128).to_be_bytes()
}
