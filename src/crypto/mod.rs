//! Range-aware AES-CTR decryption primitives.
//!
//! CTR mode enables random-access decryption (any byte range without
//! processing preceding bytes): the counter for an offset is derived
//! arithmetically and misaligned offsets are reconciled by rebuilding
//! the containing block with placeholder bytes.

pub mod block;
pub mod context;
pub mod counter;

// Re-export primary types for convenience
pub use block::{decrypt_chunk, AlignedChunks};
pub use context::{CipherError, EncryptionContext, KeyImportError, KEY_SIZE};
pub use counter::{seek, CounterBlock, BLOCK_SIZE};
