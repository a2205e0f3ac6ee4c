//! Decrypting reverse proxy for a single remote AES-CTR encrypted asset.
//!
//! Serves byte-range requests as plaintext without ever holding the whole
//! decrypted asset in memory: ciphertext is pulled chunk by chunk from the
//! upstream object store and decrypted lazily, re-deriving the CTR counter
//! for every offset.

pub mod config;
pub mod crypto;
pub mod proxy;
pub mod state;
pub mod stream;
