//! Encryption context: the process-wide (key, start counter) pair.
//!
//! Uses Ctr128BE (big-endian 128-bit counter) to match the encryptor's
//! `AES-CTR` with `length: 128`.
//!
//! SECURITY NOTE: AES-CTR does NOT provide authentication. Integrity of
//! the encrypted asset must be ensured by the surrounding system.

use aes::Aes256;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ctr::cipher::{KeyIvInit, StreamCipher};
use thiserror::Error;
use zeroize::Zeroizing;

use super::counter::{self, CounterBlock, BLOCK_SIZE};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// Type alias for AES-256-CTR with 128-bit big-endian counter.
type Aes256Ctr128BE = ctr::Ctr128BE<Aes256>;

/// Failure to decode or import configuration key material.
///
/// The engine stays unconfigured after any of these; decryption attempts
/// keep failing with the configuration fault until a later import succeeds.
#[derive(Debug, Error)]
pub enum KeyImportError {
    #[error("invalid base64url encoding")]
    InvalidEncoding,
    #[error("key must be {KEY_SIZE} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("start counter must be {BLOCK_SIZE} bytes, got {0}")]
    InvalidCounterLength(usize),
}

/// Cipher-level decryption failure.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("decryption failed: keystream exhausted")]
    KeystreamExhausted,
}

/// Immutable pair of AES-256 key and CTR start counter.
///
/// Set exactly once per process (see `AppState`); every request stream
/// reads it concurrently without synchronization. The key buffer is
/// zeroed on drop.
#[derive(Clone)]
pub struct EncryptionContext {
    key: Zeroizing<[u8; KEY_SIZE]>,
    start_counter: CounterBlock,
}

impl std::fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("key", &"<redacted>")
            .field("start_counter", &self.start_counter)
            .finish()
    }
}

impl EncryptionContext {
    /// Create a context from raw key material.
    pub fn new(key: [u8; KEY_SIZE], start_counter: CounterBlock) -> Self {
        Self {
            key: Zeroizing::new(key),
            start_counter,
        }
    }

    /// Import a context from the base64url-encoded configuration payload.
    ///
    /// Accepts both padded and unpadded base64url (the provisioning side
    /// re-encodes a standard base64 export with URL-safe characters, so
    /// trailing `=` may or may not be present).
    pub fn from_base64url(counter_b64: &str, key_b64: &str) -> Result<Self, KeyImportError> {
        let counter_bytes = decode_base64url(counter_b64)?;
        let key_bytes = decode_base64url(key_b64)?;

        let start_counter: CounterBlock = counter_bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyImportError::InvalidCounterLength(counter_bytes.len()))?;

        let key: [u8; KEY_SIZE] = key_bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyImportError::InvalidKeyLength(key_bytes.len()))?;

        Ok(Self::new(key, start_counter))
    }

    /// The configured start counter block.
    pub fn start_counter(&self) -> &CounterBlock {
        &self.start_counter
    }

    /// XOR the keystream for the given block-aligned byte offset into `buf`.
    ///
    /// CTR encrypt == decrypt, so this serves both directions. `offset`
    /// must be a multiple of the block size; the block aligner is
    /// responsible for handing only aligned offsets down here.
    pub(crate) fn apply_keystream_at(
        &self,
        offset: u128,
        buf: &mut [u8],
    ) -> Result<(), CipherError> {
        debug_assert_eq!(offset % BLOCK_SIZE as u128, 0);

        let counter = counter::seek(&self.start_counter, offset);
        let key: &[u8; KEY_SIZE] = &self.key;
        let mut cipher = Aes256Ctr128BE::new(key.into(), &counter.into());
        cipher
            .try_apply_keystream(buf)
            .map_err(|_| CipherError::KeystreamExhausted)
    }
}

fn decode_base64url(input: &str) -> Result<Vec<u8>, KeyImportError> {
    URL_SAFE_NO_PAD
        .decode(input.trim_end_matches('='))
        .map_err(|_| KeyImportError::InvalidEncoding)
}
