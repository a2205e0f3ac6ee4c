//! Streaming decryption: pull-based decryptor and its upstream sources.

pub mod decryptor;
pub mod source;

pub use decryptor::{StreamDecryptor, StreamError, StreamState, PENDING_LIMIT};
pub use source::{ByteSource, UpstreamSource};
