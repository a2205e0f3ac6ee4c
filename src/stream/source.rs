//! Upstream byte sources for the decrypt stream.
//!
//! The decryptor pulls ciphertext one chunk at a time through the
//! `ByteSource` seam. Production traffic uses `UpstreamSource` over a
//! reqwest response; tests script their own sources.

use bytes::Bytes;

use super::decryptor::StreamError;

/// A pull-based ciphertext source.
///
/// `read` yields the next chunk, `Ok(None)` at end-of-stream. `cancel`
/// is invoked at most once per stream and must release the underlying
/// transfer.
#[allow(async_fn_in_trait)]
pub trait ByteSource {
    async fn read(&mut self) -> Result<Option<Bytes>, StreamError>;
    async fn cancel(&mut self);
}

/// Ciphertext source backed by an in-flight ranged GET.
pub struct UpstreamSource {
    // None once cancelled; dropping the response aborts the transfer.
    response: Option<reqwest::Response>,
}

impl UpstreamSource {
    pub fn new(response: reqwest::Response) -> Self {
        Self {
            response: Some(response),
        }
    }
}

impl ByteSource for UpstreamSource {
    async fn read(&mut self) -> Result<Option<Bytes>, StreamError> {
        match self.response.as_mut() {
            Some(response) => response
                .chunk()
                .await
                .map_err(|e| StreamError::Upstream(e.to_string())),
            None => Ok(None),
        }
    }

    async fn cancel(&mut self) {
        self.response.take();
    }
}
