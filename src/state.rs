//! Process-wide shared state.
//!
//! The encryption context is the only resource shared across request
//! streams: written at most once (boot-time flags or `POST /configure`),
//! read lock-free by every stream thereafter. All per-request state lives
//! inside that request's decryptor.

use std::sync::OnceLock;
use std::time::Duration;

use thiserror::Error;

use crate::crypto::EncryptionContext;

/// A second configuration attempt; the context is write-once.
#[derive(Debug, Error)]
#[error("encryption context is already configured")]
pub struct AlreadyConfigured;

/// Shared state handed to every connection task.
pub struct AppState {
    /// HTTP client for upstream object-store fetches.
    pub http: reqwest::Client,

    /// Upstream origin, no trailing slash (e.g. `https://dl.example.com`).
    pub upstream_origin: String,

    /// Write-once encryption context. Empty until configured; absence is
    /// a distinct state the decryptor reports as a configuration fault.
    context: OnceLock<EncryptionContext>,
}

impl AppState {
    /// Create state for the given upstream origin.
    ///
    /// No total request timeout: a media stream legitimately stays open
    /// for hours. Connect timeout only.
    pub fn new(upstream_origin: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            http,
            upstream_origin: upstream_origin.trim_end_matches('/').to_string(),
            context: OnceLock::new(),
        }
    }

    /// Install the encryption context. Fails if one is already set.
    pub fn configure(&self, context: EncryptionContext) -> Result<(), AlreadyConfigured> {
        self.context.set(context).map_err(|_| AlreadyConfigured)
    }

    /// Snapshot of the configured context, if any, for a new stream.
    pub fn context(&self) -> Option<EncryptionContext> {
        self.context.get().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KEY_SIZE;

    #[test]
    fn test_context_is_write_once() {
        let state = AppState::new("http://origin.example/");
        assert!(state.context().is_none());

        let context = EncryptionContext::new([1u8; KEY_SIZE], [2u8; 16]);
        state.configure(context).unwrap();
        assert!(state.context().is_some());

        let replacement = EncryptionContext::new([3u8; KEY_SIZE], [4u8; 16]);
        assert!(state.configure(replacement).is_err());
    }

    #[test]
    fn test_origin_trailing_slash_is_trimmed() {
        let state = AppState::new("http://origin.example/");
        assert_eq!(state.upstream_origin, "http://origin.example");
    }
}
