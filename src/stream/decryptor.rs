//! Pull-driven streaming decryptor.
//!
//! One `produce_next` call per unit of consumer demand: drain the pending
//! queue if possible, otherwise issue exactly one upstream read, run the
//! block aligner against the received bytes, emit the head chunk and queue
//! the tail (if the read straddled a block boundary) for the next pull.
//! Suspension happens only at the upstream read.

use std::collections::VecDeque;

use bytes::Bytes;
use thiserror::Error;

use crate::crypto::{block, CipherError, EncryptionContext};

use super::source::ByteSource;

/// Upper bound on the pending queue: at most one alignment split happens
/// per upstream read, so one chunk is in flight and one is queued.
pub const PENDING_LIMIT: usize = 2;

/// Decrypt stream failure.
///
/// Every variant is terminal for its stream and reported exactly once, by
/// the `produce_next` call that hit it. No retries.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Decryption attempted before the encryption context was configured.
    #[error("decryption engine is not configured")]
    Unconfigured,
    /// Upstream transport failure. Bytes already emitted stand.
    #[error("upstream read failed: {0}")]
    Upstream(String),
    /// Cipher-level failure.
    #[error(transparent)]
    Cipher(#[from] CipherError),
    /// The consumer asked for a direct-buffer read; only owned-chunk
    /// delivery is supported. This is a programming error in the caller,
    /// not a runtime condition.
    #[error("direct buffer reads are not supported")]
    UnsupportedReadMode,
}

/// Stream lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Queue empty, no upstream read in flight.
    Idle,
    /// Queue non-empty: the next pull is satisfied synchronously.
    Draining,
    /// Awaiting one upstream read.
    Reading,
    /// Upstream exhausted.
    Closed,
    /// Consumer abandoned the stream.
    Cancelled,
    /// Terminal, error already surfaced.
    Failed,
}

impl StreamState {
    fn is_terminal(self) -> bool {
        matches!(
            self,
            StreamState::Closed | StreamState::Cancelled | StreamState::Failed
        )
    }
}

/// Streaming range-aware CTR decryptor over a pull-based byte source.
///
/// Owns the running offset of the next unread byte (monotonic, never
/// rewound) and a bounded pending queue. `&mut self` on every operation
/// enforces the strictly-sequential pull contract.
pub struct StreamDecryptor<S: ByteSource> {
    context: Option<EncryptionContext>,
    source: S,
    offset: u128,
    pending: VecDeque<Bytes>,
    state: StreamState,
}

impl<S: ByteSource> StreamDecryptor<S> {
    /// Create a decryptor for a stream whose first upstream byte sits at
    /// logical `offset`.
    ///
    /// `context` is whatever was configured at attach time; `None` makes
    /// the first pull fail with the configuration fault, which is the
    /// only place startup ordering is enforced.
    pub fn new(context: Option<EncryptionContext>, source: S, offset: u128) -> Self {
        Self {
            context,
            source,
            offset,
            pending: VecDeque::with_capacity(PENDING_LIMIT),
            state: StreamState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Logical offset of the next unread byte.
    pub fn offset(&self) -> u128 {
        self.offset
    }

    /// Produce the next plaintext chunk, or `Ok(None)` once the stream is
    /// over (upstream exhausted, cancelled, or after a reported failure).
    ///
    /// Calls are strictly sequential; at most one upstream read is issued
    /// per call and a queued chunk is returned without suspending.
    pub async fn produce_next(&mut self) -> Result<Option<Bytes>, StreamError> {
        if self.state.is_terminal() {
            return Ok(None);
        }

        let Some(context) = self.context.clone() else {
            self.state = StreamState::Failed;
            return Err(StreamError::Unconfigured);
        };

        if let Some(chunk) = self.pending.pop_front() {
            self.state = if self.pending.is_empty() {
                StreamState::Idle
            } else {
                StreamState::Draining
            };
            return Ok(Some(chunk));
        }

        self.state = StreamState::Reading;
        let bytes = match self.source.read().await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                self.state = StreamState::Closed;
                return Ok(None);
            }
            Err(err) => {
                self.state = StreamState::Failed;
                return Err(err);
            }
        };

        let chunks = match block::decrypt_chunk(&context, self.offset, &bytes) {
            Ok(chunks) => chunks,
            Err(err) => {
                self.state = StreamState::Failed;
                return Err(err.into());
            }
        };

        self.offset = chunks.next_offset;
        if let Some(tail) = chunks.tail {
            debug_assert!(self.pending.len() < PENDING_LIMIT);
            self.pending.push_back(tail);
            self.state = StreamState::Draining;
        } else {
            self.state = StreamState::Idle;
        }

        Ok(Some(chunks.head))
    }

    /// Cancel the stream.
    ///
    /// Propagates exactly one cancellation to the still-open upstream
    /// read and discards queued chunks without flushing them. Idempotent:
    /// repeat calls (and calls after close/failure) do nothing.
    pub async fn cancel(&mut self) {
        if self.state.is_terminal() {
            return;
        }

        self.pending.clear();
        self.state = StreamState::Cancelled;
        self.source.cancel().await;
    }

    /// Direct-buffer read mode is not supported; the stream delivers
    /// owned chunks only. Fails fast and poisons the stream, mirroring a
    /// consumer protocol violation.
    pub fn produce_into(&mut self, _buf: &mut [u8]) -> Result<usize, StreamError> {
        self.state = StreamState::Failed;
        Err(StreamError::UnsupportedReadMode)
    }
}
