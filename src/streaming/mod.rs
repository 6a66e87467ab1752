//! Range stream server.
//!
//! Turns a stream token and an optional `Range` header into an HTTP byte
//! stream fed from remote chunk fetches.
//!
//! # Session lifecycle
//!
//! `Opening` resolves the token, acquires a credential and fetches the first
//! chunk. `Streaming` runs in a spawned task that feeds a bounded channel,
//! so at most `prefetch_chunks` chunks sit in memory ahead of the client.
//! The task ends when the range is delivered, a fetch fails twice, or the
//! response body is dropped; the credential is released on every path.

mod chunks;
mod range;
mod session;
mod token;

pub use chunks::{fetch_with_retry, ChunkPlan};
pub use range::{parse_range_header, resolve_range, ByteRange, RangeRequest};
pub use session::{SessionState, StreamSession};
pub use token::{decode_token, encode_token};

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use bytes::Bytes;
use reelgate_common::{ChatId, Error, Result, SessionId};
use reelgate_fileid::FileDescriptor;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::pool::{CredentialLease, CredentialPool};

/// Response body frames. An `Err` frame aborts the response mid-body.
pub type ChunkStream = ReceiverStream<Result<Bytes>>;

/// Tuning for the chunk loop.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Remote chunk size; offsets are aligned to it.
    pub chunk_size: u64,
    /// Bound on each fetch attempt.
    pub chunk_timeout: Duration,
    /// Chunks buffered ahead of the client.
    pub prefetch_chunks: usize,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_size: 1024 * 1024,
            chunk_timeout: Duration::from_secs(30),
            prefetch_chunks: 2,
        }
    }
}

/// An opened stream: response metadata plus the body.
pub struct OpenStream {
    pub session_id: SessionId,
    pub range: ByteRange,
    pub content_type: String,
    /// Name declared by the message, possibly empty.
    pub file_name: String,
    pub body: ChunkStream,
}

impl OpenStream {
    pub fn status(&self) -> StatusCode {
        if self.range.partial {
            StatusCode::PARTIAL_CONTENT
        } else {
            StatusCode::OK
        }
    }

    pub fn content_length(&self) -> Option<u64> {
        self.range.len()
    }

    pub fn content_range(&self) -> Option<String> {
        self.range.content_range()
    }
}

impl std::fmt::Debug for OpenStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenStream")
            .field("session_id", &self.session_id)
            .field("range", &self.range)
            .field("content_type", &self.content_type)
            .field("file_name", &self.file_name)
            .finish_non_exhaustive()
    }
}

/// Serves stored files through the credential pool.
#[derive(Clone)]
pub struct StreamServer {
    pool: CredentialPool,
    settings: StreamSettings,
    default_chat: ChatId,
    shutdown: CancellationToken,
}

impl StreamServer {
    pub fn new(pool: CredentialPool, settings: StreamSettings, default_chat: ChatId) -> Self {
        Self {
            pool,
            settings,
            default_chat,
            shutdown: CancellationToken::new(),
        }
    }

    /// Abort open sessions when `shutdown` is cancelled.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn settings(&self) -> &StreamSettings {
        &self.settings
    }

    /// Resolve a stream token and open the requested range.
    pub async fn serve(&self, token: &str, range_header: Option<&str>) -> Result<OpenStream> {
        let message = decode_token(token, self.default_chat)?;
        let lease = self.pool.acquire()?;

        let timeout = self.settings.chunk_timeout;
        let source = tokio::time::timeout(timeout, lease.client().get_message(message))
            .await
            .map_err(|_| {
                Error::store(
                    "get_message",
                    format!("timed out after {}ms", timeout.as_millis()),
                )
            })??;
        let descriptor = reelgate_fileid::resolve(&source)?;
        tracing::debug!(
            %message,
            media = ?descriptor.media_kind,
            size = ?descriptor.size(),
            "Resolved stored file"
        );

        let request = range_header.and_then(parse_range_header);
        self.open(descriptor, lease, request).await
    }

    /// Open `request` of `descriptor` using an already acquired credential.
    ///
    /// The first chunk is fetched before returning so that a failing file
    /// surfaces as an error instead of an empty response.
    pub async fn open(
        &self,
        descriptor: FileDescriptor,
        lease: CredentialLease,
        request: Option<RangeRequest>,
    ) -> Result<OpenStream> {
        let range = resolve_range(request, descriptor.size())?;
        let plan = ChunkPlan::new(&range, self.settings.chunk_size);
        let client = lease.client().clone();
        let descriptor = Arc::new(descriptor);
        let mut session = StreamSession::new(descriptor.clone(), lease, range);

        let first = if range.is_empty() {
            None
        } else {
            match fetch_with_retry(
                client.as_ref(),
                &descriptor,
                plan.first_offset,
                plan.chunk_size,
                self.settings.chunk_timeout,
            )
            .await
            {
                Ok(chunk) => Some(chunk),
                Err(e) => {
                    session.finish(SessionState::Failed);
                    return Err(e);
                }
            }
        };

        let (tx, rx) = mpsc::channel(self.settings.prefetch_chunks.max(1));
        let opened = OpenStream {
            session_id: session.id(),
            range,
            content_type: descriptor.mime_type().to_string(),
            file_name: descriptor.file_name().to_string(),
            body: ReceiverStream::new(rx),
        };

        tokio::spawn(chunks::run_session(
            session,
            descriptor,
            plan,
            first,
            self.settings.chunk_timeout,
            tx,
            self.shutdown.clone(),
        ));

        Ok(opened)
    }
}
