//! Per-request streaming session state.

use std::sync::Arc;
use std::time::Instant;

use reelgate_common::SessionId;
use reelgate_fileid::FileDescriptor;

use super::range::ByteRange;
use crate::pool::CredentialLease;

/// Lifecycle of one streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Resolving the file and acquiring a credential.
    Opening,
    /// Chunk loop running.
    Streaming,
    /// Every requested byte was delivered.
    Completed,
    /// The client went away.
    Aborted,
    /// A fetch failed after its retry.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

/// Binds one descriptor, one credential lease and one byte range.
///
/// Dropping the session releases the credential. A session dropped before
/// reaching a terminal state is recorded as aborted.
pub struct StreamSession {
    id: SessionId,
    descriptor: Arc<FileDescriptor>,
    lease: CredentialLease,
    range: ByteRange,
    delivered: u64,
    state: SessionState,
    started: Instant,
}

impl StreamSession {
    pub fn new(descriptor: Arc<FileDescriptor>, lease: CredentialLease, range: ByteRange) -> Self {
        Self {
            id: SessionId::new(),
            descriptor,
            lease,
            range,
            delivered: 0,
            state: SessionState::Opening,
            started: Instant::now(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn descriptor(&self) -> &FileDescriptor {
        &self.descriptor
    }

    pub fn lease(&self) -> &CredentialLease {
        &self.lease
    }

    pub fn range(&self) -> &ByteRange {
        &self.range
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn begin(&mut self) {
        self.state = SessionState::Streaming;
        tracing::debug!(
            session = %self.id,
            credential = %self.lease.label(),
            start = self.range.start,
            end = ?self.range.end,
            "Streaming session started"
        );
    }

    /// Bytes still owed to the client, `None` when unbounded.
    pub fn remaining(&self) -> Option<u64> {
        self.range.len().map(|len| len - self.delivered)
    }

    pub fn record(&mut self, bytes: u64) {
        debug_assert!(self.remaining().map_or(true, |r| bytes <= r));
        self.delivered += bytes;
    }

    pub fn finish(&mut self, state: SessionState) {
        debug_assert!(state.is_terminal());
        if self.state.is_terminal() {
            return;
        }
        self.state = state;

        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        match state {
            SessionState::Completed => tracing::debug!(
                session = %self.id,
                credential = %self.lease.label(),
                delivered = self.delivered,
                elapsed_ms,
                "Streaming session completed"
            ),
            SessionState::Aborted => tracing::info!(
                session = %self.id,
                credential = %self.lease.label(),
                delivered = self.delivered,
                elapsed_ms,
                "Client disconnected, streaming session aborted"
            ),
            _ => tracing::warn!(
                session = %self.id,
                credential = %self.lease.label(),
                delivered = self.delivered,
                elapsed_ms,
                "Streaming session failed"
            ),
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            self.finish(SessionState::Aborted);
        }
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.id)
            .field("credential", &self.lease.label())
            .field("range", &self.range)
            .field("delivered", &self.delivered)
            .field("state", &self.state)
            .finish()
    }
}
