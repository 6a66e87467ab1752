//! Chunk planning and the per-session fetch loop.
//!
//! The remote store only serves fixed-size chunks at aligned offsets. The
//! loop fetches from the chunk containing the first requested byte, drops
//! the leading bytes of that chunk, and cuts the last one at the range end.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reelgate_common::{Error, Result};
use reelgate_fileid::FileDescriptor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::range::ByteRange;
use super::session::{SessionState, StreamSession};
use crate::store::StoreClient;

/// Where the chunk loop starts for a given range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub chunk_size: u64,
    /// Aligned offset of the first chunk.
    pub first_offset: u64,
    /// Bytes to drop from the front of the first chunk.
    pub skip: u64,
    /// Bytes to deliver, `None` for until end of file.
    pub limit: Option<u64>,
}

impl ChunkPlan {
    pub fn new(range: &ByteRange, chunk_size: u64) -> Self {
        let first_offset = range.start - range.start % chunk_size;
        Self {
            chunk_size,
            first_offset,
            skip: range.start - first_offset,
            limit: range.len(),
        }
    }

    /// Number of remote fetches a bounded range needs.
    pub fn chunk_count(&self) -> Option<u64> {
        self.limit.map(|limit| {
            if limit == 0 {
                0
            } else {
                (self.skip + limit).div_ceil(self.chunk_size)
            }
        })
    }
}

/// Fetch one aligned chunk, retrying once on a transient failure or timeout.
///
/// Non-transient errors (a missing file, a bad request) are returned as is
/// without a second attempt.
pub async fn fetch_with_retry(
    client: &dyn StoreClient,
    descriptor: &FileDescriptor,
    offset: u64,
    chunk_size: u64,
    timeout: Duration,
) -> Result<Bytes> {
    let mut last_error = String::new();
    for attempt in 1..=2u8 {
        match tokio::time::timeout(timeout, client.fetch_chunk(descriptor, offset, chunk_size))
            .await
        {
            Ok(Ok(chunk)) => return Ok(chunk),
            Ok(Err(e)) if !e.is_transient() => return Err(e),
            Ok(Err(e)) => last_error = e.to_string(),
            Err(_) => last_error = format!("timed out after {}ms", timeout.as_millis()),
        }
        tracing::warn!(offset, attempt, error = %last_error, "Chunk fetch failed");
    }
    Err(Error::stream(offset, last_error))
}

/// Drive one session to a terminal state, sending body frames to `tx`.
///
/// `first` is the already fetched chunk at `plan.first_offset`, if any.
/// The session, and with it the credential lease, is dropped when this
/// returns. Cancelling `shutdown` aborts the session at its next
/// suspension point.
pub(super) async fn run_session(
    mut session: StreamSession,
    descriptor: Arc<FileDescriptor>,
    plan: ChunkPlan,
    first: Option<Bytes>,
    timeout: Duration,
    tx: mpsc::Sender<Result<Bytes>>,
    shutdown: CancellationToken,
) {
    let client = session.lease().client().clone();
    let mut offset = plan.first_offset;
    let mut skip = plan.skip as usize;
    let mut pending = first;

    session.begin();
    loop {
        if session.remaining() == Some(0) {
            session.finish(SessionState::Completed);
            return;
        }

        let chunk = match pending.take() {
            Some(chunk) => chunk,
            None => {
                tokio::select! {
                    biased;
                    _ = tx.closed() => {
                        session.finish(SessionState::Aborted);
                        return;
                    }
                    _ = shutdown.cancelled() => {
                        session.finish(SessionState::Aborted);
                        return;
                    }
                    fetched = fetch_with_retry(
                        client.as_ref(),
                        &descriptor,
                        offset,
                        plan.chunk_size,
                        timeout,
                    ) => match fetched {
                        Ok(chunk) => chunk,
                        Err(e) => {
                            deliver(&tx, Err(e), &shutdown).await;
                            session.finish(SessionState::Failed);
                            return;
                        }
                    },
                }
            }
        };

        let full = chunk.len() as u64 >= plan.chunk_size;
        let mut data = if skip < chunk.len() {
            chunk.slice(skip..)
        } else {
            Bytes::new()
        };
        skip = 0;
        if let Some(remaining) = session.remaining() {
            if data.len() as u64 > remaining {
                data.truncate(remaining as usize);
            }
        }

        if !data.is_empty() {
            let len = data.len() as u64;
            if !deliver(&tx, Ok(data), &shutdown).await {
                session.finish(SessionState::Aborted);
                return;
            }
            session.record(len);
        }

        if !full {
            match session.remaining() {
                Some(remaining) if remaining > 0 => {
                    let e = Error::stream(offset, format!("file ended {remaining} bytes early"));
                    deliver(&tx, Err(e), &shutdown).await;
                    session.finish(SessionState::Failed);
                }
                _ => session.finish(SessionState::Completed),
            }
            return;
        }
        offset += plan.chunk_size;
    }
}

/// Send one frame, waiting for buffer space. False when the receiver is
/// gone or shutdown started.
async fn deliver(
    tx: &mpsc::Sender<Result<Bytes>>,
    frame: Result<Bytes>,
    shutdown: &CancellationToken,
) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        sent = tx.send(frame) => sent.is_ok(),
    }
}
