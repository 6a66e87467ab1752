//! In-process store backed by concurrent maps.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::Mutex;
use reelgate_common::{ChatId, Error, MessageId, MessageRef, Result};
use reelgate_fileid::{
    FileDescriptor, FileLocation, FileType, MediaAttachment, MediaKind, SourceMessage,
};

use super::StoreClient;

const MEMORY_DC_ID: i32 = 2;

/// Messages and file contents held in memory.
///
/// Supports the fault injection the streaming tests need: failing a number
/// of upcoming fetches, delaying every fetch, and failing edits.
#[derive(Default)]
pub struct MemoryStore {
    messages: DashMap<MessageRef, SourceMessage>,
    files: DashMap<i64, Bytes>,
    next_media_id: AtomicI64,
    next_message_id: AtomicI64,
    failing_fetches: AtomicUsize,
    fetch_calls: AtomicUsize,
    fetch_delay: Mutex<Option<Duration>>,
    fail_edits: AtomicBool,
    edits: Mutex<Vec<(MessageRef, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            next_media_id: AtomicI64::new(1000),
            next_message_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Store `content` as a document message in `chat` and return its reference.
    ///
    /// `declared_size` overrides the size advertised by the message; `None`
    /// advertises the real length.
    pub fn insert_file(
        &self,
        chat: ChatId,
        kind: MediaKind,
        file_name: &str,
        mime_type: &str,
        content: impl Into<Bytes>,
        declared_size: Option<u64>,
    ) -> Result<MessageRef> {
        let content = content.into();
        let media_id = self.next_media_id.fetch_add(1, Ordering::Relaxed);
        let message_id = MessageId(self.next_message_id.fetch_add(1, Ordering::Relaxed));
        let reference = MessageRef::new(chat, message_id);

        let file_id = FileLocation::document(
            file_type_for(kind),
            MEMORY_DC_ID,
            media_id,
            media_id.wrapping_mul(31),
        )
        .with_file_reference(media_id.to_le_bytes().to_vec())
        .encode()
        .map_err(Error::from)?;

        let attachment = MediaAttachment {
            file_id,
            file_unique_id: format!("mem{media_id}"),
            file_name: Some(file_name.to_string()),
            file_size: Some(declared_size.unwrap_or(content.len() as u64)),
            mime_type: Some(mime_type.to_string()),
        };

        self.files.insert(media_id, content);
        self.messages.insert(
            reference,
            SourceMessage::new(reference).with_media(kind, attachment),
        );
        Ok(reference)
    }

    /// Insert an arbitrary message, replacing any previous one.
    pub fn insert_message(&self, message: SourceMessage) {
        self.messages.insert(message.reference, message);
    }

    /// Make the next `count` chunk fetches fail.
    pub fn fail_next_fetches(&self, count: usize) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    /// Sleep this long before answering each chunk fetch.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        *self.fetch_delay.lock() = delay;
    }

    pub fn fail_edits(&self, fail: bool) {
        self.fail_edits.store(fail, Ordering::SeqCst);
    }

    /// Number of chunk fetches attempted so far, failed ones included.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Successful edits, in order.
    pub fn edits(&self) -> Vec<(MessageRef, String)> {
        self.edits.lock().clone()
    }

    fn take_failure(&self) -> bool {
        self.failing_fetches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn file_type_for(kind: MediaKind) -> FileType {
    match kind {
        MediaKind::Document => FileType::Document,
        MediaKind::Photo => FileType::Document,
        MediaKind::Video => FileType::Video,
        MediaKind::Audio => FileType::Audio,
        MediaKind::Voice => FileType::Voice,
        MediaKind::VideoNote => FileType::VideoNote,
        MediaKind::Sticker => FileType::Sticker,
        MediaKind::Animation => FileType::Animation,
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    async fn get_message(&self, message: MessageRef) -> Result<SourceMessage> {
        self.messages
            .get(&message)
            .map(|m| m.value().clone())
            .ok_or_else(|| Error::not_found("message", message))
    }

    async fn fetch_chunk(
        &self,
        descriptor: &FileDescriptor,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.fetch_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.take_failure() {
            return Err(Error::store("fetch_chunk", "injected failure"));
        }
        if limit == 0 || offset % limit != 0 {
            return Err(Error::internal(format!(
                "unaligned chunk request: offset {offset}, limit {limit}"
            )));
        }

        let media_id = descriptor
            .location
            .media_id()
            .ok_or_else(|| Error::store("fetch_chunk", "location has no media id"))?;
        let content = self
            .files
            .get(&media_id)
            .map(|f| f.value().clone())
            .ok_or_else(|| Error::not_found("file", media_id))?;

        let len = content.len() as u64;
        if offset >= len {
            return Ok(Bytes::new());
        }
        let end = (offset + limit).min(len);
        Ok(content.slice(offset as usize..end as usize))
    }

    async fn edit_message_text(&self, message: MessageRef, text: &str) -> Result<()> {
        if self.fail_edits.load(Ordering::SeqCst) {
            return Err(Error::store("edit_message_text", "injected failure"));
        }
        self.edits.lock().push((message, text.to_string()));
        Ok(())
    }
}
