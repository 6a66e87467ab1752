//! Remote chat-based file store boundary.
//!
//! [`StoreClient`] is everything the streaming core needs from the remote
//! store. Each pooled credential owns one client.
//!
//! - [`BotApiClient`] talks to the Bot HTTP API
//! - [`MemoryStore`] keeps messages and files in process (tests, local runs)

mod botapi;
mod memory;

pub use botapi::BotApiClient;
pub use memory::MemoryStore;

use async_trait::async_trait;
use bytes::Bytes;
use reelgate_common::{MessageRef, Result};
use reelgate_fileid::{FileDescriptor, SourceMessage};

#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Fetch one message; missing messages are `NotFound`.
    async fn get_message(&self, message: MessageRef) -> Result<SourceMessage>;

    /// Fetch up to `limit` bytes of a file starting at `offset`.
    ///
    /// `offset` must be a multiple of `limit`. A short or empty result means
    /// the end of the file was reached.
    async fn fetch_chunk(
        &self,
        descriptor: &FileDescriptor,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes>;

    /// Replace the text of a previously sent message.
    async fn edit_message_text(&self, message: MessageRef, text: &str) -> Result<()>;
}
