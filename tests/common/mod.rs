//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a full [`AppContext`] whose
//! credentials are all backed by one [`MemoryStore`]. The [`with_server`]
//! constructors start Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use reelgate::catalog::{Catalog, JsonCatalog};
use reelgate::config::Config;
use reelgate::pool::CredentialPool;
use reelgate::server::{create_router, AppContext};
use reelgate::store::MemoryStore;
use reelgate::streaming::encode_token;
use reelgate_common::ChatId;
use reelgate_fileid::MediaKind;
use tempfile::TempDir;

/// Chat the harness stores files in; also the default chat.
pub const CHAT: ChatId = ChatId(-100200300);

/// Chunk size used by harness servers.
pub const CHUNK: usize = 4096;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory store.
pub struct TestHarness {
    pub ctx: AppContext,
    pub store: Arc<MemoryStore>,
    /// Holds the restart marker; removed on drop.
    pub dir: TempDir,
}

/// Default configuration for harness servers.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.server.base_url = Some("http://media.test".into());
    config.stream.chunk_size = CHUNK as u64;
    config.stream.chunk_timeout_secs = 1;
    config.telegram.bin_chat_id = CHAT.0;
    config
}

impl TestHarness {
    /// Create a new harness with two credentials and no catalog.
    pub fn new() -> Self {
        Self::with_options(test_config(), 2, None)
    }

    /// Create a harness with a custom configuration, credential count and
    /// catalog.
    pub fn with_options(mut config: Config, credentials: usize, catalog: Option<JsonCatalog>) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.restart.marker_path = dir.path().join(".restartmsg");

        let store = Arc::new(MemoryStore::new());
        let pool = CredentialPool::new();
        for i in 0..credentials {
            pool.register(format!("bot-{i}"), store.clone());
        }

        let catalog = catalog.map(|c| Arc::new(c) as Arc<dyn Catalog>);
        let ctx = AppContext::new(config, pool, catalog);

        Self { ctx, store, dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start an Axum server with custom options on a random port.
    pub async fn with_server_options(
        config: Config,
        credentials: usize,
        catalog: Option<JsonCatalog>,
    ) -> (Self, SocketAddr) {
        Self::with_options(config, credentials, catalog).serve().await
    }

    async fn serve(self) -> (Self, SocketAddr) {
        let app = create_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    pub fn pool(&self) -> &CredentialPool {
        self.ctx.pool()
    }

    /// Store a video message and return its stream token.
    pub fn insert_video(&self, name: &str, content: Vec<u8>) -> String {
        self.insert_video_sized(name, content, None)
    }

    /// Like [`insert_video`](Self::insert_video) with an overridden declared size.
    pub fn insert_video_sized(&self, name: &str, content: Vec<u8>, declared: Option<u64>) -> String {
        let message = self
            .store
            .insert_file(CHAT, MediaKind::Video, name, "video/x-matroska", content, declared)
            .expect("failed to insert file");
        encode_token(message)
    }

    /// Wait until every credential's load is back to zero.
    pub async fn wait_for_idle(&self) {
        for _ in 0..200 {
            if self.pool().total_load() == 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("pool still loaded: {:?}", self.pool().snapshot());
    }
}

/// Deterministic file content of `len` bytes.
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
