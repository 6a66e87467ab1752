use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use reelgate_common::ChatId;

use crate::streaming::StreamSettings;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stream: StreamConfig,

    #[serde(default)]
    pub telegram: TelegramConfig,

    #[serde(default)]
    pub restart: RestartConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Public URL used in stream links and the restart confirmation.
    /// Defaults to `http://{host}:{port}`.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Bearer key for the stats and admin routes (unset = open)
    #[serde(default)]
    pub api_key: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_url: None,
            api_key: None,
        }
    }
}

impl ServerConfig {
    pub fn base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://{}:{}", self.host, self.port),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Remote chunk size in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,

    /// Timeout for one chunk fetch attempt
    #[serde(default = "default_chunk_timeout")]
    pub chunk_timeout_secs: u64,

    /// Chunks buffered ahead of a slow client
    #[serde(default = "default_prefetch_chunks")]
    pub prefetch_chunks: usize,
}

pub(crate) const MAX_CHUNK_SIZE: u64 = 1024 * 1024;

fn default_chunk_size() -> u64 {
    MAX_CHUNK_SIZE
}
fn default_chunk_timeout() -> u64 {
    30
}
fn default_prefetch_chunks() -> usize {
    2
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_timeout_secs: default_chunk_timeout(),
            prefetch_chunks: default_prefetch_chunks(),
        }
    }
}

impl StreamConfig {
    pub fn settings(&self) -> StreamSettings {
        StreamSettings {
            chunk_size: self.chunk_size,
            chunk_timeout: Duration::from_secs(self.chunk_timeout_secs),
            prefetch_chunks: self.prefetch_chunks,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot API base URL
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// One credential per bot token
    #[serde(default)]
    pub tokens: Vec<String>,

    /// Scratch chat used to read messages; also the default chat for
    /// numeric stream tokens
    #[serde(default)]
    pub bin_chat_id: i64,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            tokens: Vec::new(),
            bin_chat_id: 0,
        }
    }
}

impl TelegramConfig {
    pub fn bin_chat(&self) -> ChatId {
        ChatId(self.bin_chat_id)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RestartConfig {
    #[serde(default = "default_marker_path")]
    pub marker_path: PathBuf,

    #[serde(default)]
    pub upstream_repo: Option<String>,

    #[serde(default = "default_upstream_branch")]
    pub upstream_branch: String,
}

fn default_marker_path() -> PathBuf {
    PathBuf::from(".restartmsg")
}
fn default_upstream_branch() -> String {
    "main".to_string()
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            marker_path: default_marker_path(),
            upstream_repo: None,
            upstream_branch: default_upstream_branch(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// JSON catalog file; the watch route returns 404 without one
    #[serde(default)]
    pub path: Option<PathBuf>,
}
