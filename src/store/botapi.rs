//! Bot HTTP API client.
//!
//! Messages are read by forwarding them into the bin chat and deleting the
//! copy. File bytes come from `getFile` plus a ranged download of the
//! returned path; paths are memoized per file.

use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use reelgate_common::{ChatId, Error, MessageRef, Result};
use reelgate_fileid::{FileDescriptor, MediaAttachment, MediaKind, SourceMessage};
use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::StoreClient;

const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_PREALLOC: usize = 1024 * 1024;

/// One bot identity on the Bot HTTP API.
pub struct BotApiClient {
    client: Client,
    api_url: String,
    token: String,
    bin_chat: ChatId,
    file_paths: DashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    message_id: i64,
    document: Option<WireFile>,
    #[serde(default)]
    photo: Vec<WirePhotoSize>,
    video: Option<WireFile>,
    audio: Option<WireFile>,
    voice: Option<WireFile>,
    video_note: Option<WireFile>,
    sticker: Option<WireFile>,
    animation: Option<WireFile>,
}

#[derive(Debug, Deserialize)]
struct WireFile {
    file_id: String,
    file_unique_id: String,
    file_name: Option<String>,
    file_size: Option<u64>,
    mime_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePhotoSize {
    file_id: String,
    file_unique_id: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    file_size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireFilePath {
    file_path: Option<String>,
}

#[derive(Serialize)]
struct ForwardRequest {
    chat_id: i64,
    from_chat_id: i64,
    message_id: i64,
    disable_notification: bool,
}

impl From<WireFile> for MediaAttachment {
    fn from(f: WireFile) -> Self {
        Self {
            file_id: f.file_id,
            file_unique_id: f.file_unique_id,
            file_name: f.file_name,
            file_size: f.file_size,
            mime_type: f.mime_type,
        }
    }
}

impl WireMessage {
    fn into_source(self, reference: MessageRef) -> SourceMessage {
        let mut message = SourceMessage::new(reference);

        // Largest rendition of a photo is the one worth streaming.
        if let Some(photo) = self
            .photo
            .into_iter()
            .max_by_key(|p| (u64::from(p.width) * u64::from(p.height), p.file_size))
        {
            message = message.with_media(
                MediaKind::Photo,
                MediaAttachment {
                    file_id: photo.file_id,
                    file_unique_id: photo.file_unique_id,
                    file_name: None,
                    file_size: photo.file_size,
                    mime_type: Some("image/jpeg".to_string()),
                },
            );
        }

        let files = [
            (MediaKind::Document, self.document),
            (MediaKind::Video, self.video),
            (MediaKind::Audio, self.audio),
            (MediaKind::Voice, self.voice),
            (MediaKind::VideoNote, self.video_note),
            (MediaKind::Sticker, self.sticker),
            (MediaKind::Animation, self.animation),
        ];
        for (kind, file) in files {
            if let Some(file) = file {
                message = message.with_media(kind, file.into());
            }
        }
        message
    }
}

impl BotApiClient {
    /// `request_timeout` bounds every API call and file download.
    pub fn new(api_url: &str, token: &str, bin_chat: ChatId, request_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to build HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            bin_chat,
            file_paths: DashMap::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, path)
    }

    async fn call<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: &str,
        body: &B,
    ) -> Result<T> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::store(method, e.to_string()))?;

        let status = response.status();
        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::store(method, format!("invalid response ({status}): {e}")))?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(Error::store(
                method,
                parsed
                    .description
                    .unwrap_or_else(|| format!("request failed ({status})")),
            )),
        }
    }

    async fn file_path(&self, descriptor: &FileDescriptor) -> Result<String> {
        let key = descriptor
            .unique_id
            .clone()
            .unwrap_or_else(|| descriptor.reference.clone());
        if let Some(path) = self.file_paths.get(&key) {
            return Ok(path.value().clone());
        }

        let file: WireFilePath = self
            .call("getFile", &json!({ "file_id": descriptor.reference }))
            .await?;
        let path = file
            .file_path
            .ok_or_else(|| Error::store("getFile", "no file path returned"))?;
        self.file_paths.insert(key, path.clone());
        Ok(path)
    }
}

#[async_trait]
impl StoreClient for BotApiClient {
    async fn get_message(&self, message: MessageRef) -> Result<SourceMessage> {
        let forwarded: Result<WireMessage> = self
            .call(
                "forwardMessage",
                &ForwardRequest {
                    chat_id: self.bin_chat.0,
                    from_chat_id: message.chat_id.0,
                    message_id: message.message_id.0,
                    disable_notification: true,
                },
            )
            .await;

        let forwarded = match forwarded {
            Ok(m) => m,
            Err(Error::Store { message: text, .. }) if text.contains("not found") => {
                return Err(Error::not_found("message", message));
            }
            Err(e) => return Err(e),
        };

        let copy_id = forwarded.message_id;
        let deleted: Result<bool> = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": self.bin_chat.0, "message_id": copy_id }),
            )
            .await;
        if let Err(e) = deleted {
            tracing::warn!(message = copy_id, "Failed to delete forwarded copy: {}", e);
        }

        Ok(forwarded.into_source(message))
    }

    async fn fetch_chunk(
        &self,
        descriptor: &FileDescriptor,
        offset: u64,
        limit: u64,
    ) -> Result<Bytes> {
        if limit == 0 || offset % limit != 0 {
            return Err(Error::internal(format!(
                "unaligned chunk request: offset {offset}, limit {limit}"
            )));
        }

        let path = self.file_path(descriptor).await?;
        let mut response = self
            .client
            .get(self.file_url(&path))
            .header(RANGE, format!("bytes={}-{}", offset, offset + limit - 1))
            .send()
            .await
            .map_err(|e| Error::store("fetch_chunk", e.to_string()))?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::RANGE_NOT_SATISFIABLE => return Ok(Bytes::new()),
            StatusCode::OK if offset == 0 => {}
            StatusCode::OK => {
                return Err(Error::store(
                    "fetch_chunk",
                    "file server ignored range request",
                ));
            }
            status => {
                return Err(Error::store(
                    "fetch_chunk",
                    format!("download failed ({status})"),
                ));
            }
        }

        // A server that ignored the range sends the whole file; stop reading
        // once the chunk is complete.
        let limit = limit as usize;
        let mut body = BytesMut::with_capacity(limit.min(MAX_PREALLOC));
        while body.len() < limit {
            let Some(part) = response
                .chunk()
                .await
                .map_err(|e| Error::store("fetch_chunk", e.to_string()))?
            else {
                break;
            };
            let take = part.len().min(limit - body.len());
            body.extend_from_slice(&part[..take]);
        }
        Ok(body.freeze())
    }

    async fn edit_message_text(&self, message: MessageRef, text: &str) -> Result<()> {
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &json!({
                    "chat_id": message.chat_id.0,
                    "message_id": message.message_id.0,
                    "text": text,
                    "parse_mode": "HTML",
                }),
            )
            .await?;
        Ok(())
    }
}
