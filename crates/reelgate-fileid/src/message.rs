//! The originating message and its media attachments.

use std::collections::HashMap;

use reelgate_common::MessageRef;

use crate::{Error, Result};

/// Payload kinds accepted as streamable media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Document,
    Photo,
    Video,
    Audio,
    Voice,
    VideoNote,
    Sticker,
    Animation,
}

impl MediaKind {
    /// Lookup order used by [`resolve_media_kind`]; the first present kind wins.
    pub const PRIORITY: [MediaKind; 8] = [
        MediaKind::Document,
        MediaKind::Photo,
        MediaKind::Video,
        MediaKind::Audio,
        MediaKind::Voice,
        MediaKind::VideoNote,
        MediaKind::Sticker,
        MediaKind::Animation,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Document => "document",
            MediaKind::Photo => "photo",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Voice => "voice",
            MediaKind::VideoNote => "video_note",
            MediaKind::Sticker => "sticker",
            MediaKind::Animation => "animation",
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One media payload as declared by the message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaAttachment {
    /// Opaque stored-file reference.
    pub file_id: String,
    /// Stable content id, identical across re-uploads of the same bytes.
    pub file_unique_id: String,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
}

/// A message fetched from the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceMessage {
    pub reference: MessageRef,
    /// Deleted or inaccessible messages come back empty.
    pub empty: bool,
    media: HashMap<MediaKind, MediaAttachment>,
}

impl SourceMessage {
    pub fn new(reference: MessageRef) -> Self {
        Self {
            reference,
            empty: false,
            media: HashMap::new(),
        }
    }

    pub fn empty(reference: MessageRef) -> Self {
        Self {
            empty: true,
            ..Self::new(reference)
        }
    }

    pub fn with_media(mut self, kind: MediaKind, attachment: MediaAttachment) -> Self {
        self.media.insert(kind, attachment);
        self
    }

    pub fn media(&self, kind: MediaKind) -> Option<&MediaAttachment> {
        self.media.get(&kind)
    }
}

/// Pick the first accepted media payload in [`MediaKind::PRIORITY`] order.
pub fn resolve_media_kind(message: &SourceMessage) -> Result<(MediaKind, &MediaAttachment)> {
    if message.empty {
        return Err(Error::NoMedia(format!("{} (empty message)", message.reference)));
    }
    MediaKind::PRIORITY
        .iter()
        .find_map(|&kind| message.media(kind).map(|attachment| (kind, attachment)))
        .ok_or_else(|| Error::NoMedia(message.reference.to_string()))
}
