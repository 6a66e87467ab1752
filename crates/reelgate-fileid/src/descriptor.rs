//! Immutable descriptors built from a reference and its originating message.

use crate::message::{resolve_media_kind, MediaKind, SourceMessage};
use crate::{FileLocation, Result};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Decoded location plus the metadata declared by the originating message.
///
/// Produced by [`decode`] (location only) and [`enrich`] (location plus
/// metadata). Never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// The raw reference this descriptor was decoded from.
    pub reference: String,
    pub location: FileLocation,
    pub media_kind: Option<MediaKind>,
    pub unique_id: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<u64>,
    pub mime_type: Option<String>,
}

impl FileDescriptor {
    /// Declared size; zero is treated as unknown.
    pub fn size(&self) -> Option<u64> {
        self.file_size.filter(|&s| s > 0)
    }

    pub fn mime_type(&self) -> &str {
        self.mime_type
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_MIME_TYPE)
    }

    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or("")
    }
}

/// Decode a raw reference into a descriptor with no declared metadata.
pub fn decode(raw_reference: &str) -> Result<FileDescriptor> {
    Ok(FileDescriptor {
        reference: raw_reference.to_string(),
        location: FileLocation::decode(raw_reference)?,
        media_kind: None,
        unique_id: None,
        file_name: None,
        file_size: None,
        mime_type: None,
    })
}

/// Overlay the message's declared name, size, MIME type and unique id.
///
/// The decoded location is carried over untouched; the inputs are not
/// modified.
pub fn enrich(descriptor: &FileDescriptor, message: &SourceMessage) -> Result<FileDescriptor> {
    let (kind, media) = resolve_media_kind(message)?;
    Ok(FileDescriptor {
        reference: descriptor.reference.clone(),
        location: descriptor.location.clone(),
        media_kind: Some(kind),
        unique_id: Some(media.file_unique_id.clone()),
        file_name: media.file_name.clone(),
        file_size: media.file_size,
        mime_type: media.mime_type.clone(),
    })
}

/// Resolve the message's media, decode its reference and enrich the result.
pub fn resolve(message: &SourceMessage) -> Result<FileDescriptor> {
    let (_, media) = resolve_media_kind(message)?;
    let decoded = decode(&media.file_id)?;
    enrich(&decoded, message)
}
