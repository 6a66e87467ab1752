//! Reelgate-FileId: stored-file reference decoding.
//!
//! A file stored in the remote chat store is addressed by an opaque,
//! versioned reference string. This crate turns such a reference into a
//! structured [`FileDescriptor`] without touching the network.
//!
//! # Modules
//!
//! - `codec` - base64url + zero run-length transport encoding, little-endian
//!   field reader/writer, TL byte strings
//! - `location` - the decoded binary location ([`FileLocation`])
//! - `message` - the originating message and its media attachments
//! - `descriptor` - [`FileDescriptor`], [`decode`], [`enrich`], [`resolve`]
//!
//! # Example
//!
//! ```
//! use reelgate_fileid::{decode, FileLocation, FileType, LocationKind};
//!
//! let location = FileLocation::document(FileType::Video, 4, 1234, -99);
//! let reference = location.encode().unwrap();
//!
//! let descriptor = decode(&reference).unwrap();
//! assert_eq!(descriptor.location.dc_id, 4);
//! assert!(matches!(descriptor.location.kind, LocationKind::Document { media_id: 1234, .. }));
//! ```

pub mod codec;
pub mod descriptor;
pub mod error;
pub mod location;
pub mod message;

pub use descriptor::{decode, enrich, resolve, FileDescriptor};
pub use error::{Error, Result};
pub use location::{FileLocation, FileType, LocationKind, ThumbnailSource};
pub use message::{resolve_media_kind, MediaAttachment, MediaKind, SourceMessage};
