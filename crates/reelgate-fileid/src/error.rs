//! Error types for reelgate-fileid.

use thiserror::Error;

/// Result type for reelgate-fileid operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for reelgate-fileid operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The reference is not valid URL-safe base64.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// A zero byte at the end of the payload has no run length.
    #[error("Invalid run-length encoding: dangling zero marker")]
    InvalidRle,

    /// A field extends past the end of the payload.
    #[error("Truncated reference: {field} needs {need} bytes, have {have}")]
    Truncated {
        field: &'static str,
        need: usize,
        have: usize,
    },

    /// The type discriminant is not a known file type.
    #[error("Unknown file type: {0}")]
    UnknownFileType(u32),

    /// The photo thumbnail source discriminant is not known.
    #[error("Unknown thumbnail source: {0}")]
    UnknownThumbnailSource(i32),

    /// Bytes remain after the last field of the layout.
    #[error("Trailing bytes after reference: {0}")]
    TrailingBytes(usize),

    /// A location cannot be expressed in the requested version layout.
    #[error("Cannot encode location: {0}")]
    Unencodable(String),

    /// The message carries none of the accepted media kinds.
    #[error("No supported media in message {0}")]
    NoMedia(String),
}

impl Error {
    pub(crate) fn truncated(field: &'static str, need: usize, have: usize) -> Self {
        Self::Truncated { field, need, have }
    }
}

impl From<Error> for reelgate_common::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::NoMedia(message) => reelgate_common::Error::not_found("media", message),
            other => reelgate_common::Error::decode(other.to_string()),
        }
    }
}
