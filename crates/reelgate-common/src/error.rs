//! Unified error type for reelgate.
//!
//! Every failure the stream path can produce funnels into [`Error`], which
//! carries enough context for HTTP handlers to derive a status code via
//! [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in reelgate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A stored-file reference or stream token could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "message", "media", "document").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// The caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// No credential is registered in the pool.
    #[error("Credential pool exhausted: no credential registered")]
    PoolExhausted,

    /// The requested byte range cannot be served.
    #[error("Range not satisfiable: {reason}")]
    RangeNotSatisfiable {
        /// Why the range was rejected.
        reason: String,
        /// Total size of the resource, when known.
        size: Option<u64>,
    },

    /// A remote chunk fetch failed after its retry.
    #[error("Stream error at offset {offset}: {message}")]
    Stream {
        /// Aligned chunk offset that failed.
        offset: u64,
        /// Human-readable error description.
        message: String,
    },

    /// The remote store rejected or failed a non-streaming call.
    #[error("Remote store error [{operation}]: {message}")]
    Store {
        /// The remote operation that failed.
        operation: String,
        /// Human-readable error description.
        message: String,
    },

    /// Startup configuration is invalid.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::Decode(_) => 400,
            Error::NotFound { .. } => 404,
            Error::Unauthorized(_) => 401,
            Error::PoolExhausted => 503,
            Error::RangeNotSatisfiable { .. } => 416,
            Error::Stream { .. } => 502,
            Error::Store { .. } => 502,
            Error::Config(_) => 500,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Decode(_) => "decode_error",
            Error::NotFound { .. } => "not_found",
            Error::Unauthorized(_) => "unauthorized",
            Error::PoolExhausted => "pool_exhausted",
            Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Error::Stream { .. } => "stream_error",
            Error::Store { .. } => "store_error",
            Error::Config(_) => "config_error",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Whether repeating the same remote call may succeed.
    ///
    /// Remote store and transport failures are transient; lookups that
    /// found nothing and caller mistakes are not.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Store { .. } | Error::Io { .. })
    }

    /// Convenience constructor for [`Error::Decode`].
    pub fn decode(msg: impl Into<String>) -> Self {
        Error::Decode(msg.into())
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::RangeNotSatisfiable`].
    pub fn range(reason: impl Into<String>, size: Option<u64>) -> Self {
        Error::RangeNotSatisfiable {
            reason: reason.into(),
            size,
        }
    }

    /// Convenience constructor for [`Error::Stream`].
    pub fn stream(offset: u64, message: impl Into<String>) -> Self {
        Error::Stream {
            offset,
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Store`].
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Convenience constructor for [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

/// Result type alias using the unified Error type.
pub type Result<T> = std::result::Result<T, Error>;
