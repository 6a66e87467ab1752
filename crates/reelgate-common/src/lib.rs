//! Reelgate-Common: shared types used across the reelgate crates.
//!
//! - **Errors**: the unified [`Error`] taxonomy and its HTTP status mapping
//! - **Typed IDs**: chat, message and stream session identifiers
//!
//! # Examples
//!
//! ```
//! use reelgate_common::{ChatId, Error, MessageId, MessageRef, Result};
//!
//! let msg = MessageRef::new(ChatId(-100123), MessageId(42));
//! assert_eq!(msg.to_string(), "-100123/42");
//!
//! let lookup = || -> Result<()> { Err(Error::not_found("message", msg)) };
//! assert_eq!(lookup().unwrap_err().http_status(), 404);
//! ```

pub mod error;
pub mod ids;

pub use error::{Error, Result};
pub use ids::*;
