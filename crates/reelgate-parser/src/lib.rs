//! # reelgate-parser
//!
//! Text cleanup for stream labels.
//!
//! Stored filenames tend to carry uploader credits (`@Channel`,
//! `[Group]`) and release noise (`AAC`, `5.1`, `320kbps`). [`normalize`]
//! strips those through an ordered, inspectable rule table so the remaining
//! name is usable for display and for metadata matching.
//!
//! ```
//! use reelgate_parser::{format_size, normalize};
//!
//! assert_eq!(normalize("Movie.Name.2023.1080p_@GroupTag_x264"), "Movie.Name.2023.1080p x264");
//! assert_eq!(normalize("[@Uploads]"), "unknown_file");
//! assert_eq!(format_size(1_572_864), "1.50MB");
//! ```

pub mod rules;
pub mod size;

pub use rules::{default_rules, normalize, Normalizer, Rule, UNKNOWN_NAME};
pub use size::format_size;
