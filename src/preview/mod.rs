//! Preview generation and table parsing.
//!
//! `parser` and `filter` are pure transforms. `session` owns the state of
//! the two preview views and re-runs the transforms when options change.

pub mod filter;
pub mod parser;
mod session;

pub use filter::{filter_comments, is_comment, split_lines};
pub use parser::{parse, split_fields, PreviewTable};
pub use session::{AnalyzePreview, UploadPreview};

/// Cell value for missing or too-short fields
pub const SENTINEL: &str = "N/A";

/// Lines kept in a locally generated preview
pub const PREVIEW_LINE_LIMIT: usize = 20;

/// Bytes read from the head of a local file for its preview
pub const PREVIEW_READ_BYTES: u64 = 8192;
