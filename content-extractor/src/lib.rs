//! Recovers forum post fields from free-form agent output.

pub mod extractor;
pub mod generation;
pub mod matchers;
pub mod sanitize;
pub mod scheduled;

pub use extractor::{ContentExtractor, DEFAULT_DESCRIPTION, DEFAULT_TITLE};
pub use matchers::{match_text, TextMatch};
pub use sanitize::{clean_field, finalize_field, sanitize_text};
pub use scheduled::{finalize_scheduled_post, parse_scheduled_post, ParsedPost};
