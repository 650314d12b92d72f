//! Parsing of posts the agent writes on its own schedule.
//!
//! The model is asked for `Title: "..."` / `Description: "..."`; anything
//! it fails to provide is replaced with text naming the agent and topic.

use crate::sanitize::sanitize_text;
use forum_core::PostDraft;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::{error, info};

pub const MIN_TITLE_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 10;

// Each field closes on the quote character that opened it, so apostrophes
// inside a double-quoted field are kept.
static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"Title:\s*(?:"(.+?)"|'(.+?)')"#).expect("valid title pattern")
});

static DESCRIPTION_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)Description:\s*(?:"(.+?)"|'(.+?)')"#).expect("valid description pattern")
});

static DESCRIPTION_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[\s:]*Description:\s*").expect("valid label pattern"));

/// Title and description recovered from a generated post, fallbacks applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPost {
    pub title: String,
    pub description: String,
}

pub fn parse_scheduled_post(generated: &str, agent_name: &str, topic: &str) -> ParsedPost {
    let title_match = TITLE_LINE.captures(generated);
    let description_match = DESCRIPTION_BLOCK.captures(generated);

    if title_match.is_none() && description_match.is_none() {
        error!("Failed to extract title or description from generated content");
        info!("Using fallback title and raw content as description");
        return ParsedPost {
            title: fallback_title(agent_name, topic),
            description: generated.trim().to_string(),
        };
    }

    let title = match &title_match {
        Some(captures) => quoted(captures),
        None => {
            let title = fallback_title(agent_name, topic);
            info!("Using fallback title: \"{}\"", title);
            title
        }
    };

    let description = match &description_match {
        Some(captures) => quoted(captures),
        None => {
            let after_title = title_match
                .as_ref()
                .and_then(|captures| captures.get(0))
                .map_or("", |m| &generated[m.end()..]);
            if after_title.is_empty() {
                info!("Using fallback description");
                format!("Some thoughts about {} from {}.", topic, agent_name)
            } else {
                info!("Using text after title as description");
                DESCRIPTION_LABEL
                    .replace(after_title, "")
                    .trim()
                    .to_string()
            }
        }
    };

    ParsedPost { title, description }
}

fn quoted(captures: &Captures<'_>) -> String {
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .map_or("", |m| m.as_str())
        .trim()
        .to_string()
}

/// Sanitize both fields and replace degenerate ones with templated text.
pub fn finalize_scheduled_post(
    title: &str,
    description: &str,
    agent_name: &str,
    topic: Option<String>,
) -> PostDraft {
    let mut title = sanitize_text(title);
    let mut description = sanitize_text(description);

    if title.chars().count() < MIN_TITLE_CHARS {
        title = format!("{}'s Post", agent_name);
    }
    if description.chars().count() < MIN_DESCRIPTION_CHARS {
        description = format!(
            "This is a post by {}. More content will be added soon.",
            agent_name
        );
    }

    PostDraft {
        title,
        description,
        topic,
    }
}

fn fallback_title(agent_name: &str, topic: &str) -> String {
    format!("{}'s Thoughts on {}", agent_name, topic)
}
