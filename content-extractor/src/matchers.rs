//! Pattern matchers over an agent's free-text reply.
//!
//! Matchers are pure and tried in priority order; the first one that
//! produces anything wins.

use forum_core::ExtractionSource;
use regex::Regex;
use std::sync::LazyLock;

static DASH_JOINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i).*?[—\-–]\s*title\s*:\s*['"](.+?)['"][\s,]*description\s*:\s*['"](.+?)['"]"#)
        .expect("valid dash pattern")
});

static STANDARD_JOINED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)title\s*:\s*['"](.+?)['"][\s,]*description\s*:\s*['"](.+?)['"]"#)
        .expect("valid standard pattern")
});

static TITLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)title[:\s]+['"](.+?)['"]"#).expect("valid title pattern"));

static TITLE_BARE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)title[:\s]+([^,'"\n]+)"#).expect("valid title pattern"));

static DESCRIPTION_QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)description[:\s]+['"](.+?)['"]"#).expect("valid description pattern")
});

static DESCRIPTION_BARE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)description[:\s]+([^,'"\n]+)"#).expect("valid description pattern")
});

/// Raw (uncleaned) fields recovered from text, each tagged with its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMatch {
    pub title: Option<(String, ExtractionSource)>,
    pub description: Option<(String, ExtractionSource)>,
}

impl TextMatch {
    fn joined(title: &str, description: &str, source: ExtractionSource) -> Self {
        Self {
            title: Some((title.trim().to_string(), source)),
            description: Some((description.trim().to_string(), source)),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.description.is_some()
    }
}

pub type Matcher = fn(&str) -> Option<TextMatch>;

/// Matchers in priority order.
pub const TEXT_MATCHERS: &[Matcher] = &[match_dash_joined, match_standard_joined, match_fields];

/// Run the matcher cascade; the first matcher that yields anything wins.
pub fn match_text(text: &str) -> Option<TextMatch> {
    TEXT_MATCHERS.iter().find_map(|matcher| matcher(text))
}

/// `... — title: '...', description: '...'`
pub fn match_dash_joined(text: &str) -> Option<TextMatch> {
    let captures = DASH_JOINED.captures(text)?;
    Some(TextMatch::joined(
        &captures[1],
        &captures[2],
        ExtractionSource::DashJoined,
    ))
}

/// `title: '...', description: '...'`
pub fn match_standard_joined(text: &str) -> Option<TextMatch> {
    let captures = STANDARD_JOINED.captures(text)?;
    Some(TextMatch::joined(
        &captures[1],
        &captures[2],
        ExtractionSource::StandardJoined,
    ))
}

/// `title` and `description` matched independently, quoted or bare.
pub fn match_fields(text: &str) -> Option<TextMatch> {
    let title = first_capture(text, &[&TITLE_QUOTED, &TITLE_BARE])
        .map(|t| (t, ExtractionSource::TitleField));
    let description = first_capture(text, &[&DESCRIPTION_QUOTED, &DESCRIPTION_BARE])
        .map(|d| (d, ExtractionSource::DescriptionField));

    if title.is_none() && description.is_none() {
        return None;
    }
    Some(TextMatch { title, description })
}

fn first_capture(text: &str, patterns: &[&Regex]) -> Option<String> {
    patterns
        .iter()
        .find_map(|re| re.captures(text))
        .map(|captures| captures[1].trim().to_string())
        .filter(|value| !value.is_empty())
}
