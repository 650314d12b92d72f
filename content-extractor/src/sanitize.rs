use regex::Regex;
use std::sync::LazyLock;

static SURROUNDING_QUOTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)^['"](.+)['"]$"#).expect("valid quote pattern"));

const TRAILING_PUNCTUATION: &[char] = &[',', '.', ';', ':', '\'', '"', '!', '?'];

/// Strip one layer of surrounding quotes and one trailing punctuation mark.
pub fn clean_field(raw: &str) -> String {
    let unquoted = SURROUNDING_QUOTES.replace(raw, "$1");
    let mut chars = unquoted.chars();
    let stripped = match chars.next_back() {
        Some(last) if TRAILING_PUNCTUATION.contains(&last) => chars.as_str(),
        _ => unquoted.as_ref(),
    };
    stripped.trim().to_string()
}

/// Replace underscores and hyphens with spaces. Idempotent.
pub fn sanitize_text(text: &str) -> String {
    text.replace(['_', '-'], " ").trim().to_string()
}

/// Full post-processing applied to every extracted field.
pub fn finalize_field(raw: &str) -> String {
    sanitize_text(&clean_field(raw))
}
