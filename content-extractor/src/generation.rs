//! Generative fallback for fields the text cascade could not recover.

use llm_interface::{compose_context, TemplateState};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

const FILL_FIELDS_TEMPLATE: &str = r#"
# INSTRUCTIONS
You're helping to create a forum post based on a user request: "{{userRequest}}"
{{titleInstruction}}
{{descriptionInstruction}}

# OUTPUT FORMAT
Respond with JSON in this format:
{
  "title": "The generated forum post title",
  "description": "The generated forum post description"
}

# CONSTRAINTS
- Keep titles concise (under 100 characters)
- Make descriptions thoughtful but concise
- Stay on topic related to the user request
- Never include quotation marks around the entire response
- Never include markdown formatting
"#;

const DEFAULT_REQUEST: &str = "Create a forum post";

static LOOSE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)title[":]*\s*["']?([^"'\n]+)["']?"#).expect("valid title pattern")
});

static LOOSE_DESCRIPTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)description[":]*\s*["']?([^"'\n]{20,})["']?"#)
        .expect("valid description pattern")
});

#[derive(Debug, Default, Deserialize)]
struct GeneratedFields {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

/// Fields recovered from a generation response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedPost {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Prompt asking for the missing fields as strict JSON. Fields already known
/// are passed along so the model reuses them.
pub fn fill_fields_prompt(
    request_text: &str,
    known_title: Option<&str>,
    known_description: Option<&str>,
) -> String {
    let request = if request_text.trim().is_empty() {
        DEFAULT_REQUEST
    } else {
        request_text
    };

    let title_instruction = match known_title {
        Some(title) => format!("Use the existing title: \"{}\"", title),
        None => "Create a brief, engaging title for this forum post.".to_string(),
    };
    let description_instruction = match known_description {
        Some(_) => "Use the existing description.".to_string(),
        None => "Create a thoughtful, informative forum post description (2-3 paragraphs)."
            .to_string(),
    };

    let mut state = TemplateState::new();
    state.insert("userRequest".to_string(), request.to_string());
    state.insert("titleInstruction".to_string(), title_instruction);
    state.insert("descriptionInstruction".to_string(), description_instruction);
    compose_context(FILL_FIELDS_TEMPLATE, &state)
}

/// Parse a generation response: JSON first, then loose key patterns.
pub fn parse_generated(response: &str) -> GeneratedPost {
    let json = extract_json_object(response);
    if let Ok(fields) = serde_json::from_str::<GeneratedFields>(json) {
        return GeneratedPost {
            title: non_empty(fields.title),
            description: non_empty(fields.description),
        };
    }

    GeneratedPost {
        title: LOOSE_TITLE
            .captures(response)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty()),
        description: LOOSE_DESCRIPTION
            .captures(response)
            .map(|c| c[1].trim().to_string())
            .filter(|d| !d.is_empty()),
    }
}

/// Unwrap a fenced code block, or cut to the outermost braces.
fn extract_json_object(response: &str) -> &str {
    let trimmed = response.trim();

    if trimmed.starts_with("```") {
        if let (Some(start), Some(end)) = (trimmed.find('\n'), trimmed.rfind("```")) {
            if start < end {
                return trimmed[start + 1..end].trim();
            }
        }
    }

    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_adapts_to_known_fields() {
        let prompt = fill_fields_prompt("post about tides", Some("Moon Pull"), None);
        assert!(prompt.contains("\"post about tides\""));
        assert!(prompt.contains("Use the existing title: \"Moon Pull\""));
        assert!(prompt.contains("Create a thoughtful, informative forum post description"));

        let prompt = fill_fields_prompt("  ", None, Some("body"));
        assert!(prompt.contains("\"Create a forum post\""));
        assert!(prompt.contains("Create a brief, engaging title"));
        assert!(prompt.contains("Use the existing description."));
    }

    #[test]
    fn test_parse_plain_and_fenced_json() {
        let parsed = parse_generated(r#"{"title": "Tides", "description": "The moon pulls."}"#);
        assert_eq!(parsed.title.as_deref(), Some("Tides"));
        assert_eq!(parsed.description.as_deref(), Some("The moon pulls."));

        let parsed = parse_generated("```json\n{\"title\": \"Fenced\"}\n```");
        assert_eq!(parsed.title.as_deref(), Some("Fenced"));
        assert_eq!(parsed.description, None);
    }

    #[test]
    fn test_parse_falls_back_to_loose_patterns() {
        let response = "title: Ocean Rhythms\ndescription: The tides follow the moon every single day";
        let parsed = parse_generated(response);
        assert_eq!(parsed.title.as_deref(), Some("Ocean Rhythms"));
        assert_eq!(
            parsed.description.as_deref(),
            Some("The tides follow the moon every single day")
        );
    }

    #[test]
    fn test_short_loose_description_is_ignored() {
        let parsed = parse_generated("title: X\ndescription: too short");
        assert_eq!(parsed.title.as_deref(), Some("X"));
        assert_eq!(parsed.description, None);
    }
}
