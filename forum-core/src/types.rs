use serde::{Deserialize, Serialize};
use std::fmt;

/// Action name carried by messages that request a forum post.
pub const FORUM_CREATE_POST: &str = "FORUM_CREATE_POST";

/// Forum credentials. Both fields are always replaced together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }
}

/// Title/description pair attached to an action or passed by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl PostOptions {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            description: Some(description.into()),
            topic: None,
        }
    }
}

/// A post ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub title: String,
    pub description: String,
    pub topic: Option<String>,
}

/// Where an extracted field came from. Used for diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    ActionPayload,
    CallerOptions,
    DashJoined,
    StandardJoined,
    TitleField,
    DescriptionField,
    Generated,
    Default,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExtractionSource::ActionPayload => "message action options",
            ExtractionSource::CallerOptions => "caller options",
            ExtractionSource::DashJoined => "message text dash format",
            ExtractionSource::StandardJoined => "message text standard format",
            ExtractionSource::TitleField => "message text title match",
            ExtractionSource::DescriptionField => "message text description match",
            ExtractionSource::Generated => "generated",
            ExtractionSource::Default => "default",
        };
        f.write_str(name)
    }
}

/// Extractor output: cleaned fields plus the source of each one.
///
/// Fields may still be empty after cleanup; the caller validates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    pub title: String,
    pub description: String,
    pub topic: Option<String>,
    pub title_source: ExtractionSource,
    pub description_source: ExtractionSource,
}

/// Post as returned by the forum after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<PostOptions>,
}

/// An inbound message routed to an action by the agent runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: MessageContent,
}

impl Message {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: MessageContent {
                text: text.into(),
                ..Default::default()
            },
        }
    }

    /// Options attached to an explicit `FORUM_CREATE_POST` action, if any.
    pub fn action_options(&self) -> Option<&PostOptions> {
        match self.content.action.as_deref() {
            Some(FORUM_CREATE_POST) => self.content.options.as_ref(),
            _ => None,
        }
    }
}
