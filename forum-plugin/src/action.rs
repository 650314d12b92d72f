use crate::examples::{create_forum_post_examples, ActionExample};
use async_trait::async_trait;
use background_service::AgentRuntime;
use content_extractor::ContentExtractor;
use forum_client::{ForumClient, TokenStore};
use forum_core::{
    CoreError, ErrorExt, ForumConfig, Message, PostOptions, PostRecord, ValidationError,
    FORUM_CREATE_POST,
};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};

/// What an action reports back to the requester.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

/// Invoked exactly once per handler run.
pub type ActionCallback = Box<dyn FnOnce(ActionResponse) + Send>;

/// An agent action the runtime can route messages to.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;
    fn similes(&self) -> &'static [&'static str];
    fn description(&self) -> &'static str;
    fn examples(&self) -> Vec<Vec<ActionExample>>;

    /// Whether the action may run at all.
    async fn validate(&self, runtime: &AgentRuntime) -> bool;

    async fn handler(
        &self,
        runtime: &AgentRuntime,
        message: &Message,
        options: Option<&PostOptions>,
        callback: ActionCallback,
    ) -> bool;
}

/// Publishes a user-requested post.
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateForumPostAction;

impl CreateForumPostAction {
    async fn submit(
        &self,
        runtime: &AgentRuntime,
        title: &str,
        description: &str,
    ) -> Result<PostRecord, CoreError> {
        let settings = runtime.settings.as_ref();
        let config = ForumConfig::load(settings)?;
        let client = ForumClient::from_config(&config)?
            .with_token_store(TokenStore::from_settings(settings))
            .with_settings(runtime.settings.clone());

        info!("Checking forum access token...");
        if !client.refresh_token_if_needed().await {
            warn!("Token refresh check failed, continuing with current token");
        }

        client.create_post(title.trim(), description.trim()).await
    }
}

#[async_trait]
impl Action for CreateForumPostAction {
    fn name(&self) -> &'static str {
        FORUM_CREATE_POST
    }

    fn similes(&self) -> &'static [&'static str] {
        &["POST_ON_FORUM", "CREATE_FORUM_POST", "PUBLISH_TO_FORUM"]
    }

    fn description(&self) -> &'static str {
        "Creates a post on the forum with the specified title and description."
    }

    fn examples(&self) -> Vec<Vec<ActionExample>> {
        create_forum_post_examples()
    }

    async fn validate(&self, runtime: &AgentRuntime) -> bool {
        match ForumConfig::load(runtime.settings.as_ref()) {
            Ok(_) => true,
            Err(e) => {
                error!("Forum plugin validation failed: {}", e);
                false
            }
        }
    }

    async fn handler(
        &self,
        runtime: &AgentRuntime,
        message: &Message,
        options: Option<&PostOptions>,
        callback: ActionCallback,
    ) -> bool {
        let extractor = ContentExtractor::new(runtime.generator.clone());
        let extracted = extractor.extract(message, options).await;

        info!(
            "Final values being posted to forum (title from {}, description from {})",
            extracted.title_source, extracted.description_source
        );
        info!("- Title: \"{}\"", extracted.title);

        let invalid = if extracted.title.trim().is_empty() {
            Some(ValidationError::InvalidTitle)
        } else if extracted.description.trim().is_empty() {
            Some(ValidationError::InvalidDescription)
        } else {
            None
        };
        if let Some(invalid) = invalid {
            invalid.log_error();
            callback(ActionResponse {
                text: format!(
                    "Error creating forum post: {}",
                    invalid.user_friendly_message()
                ),
                content: None,
            });
            return false;
        }

        match self
            .submit(runtime, &extracted.title, &extracted.description)
            .await
        {
            Ok(record) => {
                info!("Successfully created forum post: {}", record.id);
                callback(ActionResponse {
                    text: format!(
                        "Forum post created successfully! Title: \"{}\". You can view it on the forum.",
                        extracted.title
                    ),
                    content: Some(json!({
                        "postId": record.id,
                        "title": record.title,
                        "description": record.description,
                        "userName": record.user_name,
                        "createdAt": record.created_at,
                    })),
                });
                true
            }
            Err(e) => {
                e.log_error();
                let message = e.to_string();
                callback(ActionResponse {
                    text: format!("Error creating forum post: {}", message),
                    content: Some(json!({ "error": message })),
                });
                false
            }
        }
    }
}
