use crate::{GenerationRequest, ModelClass, TextGenerator};
use async_trait::async_trait;
use forum_core::{CoreError, LlmError, SettingsProvider};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub const LLM_PROVIDER: &str = "LLM_PROVIDER";
pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_BASE_URL: &str = "ANTHROPIC_BASE_URL";
pub const LLM_SMALL_MODEL: &str = "LLM_SMALL_MODEL";
pub const LLM_LARGE_MODEL: &str = "LLM_LARGE_MODEL";

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone)]
pub struct ModelNames {
    pub small: String,
    pub large: String,
}

impl ModelNames {
    fn pick(&self, class: ModelClass) -> &str {
        match class {
            ModelClass::Small => &self.small,
            ModelClass::Large => &self.large,
        }
    }
}

fn build_http_client() -> Result<Client, CoreError> {
    Ok(Client::builder().timeout(Duration::from_secs(120)).build()?)
}

async fn check_response(provider: &str, response: Response) -> Result<Response, CoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    error!("{} request failed with status {}", provider, status);
    let provider = provider.to_string();
    let error = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::InvalidApiKey { provider },
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(60);
            LlmError::RateLimitExceeded {
                provider,
                retry_after,
            }
        }
        s if s.is_server_error() => LlmError::ServiceUnavailable { provider },
        s => LlmError::RequestFailed {
            provider,
            status_code: s.as_u16(),
        },
    };
    Err(error.into())
}

fn map_send_error(provider: &str, e: reqwest::Error) -> CoreError {
    error!("Network error talking to {}: {}", provider, e);
    if e.is_timeout() {
        LlmError::RequestTimeout {
            provider: provider.to_string(),
        }
        .into()
    } else {
        CoreError::Network(e)
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat completions.
#[derive(Debug)]
pub struct OpenAiProvider {
    http_client: Client,
    api_key: String,
    base_url: String,
    models: ModelNames,
}

impl OpenAiProvider {
    pub fn new(api_key: String, base_url: String, models: ModelNames) -> Result<Self, CoreError> {
        Ok(Self {
            http_client: build_http_client()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAiProvider {
    async fn generate_text(&self, request: GenerationRequest) -> Result<String, CoreError> {
        let model = self.models.pick(request.model_class);
        let body = ChatCompletionRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.context,
            }],
            stop: &request.stop,
        };

        debug!("Requesting OpenAI completion with model {}", model);
        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error("openai", e))?;
        let response = check_response("openai", response).await?;

        let completion: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|_| LlmError::InvalidResponseFormat {
                    provider: "openai".to_string(),
                })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LlmError::InvalidResponseFormat {
                    provider: "openai".to_string(),
                }
                .into()
            })
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    stop_sequences: &'a [String],
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContent {
    #[serde(default)]
    text: String,
}

/// Anthropic messages API.
#[derive(Debug)]
pub struct ClaudeProvider {
    http_client: Client,
    api_key: String,
    base_url: String,
    models: ModelNames,
}

impl ClaudeProvider {
    pub fn new(api_key: String, base_url: String, models: ModelNames) -> Result<Self, CoreError> {
        Ok(Self {
            http_client: build_http_client()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
        })
    }
}

#[async_trait]
impl TextGenerator for ClaudeProvider {
    async fn generate_text(&self, request: GenerationRequest) -> Result<String, CoreError> {
        let model = self.models.pick(request.model_class);
        let body = ClaudeRequest {
            model,
            max_tokens: MAX_TOKENS,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.context,
            }],
            stop_sequences: &request.stop,
        };

        debug!("Requesting Claude completion with model {}", model);
        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error("anthropic", e))?;
        let response = check_response("anthropic", response).await?;

        let message: ClaudeResponse =
            response
                .json()
                .await
                .map_err(|_| LlmError::InvalidResponseFormat {
                    provider: "anthropic".to_string(),
                })?;

        message
            .content
            .into_iter()
            .next()
            .map(|content| content.text)
            .ok_or_else(|| {
                LlmError::InvalidResponseFormat {
                    provider: "anthropic".to_string(),
                }
                .into()
            })
    }
}

/// Stands in when no provider is configured; every call fails with
/// [`LlmError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate_text(&self, _request: GenerationRequest) -> Result<String, CoreError> {
        Err(LlmError::NotConfigured.into())
    }
}

/// Build the provider named by `LLM_PROVIDER`, or the first one with an API key.
pub fn provider_from_settings(
    settings: &dyn SettingsProvider,
) -> Result<Arc<dyn TextGenerator>, CoreError> {
    let provider = settings.get(LLM_PROVIDER).or_else(|| {
        if settings.get(OPENAI_API_KEY).is_some() {
            Some("openai".to_string())
        } else if settings.get(ANTHROPIC_API_KEY).is_some() {
            Some("anthropic".to_string())
        } else {
            None
        }
    });

    match provider.as_deref() {
        Some("openai") => {
            let api_key = settings.get(OPENAI_API_KEY).ok_or(LlmError::InvalidApiKey {
                provider: "openai".to_string(),
            })?;
            let models = ModelNames {
                small: settings
                    .get(LLM_SMALL_MODEL)
                    .unwrap_or_else(|| "gpt-4o-mini".to_string()),
                large: settings
                    .get(LLM_LARGE_MODEL)
                    .unwrap_or_else(|| "gpt-4o".to_string()),
            };
            let base_url = settings
                .get(OPENAI_BASE_URL)
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
            info!("Using OpenAI-compatible provider at {}", base_url);
            Ok(Arc::new(OpenAiProvider::new(api_key, base_url, models)?))
        }
        Some("anthropic") => {
            let api_key = settings
                .get(ANTHROPIC_API_KEY)
                .ok_or(LlmError::InvalidApiKey {
                    provider: "anthropic".to_string(),
                })?;
            let models = ModelNames {
                small: settings
                    .get(LLM_SMALL_MODEL)
                    .unwrap_or_else(|| "claude-3-5-haiku-latest".to_string()),
                large: settings
                    .get(LLM_LARGE_MODEL)
                    .unwrap_or_else(|| "claude-3-5-sonnet-latest".to_string()),
            };
            let base_url = settings
                .get(ANTHROPIC_BASE_URL)
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string());
            info!("Using Anthropic provider at {}", base_url);
            Ok(Arc::new(ClaudeProvider::new(api_key, base_url, models)?))
        }
        _ => Err(LlmError::NotConfigured.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forum_core::MapSettings;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn models() -> ModelNames {
        ModelNames {
            small: "small-model".to_string(),
            large: "large-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_openai_completion() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "small-model",
                "stop": ["---"]
            })))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Title: \"Hi\""}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let provider = OpenAiProvider::new("sk-test".to_string(), server.url(), models()).unwrap();
        let text = provider
            .generate_text(GenerationRequest::small("prompt").with_stop(&["---"]))
            .await
            .unwrap();

        assert_eq!(text, "Title: \"Hi\"");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_openai_rate_limit() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("retry-after", "12")
            .create_async()
            .await;

        let provider = OpenAiProvider::new("sk-test".to_string(), server.url(), models()).unwrap();
        let result = provider.generate_text(GenerationRequest::small("prompt")).await;
        assert!(matches!(
            result,
            Err(CoreError::Llm(LlmError::RateLimitExceeded { retry_after: 12, .. }))
        ));
    }

    #[tokio::test]
    async fn test_claude_completion() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "claude-key")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"{\"title\":\"T\"}"}]}"#)
            .expect(1)
            .create_async()
            .await;

        let provider =
            ClaudeProvider::new("claude-key".to_string(), server.url(), models()).unwrap();
        let text = provider
            .generate_text(GenerationRequest::small("prompt"))
            .await
            .unwrap();

        assert_eq!(text, r#"{"title":"T"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_claude_bad_key() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .create_async()
            .await;

        let provider =
            ClaudeProvider::new("claude-key".to_string(), server.url(), models()).unwrap();
        let result = provider.generate_text(GenerationRequest::small("prompt")).await;
        assert!(matches!(
            result,
            Err(CoreError::Llm(LlmError::InvalidApiKey { .. }))
        ));
    }

    #[test]
    fn test_provider_selection() {
        let settings = MapSettings::new();
        assert!(matches!(
            provider_from_settings(&settings),
            Err(CoreError::Llm(LlmError::NotConfigured))
        ));

        let settings = MapSettings::new().with(ANTHROPIC_API_KEY, "key");
        assert!(provider_from_settings(&settings).is_ok());

        let settings = MapSettings::new().with(LLM_PROVIDER, "openai");
        assert!(matches!(
            provider_from_settings(&settings),
            Err(CoreError::Llm(LlmError::InvalidApiKey { .. }))
        ));
    }

    #[tokio::test]
    async fn test_unconfigured_generator_always_fails() {
        let result = UnconfiguredGenerator
            .generate_text(GenerationRequest::small("prompt"))
            .await;
        assert!(matches!(result, Err(CoreError::Llm(LlmError::NotConfigured))));
    }
}
