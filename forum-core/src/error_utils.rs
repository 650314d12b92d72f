use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn is_retryable(&self) -> bool;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for CoreError {
    fn log_error(&self) -> &Self {
        error!("CoreError: {}", self);
        match self {
            CoreError::ForumApi(e) => {
                error!("Forum API error details: {:?}", e);
            }
            CoreError::Llm(e) => {
                error!("LLM error details: {:?}", e);
            }
            CoreError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            CoreError::Persistence(e) => {
                error!("Persistence error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("CoreError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            CoreError::ForumApi(e) => e.is_retryable(),
            CoreError::Llm(e) => e.is_retryable(),
            CoreError::Network(_) => true,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            CoreError::ForumApi(e) => e.user_friendly_message(),
            CoreError::Llm(e) => e.user_friendly_message(),
            CoreError::Config(e) => e.user_friendly_message(),
            CoreError::Validation(e) => e.user_friendly_message(),
            CoreError::Persistence(_) => {
                "Forum tokens could not be saved. The current session will keep working."
                    .to_string()
            }
            CoreError::Network(_) => {
                "Network connection error. Please check your internet connection.".to_string()
            }
            CoreError::InvalidInput { .. } => {
                "Invalid input provided. Please check your input and try again.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            CoreError::ForumApi(_) => "FORUM_API".to_string(),
            CoreError::Llm(_) => "LLM".to_string(),
            CoreError::Config(_) => "CONFIG".to_string(),
            CoreError::Persistence(_) => "PERSISTENCE".to_string(),
            CoreError::Validation(_) => "VALIDATION".to_string(),
            CoreError::Io(_) => "IO".to_string(),
            CoreError::Serialization(_) => "SERIALIZATION".to_string(),
            CoreError::Network(_) => "NETWORK".to_string(),
            CoreError::InvalidInput { .. } => "INVALID_INPUT".to_string(),
            CoreError::Internal { .. } => "INTERNAL".to_string(),
        }
    }
}

impl ErrorExt for ForumApiError {
    fn log_error(&self) -> &Self {
        error!("ForumApiError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ForumApiError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        match self {
            ForumApiError::RequestTimeout => true,
            ForumApiError::ServerError { status_code } => *status_code >= 500,
            _ => false,
        }
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ForumApiError::AuthExpired | ForumApiError::Unauthorized { .. } => {
                "Forum authentication token is invalid. Please update the forum tokens."
                    .to_string()
            }
            ForumApiError::RefreshRejected => {
                "The forum refused to renew the access token.".to_string()
            }
            ForumApiError::EndpointNotFound { endpoint } => {
                format!("The forum endpoint {} does not exist.", endpoint)
            }
            ForumApiError::RequestFailed { status_code, .. } => {
                format!("The forum rejected the request (status {}).", status_code)
            }
            ForumApiError::RequestTimeout => {
                "Request to the forum timed out. Please try again.".to_string()
            }
            ForumApiError::ClientNotInitialized => {
                "The forum client has not been started.".to_string()
            }
            _ => "Forum API error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            ForumApiError::AuthExpired => "FORUM_AUTH_EXPIRED".to_string(),
            ForumApiError::Unauthorized { .. } => "FORUM_UNAUTHORIZED".to_string(),
            ForumApiError::EndpointNotFound { .. } => "FORUM_ENDPOINT_NOT_FOUND".to_string(),
            ForumApiError::RequestFailed { .. } => "FORUM_REQUEST_FAILED".to_string(),
            ForumApiError::ServerError { .. } => "FORUM_SERVER_ERROR".to_string(),
            ForumApiError::InvalidResponse { .. } => "FORUM_INVALID_RESPONSE".to_string(),
            ForumApiError::RefreshRejected => "FORUM_REFRESH_REJECTED".to_string(),
            ForumApiError::RequestTimeout => "FORUM_TIMEOUT".to_string(),
            ForumApiError::ClientNotInitialized => "FORUM_CLIENT_NOT_INITIALIZED".to_string(),
        }
    }
}

impl ErrorExt for LlmError {
    fn log_error(&self) -> &Self {
        error!("LlmError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("LlmError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::RateLimitExceeded { .. }
                | LlmError::ServiceUnavailable { .. }
                | LlmError::RequestTimeout { .. }
        )
    }

    fn user_friendly_message(&self) -> String {
        match self {
            LlmError::InvalidApiKey { provider } => format!(
                "Invalid API key for {}. Please update your credentials.",
                provider
            ),
            LlmError::RateLimitExceeded {
                provider,
                retry_after,
            } => format!(
                "Rate limit exceeded for {}. Please wait {} seconds.",
                provider, retry_after
            ),
            LlmError::ServiceUnavailable { provider } => format!(
                "{} service is temporarily unavailable. Please try again later.",
                provider
            ),
            LlmError::NotConfigured => {
                "No AI provider is configured for generating posts.".to_string()
            }
            _ => "AI service error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            LlmError::InvalidApiKey { .. } => "LLM_INVALID_API_KEY".to_string(),
            LlmError::RateLimitExceeded { .. } => "LLM_RATE_LIMIT".to_string(),
            LlmError::ServiceUnavailable { .. } => "LLM_SERVICE_UNAVAILABLE".to_string(),
            LlmError::RequestTimeout { .. } => "LLM_TIMEOUT".to_string(),
            LlmError::InvalidResponseFormat { .. } => "LLM_INVALID_RESPONSE".to_string(),
            LlmError::RequestFailed { .. } => "LLM_REQUEST_FAILED".to_string(),
            LlmError::NotConfigured => "LLM_NOT_CONFIGURED".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file {} not found.", path)
            }
            ConfigError::MissingField { field } => {
                format!("Required configuration field '{}' is missing.", field)
            }
            ConfigError::InvalidValue { field, .. } => {
                format!("Invalid value for configuration field '{}'.", field)
            }
            ConfigError::Parse(_) => {
                "Configuration file format is invalid. Please check the settings.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ValidationError {
    fn log_error(&self) -> &Self {
        error!("ValidationError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ValidationError (warning): {}", self);
        self
    }

    fn is_retryable(&self) -> bool {
        false
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ValidationError::InvalidTitle => {
                "Valid title is required. Please specify a title for your forum post."
                    .to_string()
            }
            ValidationError::InvalidDescription => {
                "Valid description is required. Please provide content for your forum post."
                    .to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ValidationError::InvalidTitle => "VALIDATION_INVALID_TITLE".to_string(),
            ValidationError::InvalidDescription => "VALIDATION_INVALID_DESCRIPTION".to_string(),
        }
    }
}

/// Logs an error together with its code and the message shown to users.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorReporter;

impl ErrorReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn report_error(&self, error: &CoreError) {
        error.log_error();
        info!("Error code: {}", error.error_code());
        info!("User message: {}", error.user_friendly_message());
    }
}
