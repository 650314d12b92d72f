pub mod providers;
pub mod template;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use async_trait::async_trait;
use forum_core::CoreError;

pub use providers::{
    provider_from_settings, ClaudeProvider, ModelNames, OpenAiProvider, UnconfiguredGenerator,
};
pub use template::{compose_context, TemplateState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelClass {
    Small,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub context: String,
    pub model_class: ModelClass,
    pub stop: Vec<String>,
}

impl GenerationRequest {
    pub fn small(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            model_class: ModelClass::Small,
            stop: Vec::new(),
        }
    }

    pub fn with_stop(mut self, stop: &[&str]) -> Self {
        self.stop = stop.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// The agent's text-generation collaborator.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, request: GenerationRequest) -> Result<String, CoreError>;
}
