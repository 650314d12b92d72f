use crate::generation::{fill_fields_prompt, parse_generated};
use crate::matchers::match_text;
use crate::sanitize::finalize_field;
use forum_core::{ExtractionResult, ExtractionSource, Message, PostOptions};
use llm_interface::{GenerationRequest, TextGenerator};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const DEFAULT_TITLE: &str = "Forum Post";
pub const DEFAULT_DESCRIPTION: &str = "This is a forum post.";

/// A field value together with where it came from.
type Sourced = Option<(String, ExtractionSource)>;

/// Recovers a title/description pair from a message.
///
/// Sources are consulted in priority order and each one only fills the
/// fields still missing: action payload, caller options, the text matcher
/// cascade, generation, then literal defaults.
#[derive(Clone, Default)]
pub struct ContentExtractor {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl ContentExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator: Some(generator),
        }
    }

    /// An extractor that never calls a model; missing fields get defaults.
    pub fn offline() -> Self {
        Self { generator: None }
    }

    pub async fn extract(
        &self,
        message: &Message,
        options: Option<&PostOptions>,
    ) -> ExtractionResult {
        let mut title: Sourced = None;
        let mut description: Sourced = None;

        if let Some(payload) = message.action_options() {
            info!("Found forum post data in message action options");
            fill_from_options(&mut title, &mut description, payload, ExtractionSource::ActionPayload);
        }

        if let Some(options) = options {
            fill_from_options(&mut title, &mut description, options, ExtractionSource::CallerOptions);
        }

        let text = message.content.text.as_str();
        if !text.is_empty() && (title.is_none() || description.is_none()) {
            info!("Attempting to extract data from agent message text");
            if let Some(found) = match_text(text) {
                fill(&mut title, found.title);
                fill(&mut description, found.description);
            }
        }

        if title.is_none() || description.is_none() {
            self.generate_missing(text, &mut title, &mut description)
                .await;
        }

        let (title, title_source) = resolve(title, DEFAULT_TITLE);
        let (description, description_source) = resolve(description, DEFAULT_DESCRIPTION);

        let topic = message
            .action_options()
            .and_then(|o| o.topic.clone())
            .or_else(|| options.and_then(|o| o.topic.clone()));

        info!(
            "Extracted title from {} and description from {}: \"{}\"",
            title_source, description_source, title
        );

        ExtractionResult {
            title,
            description,
            topic,
            title_source,
            description_source,
        }
    }

    async fn generate_missing(&self, text: &str, title: &mut Sourced, description: &mut Sourced) {
        let Some(generator) = &self.generator else {
            warn!("Title or description missing and no generator configured");
            return;
        };

        info!("Title or description missing, generating content as a last resort");
        let prompt = fill_fields_prompt(
            text,
            title.as_ref().map(|(t, _)| t.as_str()),
            description.as_ref().map(|(d, _)| d.as_str()),
        );

        match generator.generate_text(GenerationRequest::small(prompt)).await {
            Ok(response) => {
                let generated = parse_generated(&response);
                fill(title, generated.title.map(|t| (t, ExtractionSource::Generated)));
                fill(
                    description,
                    generated
                        .description
                        .map(|d| (d, ExtractionSource::Generated)),
                );
            }
            Err(e) => error!("Error generating forum content: {}", e),
        }
    }
}

fn fill_from_options(
    title: &mut Sourced,
    description: &mut Sourced,
    options: &PostOptions,
    source: ExtractionSource,
) {
    fill(title, present(options.title.as_deref(), source));
    fill(description, present(options.description.as_deref(), source));
}

fn present(value: Option<&str>, source: ExtractionSource) -> Sourced {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| (v.to_string(), source))
}

fn fill(slot: &mut Sourced, candidate: Sourced) {
    if slot.is_none() {
        *slot = candidate;
    }
}

fn resolve(field: Sourced, default: &str) -> (String, ExtractionSource) {
    match field {
        Some((value, source)) => (finalize_field(&value), source),
        None => {
            info!("Using fallback value: \"{}\"", default);
            (default.to_string(), ExtractionSource::Default)
        }
    }
}
