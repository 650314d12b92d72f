//! Test doubles for [`TextGenerator`].

use crate::{GenerationRequest, TextGenerator};
use async_trait::async_trait;
use forum_core::{CoreError, LlmError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Replays canned responses in order, then fails with `ServiceUnavailable`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(&self, request: GenerationRequest) -> Result<String, CoreError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self.responses.lock().ok().and_then(|mut r| r.pop_front());
        next.ok_or_else(|| {
            LlmError::ServiceUnavailable {
                provider: "scripted".to_string(),
            }
            .into()
        })
    }
}

/// Always fails, counting how often it was asked.
#[derive(Debug, Default)]
pub struct FailingGenerator {
    calls: AtomicUsize,
}

impl FailingGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FailingGenerator {
    async fn generate_text(&self, _request: GenerationRequest) -> Result<String, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(LlmError::ServiceUnavailable {
            provider: "failing".to_string(),
        }
        .into())
    }
}

/// Blocks every call until [`GatedGenerator::release`] is invoked, then
/// answers with a fixed response.
#[derive(Debug)]
pub struct GatedGenerator {
    response: String,
    gate: Arc<Notify>,
    entered: Arc<Notify>,
    calls: AtomicUsize,
}

impl GatedGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            gate: Arc::new(Notify::new()),
            entered: Arc::new(Notify::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Resolves once a call is waiting on the gate.
    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for GatedGenerator {
    async fn generate_text(&self, _request: GenerationRequest) -> Result<String, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(self.response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_generator_replays_then_fails() {
        let generator = ScriptedGenerator::new(["first"]);
        let request = GenerationRequest::small("prompt");

        assert_eq!(generator.generate_text(request.clone()).await.unwrap(), "first");
        assert!(generator.generate_text(request).await.is_err());
        assert_eq!(generator.call_count(), 2);
        assert_eq!(generator.requests()[0].context, "prompt");
    }

    #[tokio::test]
    async fn test_gated_generator_waits_for_release() {
        let generator = Arc::new(GatedGenerator::new("done"));
        let task = {
            let generator = Arc::clone(&generator);
            tokio::spawn(async move { generator.generate_text(GenerationRequest::small("p")).await })
        };

        generator.wait_until_entered().await;
        assert!(!task.is_finished());
        generator.release();
        assert_eq!(task.await.unwrap().unwrap(), "done");
    }
}
