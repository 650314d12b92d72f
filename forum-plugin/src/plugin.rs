use crate::action::{Action, CreateForumPostAction};
use background_service::{AgentRuntime, ForumPostScheduler};
use forum_core::{CoreError, ErrorReporter, ForumApiError, ForumConfig};
use std::sync::Arc;
use tracing::{error, info};

/// Registration record the agent runtime reads when loading the plugin.
pub struct ForumPlugin {
    actions: Vec<Arc<dyn Action>>,
}

impl ForumPlugin {
    pub const NAME: &'static str = "forum";

    pub fn new() -> Self {
        Self {
            actions: vec![Arc::new(CreateForumPostAction)],
        }
    }

    pub fn name(&self) -> &'static str {
        Self::NAME
    }

    pub fn description(&self) -> &'static str {
        "Forum API plugin: publishes posts on request and on a schedule"
    }

    pub fn actions(&self) -> &[Arc<dyn Action>] {
        &self.actions
    }

    /// Find an action by name or simile.
    pub fn action(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions
            .iter()
            .find(|action| action.name() == name || action.similes().iter().any(|s| *s == name))
            .cloned()
    }

    pub async fn start_client(&self, runtime: AgentRuntime) -> ForumPluginClient {
        ForumPluginClient::start(runtime).await
    }
}

impl Default for ForumPlugin {
    fn default() -> Self {
        Self::new()
    }
}

/// Long-running side of the plugin: owns the post scheduler.
///
/// A client whose scheduler failed to start still lets the action serve
/// manual posts; only [`create_post`](Self::create_post) is unavailable.
pub struct ForumPluginClient {
    scheduler: Option<ForumPostScheduler>,
}

impl ForumPluginClient {
    pub async fn start(runtime: AgentRuntime) -> Self {
        info!("Starting forum client");
        Self::start_with(runtime, ForumPostScheduler::new).await
    }

    /// Start with a caller-built scheduler.
    pub async fn start_with(
        runtime: AgentRuntime,
        build: impl FnOnce(AgentRuntime) -> ForumPostScheduler,
    ) -> Self {
        let reporter = ErrorReporter::new();
        if let Err(e) = ForumConfig::load(runtime.settings.as_ref()) {
            error!("Error starting forum client");
            reporter.report_error(&CoreError::from(e));
            return Self { scheduler: None };
        }

        let scheduler = build(runtime);
        match scheduler.init().await {
            Ok(()) => {
                info!("Forum client started successfully");
                Self {
                    scheduler: Some(scheduler),
                }
            }
            Err(e) => {
                error!("Failed to initialize forum post scheduler");
                reporter.report_error(&e);
                Self { scheduler: None }
            }
        }
    }

    pub fn is_scheduler_running(&self) -> bool {
        self.scheduler.as_ref().is_some_and(|s| s.is_armed())
    }

    pub fn stop(&self) {
        info!("Stopping forum client");
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop();
        }
    }

    /// JSON snapshot of the scheduler's forum request metrics.
    pub async fn metrics_report(&self) -> Option<String> {
        let metrics = self.scheduler.as_ref()?.client_metrics().await?;
        match metrics.export_metrics().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Failed to export forum metrics: {}", e);
                None
            }
        }
    }

    pub async fn create_post(
        &self,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<bool, CoreError> {
        match &self.scheduler {
            Some(scheduler) => Ok(scheduler.create_post(title, description).await),
            None => {
                error!("Post client not initialized");
                Err(ForumApiError::ClientNotInitialized.into())
            }
        }
    }
}
