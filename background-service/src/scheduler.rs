use crate::interval::{IntervalSource, RandomInterval};
use crate::runtime::AgentRuntime;
use content_extractor::{finalize_scheduled_post, parse_scheduled_post};
use forum_client::{ForumClient, MetricsCollector, TokenStore};
use forum_core::{
    string_to_uuid, CoreError, ErrorExt, ForumApiError, ForumConfig, Memory, MessageContent,
    PostDraft, PostOptions, PostRecord, FORUM_CREATE_POST,
};
use llm_interface::{compose_context, GenerationRequest, TemplateState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_TOPICS: &[&str] = &[
    "Technology",
    "Philosophy",
    "Science",
    "Art",
    "Culture",
    "Society",
    "Future",
];

const STOP_SEQUENCES: &[&str] = &["</response>", "---", "###"];

const POST_GENERATION_TEMPLATE: &str = r#"
# You are {{agentName}}
{{bio}}
{{style}}

# Task:
Generate a thoughtful forum post about {{topic}} that would be interesting to your audience.
Create content that matches your personality and interests.

# IMPORTANT OUTPUT FORMAT:
You must format your response exactly as shown below with the Title and Description clearly marked:

Title: "Your post title here"
Description: "Your detailed post content here (2-3 paragraphs)"

The title must be between quotes and should be engaging and relevant.
The description must be between quotes and should be 2-3 paragraphs of thoughtful content.
Do not include any other text, comments, or additional formatting in your response.
"#;

/// Publishes generated posts on a randomized, self-rescheduling timer.
///
/// At most one post attempt runs at a time. [`stop`](Self::stop) cancels the
/// pending timer only; an attempt already under way runs to completion.
#[derive(Clone)]
pub struct ForumPostScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    runtime: AgentRuntime,
    intervals: Box<dyn IntervalSource>,
    token_store: TokenStore,
    client: RwLock<Option<Arc<ForumClient>>>,
    room_id: RwLock<Uuid>,
    is_posting: AtomicBool,
    timer: Mutex<Option<oneshot::Sender<()>>>,
}

/// Clears the in-flight flag when a post attempt ends, however it ends.
struct PostingGuard<'a>(&'a AtomicBool);

impl Drop for PostingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ForumPostScheduler {
    pub fn new(runtime: AgentRuntime) -> Self {
        Self::with_interval_source(runtime, RandomInterval)
    }

    pub fn with_interval_source(
        runtime: AgentRuntime,
        intervals: impl IntervalSource + 'static,
    ) -> Self {
        let room_id = string_to_uuid(&format!("forum-auto-{}", runtime.agent_id));
        let token_store = TokenStore::from_settings(runtime.settings.as_ref());
        info!(
            "Forum post scheduler created for {} with default room {}",
            runtime.character.name, room_id
        );

        Self {
            inner: Arc::new(SchedulerInner {
                runtime,
                intervals: Box::new(intervals),
                token_store,
                client: RwLock::new(None),
                room_id: RwLock::new(room_id),
                is_posting: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Load config, build the forum client, ensure the automated-post room
    /// exists and, if auto posting is enabled, arm the timer.
    pub async fn init(&self) -> Result<(), CoreError> {
        let config = ForumConfig::load(self.inner.runtime.settings.as_ref())?;
        info!(
            "Forum post scheduler settings: generation {}, interval {}-{} minutes",
            config.enable_auto_post,
            config.post_interval_min_minutes,
            config.post_interval_max_minutes
        );

        let client = ForumClient::from_config(&config)?
            .with_token_store(self.inner.token_store.clone())
            .with_settings(self.inner.runtime.settings.clone());
        *self.inner.client.write().await = Some(Arc::new(client));

        self.ensure_default_room().await;

        if config.enable_auto_post {
            info!("Automatic forum post generation is enabled");
            self.arm(config.interval_min(), config.interval_max());
        } else {
            info!("Automatic forum post generation is disabled");
        }
        Ok(())
    }

    /// Cancel the pending timer. Safe to call repeatedly.
    pub fn stop(&self) {
        if let Some(cancel) = self.timer_slot().take() {
            let _ = cancel.send(());
            info!("Forum post scheduler stopped");
        }
    }

    pub fn is_armed(&self) -> bool {
        self.timer_slot().is_some()
    }

    pub fn is_posting(&self) -> bool {
        self.inner.is_posting.load(Ordering::SeqCst)
    }

    /// Request metrics of the forum client, once [`init`](Self::init) built one.
    pub async fn client_metrics(&self) -> Option<Arc<MetricsCollector>> {
        self.inner
            .client
            .read()
            .await
            .as_ref()
            .map(|client| client.metrics())
    }

    pub async fn room_id(&self) -> Uuid {
        *self.inner.room_id.read().await
    }

    /// Compose and publish one post. Missing fields are generated.
    ///
    /// Returns `false` without doing anything if another attempt is in
    /// flight, and `false` if the attempt fails.
    pub async fn create_post(&self, title: Option<String>, description: Option<String>) -> bool {
        if self
            .inner
            .is_posting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("Already creating a forum post, skipping");
            return false;
        }
        let _guard = PostingGuard(&self.inner.is_posting);

        match self.publish(title, description).await {
            Ok(record) => {
                info!("Successfully created forum post: {}", record.id);
                true
            }
            Err(e) => {
                e.log_error();
                if e.is_retryable() {
                    info!("Failure looks transient; the next scheduled post will try again");
                }
                false
            }
        }
    }

    async fn publish(
        &self,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<PostRecord, CoreError> {
        let runtime = &self.inner.runtime;
        let agent_name = runtime.character.name.as_str();

        let draft = match (title, description) {
            (Some(title), Some(description)) => {
                finalize_scheduled_post(&title, &description, agent_name, None)
            }
            (title, description) => {
                info!("Generating forum post content...");
                let topic = self.pick_topic();
                let generated = runtime
                    .generator
                    .generate_text(
                        GenerationRequest::small(self.generation_prompt(&topic))
                            .with_stop(STOP_SEQUENCES),
                    )
                    .await?;
                debug!("Generated raw content: {} chars", generated.len());

                let parsed = parse_scheduled_post(&generated, agent_name, &topic);
                finalize_scheduled_post(
                    &title.unwrap_or(parsed.title),
                    &description.unwrap_or(parsed.description),
                    agent_name,
                    Some(topic),
                )
            }
        };
        info!("Generated forum post title: \"{}\"", draft.title);

        self.remember(&draft).await?;

        let client = self
            .inner
            .client
            .read()
            .await
            .clone()
            .ok_or(ForumApiError::ClientNotInitialized)?;

        if !client.refresh_token_if_needed().await {
            warn!("Could not confirm a usable forum token, posting anyway");
        }
        client.create_post(&draft.title, &draft.description).await
    }

    async fn remember(&self, draft: &PostDraft) -> Result<(), CoreError> {
        let runtime = &self.inner.runtime;
        let now = chrono::Utc::now().timestamp_millis();
        let memory = Memory {
            id: string_to_uuid(&format!("forum-post-{}", now)),
            user_id: runtime.agent_id,
            agent_id: runtime.agent_id,
            room_id: self.room_id().await,
            content: MessageContent {
                text: format!("{}\n\n{}", draft.title, draft.description),
                action: Some(FORUM_CREATE_POST.to_string()),
                options: Some(PostOptions::new(
                    draft.title.clone(),
                    draft.description.clone(),
                )),
            },
            created_at: now,
        };
        runtime.memory.create_memory(memory).await
    }

    async fn ensure_default_room(&self) {
        let runtime = &self.inner.runtime;
        let room_id = self.room_id().await;

        let result = async {
            if runtime.memory.get_room(room_id).await?.is_some() {
                debug!("Default forum room already exists: {}", room_id);
                return Ok::<(), CoreError>(());
            }
            info!("Creating default forum room with ID: {}", room_id);
            runtime.memory.create_room(room_id).await?;
            runtime
                .memory
                .add_participant(runtime.agent_id, room_id)
                .await
        }
        .await;

        if let Err(e) = result {
            warn!("Error ensuring default room exists");
            e.log_warn();
            let fallback = string_to_uuid(&format!(
                "forum-fallback-{}",
                chrono::Utc::now().timestamp_millis()
            ));
            *self.inner.room_id.write().await = fallback;
            info!("Created fallback room ID: {}", fallback);
        }
    }

    fn pick_topic(&self) -> String {
        let topics = &self.inner.runtime.character.topics;
        if topics.is_empty() {
            DEFAULT_TOPICS[fastrand::usize(..DEFAULT_TOPICS.len())].to_string()
        } else {
            topics[fastrand::usize(..topics.len())].clone()
        }
    }

    fn generation_prompt(&self, topic: &str) -> String {
        let character = &self.inner.runtime.character;
        let mut state = TemplateState::new();
        state.insert("agentName".to_string(), character.name.clone());
        state.insert("bio".to_string(), character.bio.join(" "));
        state.insert("style".to_string(), character.style.join("\n"));
        state.insert("topic".to_string(), topic.to_string());
        compose_context(POST_GENERATION_TEMPLATE, &state)
    }

    /// Spawn the timer loop: wait a fresh random interval, post, repeat.
    fn arm(&self, min: Duration, max: Duration) {
        let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();
        if let Some(previous) = self.timer_slot().replace(cancel_tx) {
            let _ = previous.send(());
        }

        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let delay = match weak.upgrade() {
                    Some(inner) => inner.intervals.next_interval(min, max),
                    None => break,
                };
                info!(
                    "Scheduling next forum post in {:.1} minutes",
                    delay.as_secs_f64() / 60.0
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = &mut cancel_rx => break,
                }

                let Some(inner) = weak.upgrade() else { break };
                ForumPostScheduler { inner }.create_post(None, None).await;
            }
            debug!("Forum post timer loop exited");
        });
    }

    fn timer_slot(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
