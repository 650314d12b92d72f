use anyhow::Context;
use clap::{Parser, Subcommand};
use content_extractor::ContentExtractor;
use forum_client::TokenStore;
use forum_core::{Character, EnvSettings, InMemoryStore, Message, PostOptions};
use forum_plugin::{
    initialize_forum_environment, Action, AgentRuntime, CreateForumPostAction, ForumPlugin,
};
use llm_interface::{provider_from_settings, TextGenerator, UnconfiguredGenerator};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "forum_agent=info,forum_plugin=info,forum_client=info,background_service=info,content_extractor=info";

#[derive(Parser)]
#[command(name = "forum-agent", version, about = "Publish agent posts to the forum")]
struct Cli {
    /// Agent character file (TOML)
    #[arg(long, global = true)]
    character: Option<PathBuf>,

    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create one post through the FORUM_CREATE_POST action
    Post {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Free-form agent reply to extract the post from
        #[arg(long, default_value = "")]
        text: String,
    },
    /// Show what would be extracted from TEXT, without generation
    Extract { text: String },
    /// Run the post scheduler until Ctrl-C
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let character = match &cli.character {
        Some(path) => Character::from_file(path)
            .with_context(|| format!("failed to load character {}", path.display()))?,
        None => Character::named("Forum Agent"),
    };
    tracing::info!("Starting forum agent as {}", character.name);

    let settings = Arc::new(EnvSettings::new().with_character_settings(character.settings.clone()));
    initialize_forum_environment(settings.as_ref(), &TokenStore::from_settings(settings.as_ref()));

    let generator: Arc<dyn TextGenerator> = match provider_from_settings(settings.as_ref()) {
        Ok(generator) => generator,
        Err(e) => {
            tracing::warn!("Text generation unavailable: {}", e);
            Arc::new(UnconfiguredGenerator)
        }
    };
    let runtime = AgentRuntime::new(
        character,
        settings,
        generator,
        Arc::new(InMemoryStore::new()),
    );

    match cli.command {
        Command::Post {
            title,
            description,
            text,
        } => {
            let action = CreateForumPostAction;
            if !action.validate(&runtime).await {
                anyhow::bail!("forum configuration is missing or invalid");
            }

            let options = PostOptions {
                title,
                description,
                topic: None,
            };
            let (tx, rx) = tokio::sync::oneshot::channel();
            let posted = action
                .handler(
                    &runtime,
                    &Message::from_text(text),
                    Some(&options),
                    Box::new(move |response| {
                        let _ = tx.send(response);
                    }),
                )
                .await;

            let response = rx.await.context("action finished without reporting")?;
            println!("{}", response.text);
            if let Some(content) = response.content {
                println!("{}", serde_json::to_string_pretty(&content)?);
            }
            if !posted {
                std::process::exit(1);
            }
        }
        Command::Extract { text } => {
            let result = ContentExtractor::offline()
                .extract(&Message::from_text(text), None)
                .await;
            println!("title       ({}): {}", result.title_source, result.title);
            println!(
                "description ({}): {}",
                result.description_source, result.description
            );
        }
        Command::Run => {
            let client = ForumPlugin::new().start_client(runtime).await;
            if !client.is_scheduler_running() {
                tracing::warn!("Automatic posting is not active; waiting for Ctrl-C anyway");
            }
            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for Ctrl-C")?;
            client.stop();
            if let Some(report) = client.metrics_report().await {
                tracing::info!("Forum request metrics:\n{}", report);
            }
        }
    }

    Ok(())
}
