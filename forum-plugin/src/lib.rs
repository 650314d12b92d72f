//! Forum posting for an agent: the `FORUM_CREATE_POST` action, its example
//! conversations, and the client service that runs the post scheduler.

pub mod action;
pub mod environment;
pub mod examples;
pub mod plugin;

pub use action::{Action, ActionCallback, ActionResponse, CreateForumPostAction};
pub use background_service::AgentRuntime;
pub use environment::initialize_forum_environment;
pub use examples::{create_forum_post_examples, ActionExample};
pub use plugin::{ForumPlugin, ForumPluginClient};
