use forum_core::{MessageContent, PostOptions, FORUM_CREATE_POST};
use serde::Serialize;

/// One turn of an example conversation shown to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionExample {
    pub user: String,
    pub content: MessageContent,
}

fn user_turn(text: &str) -> ActionExample {
    ActionExample {
        user: "{{user1}}".to_string(),
        content: MessageContent {
            text: text.to_string(),
            ..Default::default()
        },
    }
}

fn agent_turn(text: &str, title: &str, description: &str) -> ActionExample {
    ActionExample {
        user: "{{agent}}".to_string(),
        content: MessageContent {
            text: text.to_string(),
            action: Some(FORUM_CREATE_POST.to_string()),
            options: Some(PostOptions::new(title, description)),
        },
    }
}

pub fn create_forum_post_examples() -> Vec<Vec<ActionExample>> {
    vec![
        vec![
            user_turn("Can you create a forum post about AI advancements with title 'Future of AI' and description explaining recent breakthroughs?"),
            agent_turn(
                "I'll create a forum post about AI advancements for you.",
                "Future of AI",
                "Recent AI breakthroughs include multimodal models, advances in reasoning capabilities, and more efficient training methods.",
            ),
        ],
        vec![
            user_turn("Make a forum post with title 'Interesting Tech News' and description about the latest tech developments"),
            agent_turn(
                "I'll create that forum post for you right now.",
                "Interesting Tech News",
                "The latest tech developments include advancements in quantum computing, new augmented reality devices, and breakthroughs in renewable energy storage.",
            ),
        ],
        vec![
            user_turn("Share your thoughts on future technology on the forum"),
            agent_turn(
                "I'll share my thoughts on future technology in a forum post.",
                "Perspectives on Future Technology",
                "I believe future technology will increasingly blur the lines between digital and physical realities, with AI integration becoming seamless in our daily lives.",
            ),
        ],
    ]
}
