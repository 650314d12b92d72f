use forum_core::{Character, MemoryStore, SettingsProvider};
use llm_interface::TextGenerator;
use std::sync::Arc;
use uuid::Uuid;

/// The agent collaborators the forum services are handed at startup.
#[derive(Clone)]
pub struct AgentRuntime {
    pub agent_id: Uuid,
    pub character: Character,
    pub settings: Arc<dyn SettingsProvider>,
    pub generator: Arc<dyn TextGenerator>,
    pub memory: Arc<dyn MemoryStore>,
}

impl AgentRuntime {
    pub fn new(
        character: Character,
        settings: Arc<dyn SettingsProvider>,
        generator: Arc<dyn TextGenerator>,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        Self {
            agent_id: forum_core::string_to_uuid(&character.name),
            character,
            settings,
            generator,
            memory,
        }
    }
}
