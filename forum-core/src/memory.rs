use crate::{CoreError, MessageContent};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Name-based id, stable for the same input.
pub fn string_to_uuid(value: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, value.as_bytes())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub id: Uuid,
    pub user_id: Uuid,
    pub agent_id: Uuid,
    pub room_id: Uuid,
    pub content: MessageContent,
    pub created_at: i64,
}

/// The agent runtime's conversational memory.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Uuid>, CoreError>;
    async fn create_room(&self, room_id: Uuid) -> Result<Uuid, CoreError>;
    async fn add_participant(&self, user_id: Uuid, room_id: Uuid) -> Result<(), CoreError>;
    async fn create_memory(&self, memory: Memory) -> Result<(), CoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    rooms: RwLock<HashMap<Uuid, HashSet<Uuid>>>,
    memories: RwLock<Vec<Memory>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn memories(&self) -> Vec<Memory> {
        self.memories.read().await.clone()
    }

    pub async fn participants(&self, room_id: Uuid) -> Vec<Uuid> {
        self.rooms
            .read()
            .await
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    async fn get_room(&self, room_id: Uuid) -> Result<Option<Uuid>, CoreError> {
        Ok(self.rooms.read().await.contains_key(&room_id).then_some(room_id))
    }

    async fn create_room(&self, room_id: Uuid) -> Result<Uuid, CoreError> {
        self.rooms.write().await.entry(room_id).or_default();
        Ok(room_id)
    }

    async fn add_participant(&self, user_id: Uuid, room_id: Uuid) -> Result<(), CoreError> {
        match self.rooms.write().await.get_mut(&room_id) {
            Some(members) => {
                members.insert(user_id);
                Ok(())
            }
            None => Err(CoreError::InvalidInput {
                message: format!("room {} does not exist", room_id),
            }),
        }
    }

    async fn create_memory(&self, memory: Memory) -> Result<(), CoreError> {
        self.memories.write().await.push(memory);
        Ok(())
    }
}
