//! Conversational state snapshots.
//!
//! `State` is an opaque key/value snapshot derived from accumulated
//! memories. The pipeline never interprets it; it only passes it through to
//! template substitution and back to the composer for refresh.

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::PipelineError;
use crate::memory::Memory;
use crate::runtime::store::MemoryStore;

/// Opaque context snapshot consumed by prompt templates.
#[derive(Debug, Clone, Default)]
pub struct State {
    values: serde_json::Map<String, serde_json::Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(|v| v.as_str())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Iterate over all keys and values.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.values.iter()
    }
}

/// Composes and refreshes `State` from accumulated memories.
#[async_trait]
pub trait StateComposer: Send + Sync {
    /// Build a state snapshot around one memory.
    async fn compose_state(&self, memory: &Memory) -> Result<State, PipelineError>;

    /// Recompute the snapshot's recent-message view, incorporating memories
    /// written since it was composed.
    async fn refresh_state(&self, state: State) -> Result<State, PipelineError>;
}

// ── Default implementation ──────────────────────────────────────────

/// How many memories feed the recent-messages view.
const RECENT_LIMIT: usize = 32;

/// How many of those form the immediate conversation thread.
const THREAD_LIMIT: usize = 8;

/// Composer that builds state from the store's recent memories for a room.
pub struct RecentMessagesComposer {
    store: Arc<dyn MemoryStore>,
    agent_name: String,
}

impl RecentMessagesComposer {
    pub fn new(store: Arc<dyn MemoryStore>, agent_name: impl Into<String>) -> Self {
        Self {
            store,
            agent_name: agent_name.into(),
        }
    }

    async fn load_views(&self, room_id: Uuid) -> Result<(String, String), PipelineError> {
        let memories = self
            .store
            .recent(room_id, RECENT_LIMIT)
            .await
            .map_err(|e| PipelineError::State(e.to_string()))?;

        let lines: Vec<String> = memories.iter().map(|m| self.format_line(m)).collect();
        let recent = lines.join("\n");
        let thread = lines
            .iter()
            .rev()
            .take(THREAD_LIMIT)
            .rev()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        Ok((recent, thread))
    }

    /// One display line per memory. Agent-authored memories are the ones
    /// linked to a triggering message via `in_reply_to`.
    fn format_line(&self, memory: &Memory) -> String {
        if memory.content.in_reply_to.is_some() {
            format!("{}: {}", self.agent_name, memory.content.text)
        } else {
            let user = memory.user_id.simple().to_string();
            format!("User {}: {}", &user[..8], memory.content.text)
        }
    }
}

#[async_trait]
impl StateComposer for RecentMessagesComposer {
    async fn compose_state(&self, memory: &Memory) -> Result<State, PipelineError> {
        let (recent, thread) = self.load_views(memory.room_id).await?;

        let mut state = State::new();
        state.insert("agentName", self.agent_name.clone());
        state.insert("roomId", memory.room_id.to_string());
        state.insert("recentMessages", recent);
        state.insert("formattedConversation", thread);
        Ok(state)
    }

    async fn refresh_state(&self, mut state: State) -> Result<State, PipelineError> {
        let room_id = state
            .get_str("roomId")
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| PipelineError::State("state has no roomId".into()))?;

        let (recent, thread) = self.load_views(room_id).await?;
        state.insert("recentMessages", recent);
        state.insert("formattedConversation", thread);
        Ok(state)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
