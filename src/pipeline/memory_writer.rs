//! Turns messages into persisted memory records.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;
use crate::memory::{derive_message_id, Content, Memory};
use crate::runtime::store::MemoryStore;
use crate::transport::SentMessage;

/// Action marker on every outbound chunk except the last, so downstream
/// action processing treats a multi-chunk reply as one logical action
/// attached to its final segment.
pub const CONTINUE_ACTION: &str = "CONTINUE";

/// The user/room pair one conversation's memories are filed under.
#[derive(Debug, Clone, Copy)]
pub struct ConversationIds {
    pub user_id: Uuid,
    pub room_id: Uuid,
}

/// Builds memory records with deterministic ids and appends them to the
/// store.
pub struct ConversationMemoryWriter {
    store: Arc<dyn MemoryStore>,
    agent_id: Uuid,
}

impl ConversationMemoryWriter {
    pub fn new(store: Arc<dyn MemoryStore>, agent_id: Uuid) -> Self {
        Self { store, agent_id }
    }

    /// Persist the inbound message, returning its memory record.
    pub async fn record_inbound(
        &self,
        transport_message_id: i64,
        ids: ConversationIds,
        content: Content,
        created_at: DateTime<Utc>,
    ) -> Result<Memory, StoreError> {
        let memory = Memory::new(
            derive_message_id(transport_message_id, self.agent_id),
            self.agent_id,
            ids.user_id,
            ids.room_id,
            content,
            created_at,
        );
        self.store.append(&memory).await?;
        debug!(memory = %memory.id, "Inbound memory recorded");
        Ok(memory)
    }

    /// Build the memory for one delivered chunk.
    ///
    /// Non-final chunks carry the continuation marker; the final chunk keeps
    /// whatever action the generated response carried.
    pub fn outbound_memory(
        &self,
        sent: &SentMessage,
        response: &Content,
        ids: ConversationIds,
        in_reply_to: Uuid,
        is_last: bool,
    ) -> Memory {
        let mut content = response.clone();
        content.text = sent.text.clone();
        content.in_reply_to = Some(in_reply_to);
        content.action = if is_last {
            response.action.clone()
        } else {
            Some(CONTINUE_ACTION.to_string())
        };

        Memory::new(
            derive_message_id(sent.message_id, self.agent_id),
            self.agent_id,
            ids.user_id,
            ids.room_id,
            content,
            sent.timestamp,
        )
    }

    /// Persist an outbound chunk memory. Called only after the chunk's send
    /// succeeded.
    pub async fn record(&self, memory: &Memory) -> Result<(), StoreError> {
        self.store.append(memory).await?;
        debug!(memory = %memory.id, "Outbound memory recorded");
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use crate::memory::{derive_room_id, derive_user_id};

    struct FakeStore {
        memories: Mutex<Vec<Memory>>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                memories: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl MemoryStore for FakeStore {
        async fn append(&self, memory: &Memory) -> Result<(), StoreError> {
            self.memories.lock().await.push(memory.clone());
            Ok(())
        }

        async fn recent(&self, _room_id: Uuid, _limit: usize) -> Result<Vec<Memory>, StoreError> {
            Ok(self.memories.lock().await.clone())
        }
    }

    fn ids(agent_id: Uuid) -> ConversationIds {
        ConversationIds {
            user_id: derive_user_id(2),
            room_id: derive_room_id(10, agent_id),
        }
    }

    fn sent(message_id: i64, text: &str) -> SentMessage {
        SentMessage {
            message_id,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn inbound_memory_has_deterministic_id() {
        let agent = derive_user_id(1);
        let store = Arc::new(FakeStore::new());
        let writer = ConversationMemoryWriter::new(store, agent);

        let memory = writer
            .record_inbound(42, ids(agent), Content::new("hi", "telegram"), Utc::now())
            .await
            .unwrap();
        assert_eq!(memory.id, derive_message_id(42, agent));
        assert_eq!(memory.agent_id, agent);
    }

    #[test]
    fn non_final_chunk_gets_continue_marker() {
        let agent = derive_user_id(1);
        let writer = ConversationMemoryWriter::new(Arc::new(FakeStore::new()), agent);

        let mut response = Content::new("full response", "telegram");
        response.action = Some("SUMMARIZE".into());

        let reply_target = derive_message_id(42, agent);
        let memory =
            writer.outbound_memory(&sent(100, "chunk one"), &response, ids(agent), reply_target, false);

        assert_eq!(memory.content.text, "chunk one");
        assert_eq!(memory.content.action.as_deref(), Some(CONTINUE_ACTION));
        assert_eq!(memory.content.in_reply_to, Some(reply_target));
    }

    #[test]
    fn final_chunk_keeps_response_action() {
        let agent = derive_user_id(1);
        let writer = ConversationMemoryWriter::new(Arc::new(FakeStore::new()), agent);

        let mut response = Content::new("full response", "telegram");
        response.action = Some("SUMMARIZE".into());

        let memory = writer.outbound_memory(
            &sent(101, "last chunk"),
            &response,
            ids(agent),
            derive_message_id(42, agent),
            true,
        );

        assert_eq!(memory.content.action.as_deref(), Some("SUMMARIZE"));
    }

    #[test]
    fn final_chunk_without_action_has_none() {
        let agent = derive_user_id(1);
        let writer = ConversationMemoryWriter::new(Arc::new(FakeStore::new()), agent);
        let response = Content::new("full response", "telegram");

        let memory = writer.outbound_memory(
            &sent(101, "only chunk"),
            &response,
            ids(agent),
            derive_message_id(42, agent),
            true,
        );

        assert!(memory.content.action.is_none());
    }

    #[test]
    fn outbound_id_derives_from_sent_message() {
        let agent = derive_user_id(1);
        let writer = ConversationMemoryWriter::new(Arc::new(FakeStore::new()), agent);
        let response = Content::new("r", "telegram");

        let memory = writer.outbound_memory(
            &sent(555, "r"),
            &response,
            ids(agent),
            derive_message_id(42, agent),
            true,
        );
        assert_eq!(memory.id, derive_message_id(555, agent));
    }
}
