//! Conversational memory model.
//!
//! Every inbound message and every delivered response chunk becomes one
//! `Memory` record in the persistent store. Identities are derived
//! deterministically from transport identifiers so the same transport
//! user/chat/message always maps to the same UUID across process restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Dimension of the embedding vector stored alongside each memory.
///
/// The core never computes embeddings itself; it stores a zero vector and
/// leaves semantic indexing to whatever consumes the store.
pub const EMBEDDING_DIM: usize = 384;

/// Normalized message body — one per inbound or outbound message,
/// immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Message text (for inbound messages: text/caption plus any attachment
    /// description).
    pub text: String,
    /// Transport tag, e.g. "telegram".
    pub source: String,
    /// Action attached by the generation service, or the continuation marker
    /// on non-final chunks of a multi-chunk reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Memory id of the message this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<Uuid>,
}

impl Content {
    /// Plain text content with a transport tag.
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            action: None,
            in_reply_to: None,
        }
    }
}

/// A persisted conversational record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Deterministic id derived from the transport message id + agent id.
    pub id: Uuid,
    pub agent_id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub content: Content,
    pub created_at: DateTime<Utc>,
    /// Zero vector unless a semantic embedding was computed elsewhere.
    pub embedding: Vec<f32>,
}

impl Memory {
    /// Build a memory with a zero embedding.
    pub fn new(
        id: Uuid,
        agent_id: Uuid,
        user_id: Uuid,
        room_id: Uuid,
        content: Content,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            agent_id,
            user_id,
            room_id,
            content,
            created_at,
            embedding: zero_embedding(),
        }
    }
}

/// The all-zeros embedding used when no semantic embedding is computed.
pub fn zero_embedding() -> Vec<f32> {
    vec![0.0; EMBEDDING_DIM]
}

// ── Identity derivation ─────────────────────────────────────────────
//
// UUIDv5 over the transport identifier strings, matching the salting the
// store relies on: user ids depend only on the transport sender, room and
// message ids are additionally salted with the agent id so two agents
// watching the same chat keep separate histories.

/// Derive the stable user id for a transport sender.
pub fn derive_user_id(sender_id: i64) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, sender_id.to_string().as_bytes())
}

/// Derive the stable room id for a chat, scoped to one agent.
pub fn derive_room_id(chat_id: i64, agent_id: Uuid) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_DNS,
        format!("{chat_id}-{agent_id}").as_bytes(),
    )
}

/// Derive the stable memory id for a transport message, scoped to one agent.
///
/// Idempotent: re-processing the same transport event yields the same id,
/// so it cannot create a second conceptual identity.
pub fn derive_message_id(transport_message_id: i64, agent_id: Uuid) -> Uuid {
    Uuid::new_v5(
        &Uuid::NAMESPACE_DNS,
        format!("{transport_message_id}-{agent_id}").as_bytes(),
    )
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_is_deterministic() {
        let agent = Uuid::new_v4();
        assert_eq!(derive_message_id(42, agent), derive_message_id(42, agent));
    }

    #[test]
    fn message_id_differs_per_agent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(derive_message_id(42, a), derive_message_id(42, b));
    }

    #[test]
    fn message_id_differs_per_message() {
        let agent = Uuid::new_v4();
        assert_ne!(derive_message_id(1, agent), derive_message_id(2, agent));
    }

    #[test]
    fn room_id_scoped_to_agent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(derive_room_id(7, a), derive_room_id(7, a));
        assert_ne!(derive_room_id(7, a), derive_room_id(7, b));
    }

    #[test]
    fn user_id_independent_of_agent() {
        assert_eq!(derive_user_id(99), derive_user_id(99));
        assert_ne!(derive_user_id(99), derive_user_id(100));
    }

    #[test]
    fn zero_embedding_dimension() {
        let e = zero_embedding();
        assert_eq!(e.len(), EMBEDDING_DIM);
        assert!(e.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn content_serialization_omits_none_fields() {
        let content = Content::new("hello", "telegram");
        let json = serde_json::to_value(&content).unwrap();
        assert!(json.get("action").is_none());
        assert!(json.get("in_reply_to").is_none());
    }
}
