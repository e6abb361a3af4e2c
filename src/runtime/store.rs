//! Persistent-store contract.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::memory::Memory;

/// Append-only conversational memory store.
///
/// Durability and read-back are the store's responsibility; the pipeline
/// never caches memories in process.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Persist one memory record.
    async fn append(&self, memory: &Memory) -> Result<(), StoreError>;

    /// The most recent memories for a room, oldest first, at most `limit`.
    async fn recent(&self, room_id: Uuid, limit: usize) -> Result<Vec<Memory>, StoreError>;
}
