//! libSQL memory store — async `MemoryStore` implementation.
//!
//! Supports local file and in-memory databases. Memories are stored with
//! their deterministic id as the primary key and inserted with
//! `INSERT OR IGNORE`, so re-processing a transport event cannot create a
//! duplicate record.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::StoreError;
use crate::memory::{Content, Memory, zero_embedding};
use crate::runtime::store::MemoryStore;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS memories (
        id TEXT PRIMARY KEY,
        agent_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        room_id TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at TEXT NOT NULL,
        embedding TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_memories_room_created
        ON memories(room_id, created_at);";

/// libSQL-backed memory store.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlMemoryStore {
    #[allow(dead_code)]
    db: Arc<Database>,
    conn: Connection,
}

impl LibSqlMemoryStore {
    /// Open (or create) a local database file and initialize the schema.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create store directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        info!(path = %path.display(), "Memory store opened");
        Ok(store)
    }

    /// Create an in-memory store (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        let store = Self {
            db: Arc::new(db),
            conn,
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        self.conn
            .execute_batch(SCHEMA)
            .await
            .map_err(|e| StoreError::Open(format!("Schema init failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl MemoryStore for LibSqlMemoryStore {
    async fn append(&self, memory: &Memory) -> Result<(), StoreError> {
        let content_json = serde_json::to_string(&memory.content)
            .map_err(|e| StoreError::Append(format!("content serialization: {e}")))?;
        let embedding_json = serde_json::to_string(&memory.embedding)
            .map_err(|e| StoreError::Append(format!("embedding serialization: {e}")))?;

        self.conn
            .execute(
                "INSERT OR IGNORE INTO memories
                    (id, agent_id, user_id, room_id, content, created_at, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    memory.id.to_string(),
                    memory.agent_id.to_string(),
                    memory.user_id.to_string(),
                    memory.room_id.to_string(),
                    content_json,
                    memory.created_at.to_rfc3339(),
                    embedding_json,
                ],
            )
            .await
            .map_err(|e| StoreError::Append(format!("insert memory: {e}")))?;

        debug!(memory = %memory.id, room = %memory.room_id, "Memory appended");
        Ok(())
    }

    async fn recent(&self, room_id: Uuid, limit: usize) -> Result<Vec<Memory>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, agent_id, user_id, room_id, content, created_at, embedding
                 FROM memories WHERE room_id = ?1
                 ORDER BY created_at DESC LIMIT ?2",
                params![room_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| StoreError::Query(format!("recent memories: {e}")))?;

        let mut memories = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("row fetch: {e}")))?
        {
            memories.push(row_to_memory(&row)?);
        }

        // Rows come back newest first; callers want chronological order.
        memories.reverse();
        Ok(memories)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| DateTime::<Utc>::MIN_UTC)
}

fn row_to_memory(row: &libsql::Row) -> Result<Memory, StoreError> {
    let id_str: String = row
        .get(0)
        .map_err(|e| StoreError::Query(format!("id column: {e}")))?;
    let agent_str: String = row
        .get(1)
        .map_err(|e| StoreError::Query(format!("agent_id column: {e}")))?;
    let user_str: String = row
        .get(2)
        .map_err(|e| StoreError::Query(format!("user_id column: {e}")))?;
    let room_str: String = row
        .get(3)
        .map_err(|e| StoreError::Query(format!("room_id column: {e}")))?;
    let content_str: String = row
        .get(4)
        .map_err(|e| StoreError::Query(format!("content column: {e}")))?;
    let created_str: String = row
        .get(5)
        .map_err(|e| StoreError::Query(format!("created_at column: {e}")))?;
    let embedding_str: String = row
        .get(6)
        .map_err(|e| StoreError::Query(format!("embedding column: {e}")))?;

    let content: Content = serde_json::from_str(&content_str)
        .map_err(|e| StoreError::Query(format!("content parse: {e}")))?;
    let embedding: Vec<f32> =
        serde_json::from_str(&embedding_str).unwrap_or_else(|_| zero_embedding());

    Ok(Memory {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        agent_id: Uuid::parse_str(&agent_str).unwrap_or_else(|_| Uuid::nil()),
        user_id: Uuid::parse_str(&user_str).unwrap_or_else(|_| Uuid::nil()),
        room_id: Uuid::parse_str(&room_str).unwrap_or_else(|_| Uuid::nil()),
        content,
        created_at: parse_datetime(&created_str),
        embedding,
    })
}

// ── Tests ───────────────────────────────────────────────────────────
