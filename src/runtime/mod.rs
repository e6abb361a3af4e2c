//! Collaborator contracts and the shared agent runtime handle.
//!
//! The pipeline depends on external capabilities — generation, state
//! composition, persistence, image description, action processing,
//! evaluation — only through the traits defined here. `AgentRuntime`
//! bundles one implementation of each; it is constructed once during
//! process startup and shared by reference across all events, so
//! construction failures surface at boot instead of mid-pipeline.

pub mod actions;
pub mod evaluate;
pub mod generation;
pub mod libsql_store;
pub mod llm;
pub mod state;
pub mod store;
pub mod vision;

use std::sync::Arc;

use uuid::Uuid;

use crate::config::AgentConfig;

pub use actions::{ActionProcessor, DeliverAndRecord, NoActions};
pub use evaluate::{Evaluator, NoEvaluation};
pub use generation::{GenerationService, QualityClass};
pub use libsql_store::LibSqlMemoryStore;
pub use llm::{LlmBackend, LlmConfig, RigGenerator};
pub use state::{RecentMessagesComposer, State, StateComposer};
pub use store::MemoryStore;
pub use vision::{ImageDescriber, ImageDescription, VisionDescriber};

/// The expensive-to-construct backend handle shared across all events.
pub struct AgentRuntime {
    pub config: AgentConfig,
    pub generation: Arc<dyn GenerationService>,
    pub state: Arc<dyn StateComposer>,
    pub store: Arc<dyn MemoryStore>,
    pub vision: Arc<dyn ImageDescriber>,
    pub actions: Arc<dyn ActionProcessor>,
    pub evaluator: Arc<dyn Evaluator>,
}

impl AgentRuntime {
    pub fn agent_id(&self) -> Uuid {
        self.config.identity.id
    }
}
