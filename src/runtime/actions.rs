//! Downstream action processing.
//!
//! After a response is delivered, the outbound memories and refreshed state
//! are handed to an action processor, which may send follow-up messages
//! through the same deliver-and-record capability the orchestrator used.

use async_trait::async_trait;

use crate::error::{Error, PipelineError};
use crate::memory::{Content, Memory};
use crate::runtime::state::State;

/// Named capability: send content to the originating chat, split into
/// transport-sized chunks, persisting one memory per delivered chunk.
///
/// Contract: chunks are sent strictly in order; each memory is written only
/// after its chunk's send succeeds; the resulting memories are returned in
/// delivery order. A send failure aborts the remaining chunks but leaves
/// the memories of already-delivered chunks in place.
#[async_trait]
pub trait DeliverAndRecord: Send + Sync {
    async fn deliver(&self, content: Content) -> Result<Vec<Memory>, Error>;
}

/// Processes the actions a generated response carries.
#[async_trait]
pub trait ActionProcessor: Send + Sync {
    async fn process(
        &self,
        trigger: &Memory,
        responses: &[Memory],
        state: &State,
        deliver: &dyn DeliverAndRecord,
    ) -> Result<(), PipelineError>;
}

/// Action processor that does nothing. Used when no action handlers are
/// registered.
pub struct NoActions;

#[async_trait]
impl ActionProcessor for NoActions {
    async fn process(
        &self,
        trigger: &Memory,
        responses: &[Memory],
        _state: &State,
        _deliver: &dyn DeliverAndRecord,
    ) -> Result<(), PipelineError> {
        tracing::debug!(
            trigger = %trigger.id,
            responses = responses.len(),
            "No action handlers registered"
        );
        Ok(())
    }
}
