//! Post-processing evaluation.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::memory::Memory;
use crate::runtime::state::State;

/// Fire-and-forget evaluation of a processed event.
///
/// Runs for every event that reaches the end of the pipeline, whether or
/// not the agent responded.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        memory: &Memory,
        state: &State,
        did_respond: bool,
    ) -> Result<(), PipelineError>;
}

/// Evaluator that only records the outcome in the log.
pub struct NoEvaluation;

#[async_trait]
impl Evaluator for NoEvaluation {
    async fn evaluate(
        &self,
        memory: &Memory,
        _state: &State,
        did_respond: bool,
    ) -> Result<(), PipelineError> {
        tracing::debug!(memory = %memory.id, did_respond, "Event evaluated");
        Ok(())
    }
}
