//! Generation-service contract.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::memory::Content;

/// Which model tier a generation call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityClass {
    /// Fast/cheap tier, used for the respond/ignore/stop classifier.
    Fast,
    /// Higher-quality tier, used for full response generation.
    Quality,
}

/// Produces agent output from a composed prompt context.
///
/// Returns `None` when the service produced nothing usable; the returned
/// content carries text and an optional action — the orchestrator stamps the
/// transport tag and reply linkage before persisting.
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn generate(
        &self,
        context: &str,
        quality: QualityClass,
    ) -> Result<Option<Content>, GenerationError>;
}
