//! Error types for chat-assist.

/// Top-level error type for the agent.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Vision error: {0}")]
    Vision(#[from] VisionError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Chat-transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to send message on {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Failed to resolve file reference on {name}: {reason}")]
    FileResolution { name: String, reason: String },

    #[error("Malformed update from {name}: {reason}")]
    InvalidUpdate { name: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(String),
}

/// Generation-service errors.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Image-description errors. Always recovered locally; a failed description
/// never aborts message processing.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Describe request failed: {0}")]
    RequestFailed(String),

    #[error("Describe response unusable: {0}")]
    InvalidResponse(String),
}

/// Persistent-store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to open store: {0}")]
    Open(String),

    #[error("Append failed: {0}")]
    Append(String),

    #[error("Query failed: {0}")]
    Query(String),
}

/// Errors from the per-event pipeline's collaborator steps.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("State composition failed: {0}")]
    State(String),

    #[error("Action processing failed: {0}")]
    Actions(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),
}

/// Result type alias for the agent.
pub type Result<T> = std::result::Result<T, Error>;
