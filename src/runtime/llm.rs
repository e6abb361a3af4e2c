//! LLM-backed generation service.
//!
//! Supports:
//! - **Anthropic**: Direct API access via rig-core
//! - **OpenAI**: Direct API access via rig-core
//!
//! Uses rig-core for HTTP transport; `RigAdapter` bridges a rig
//! `CompletionModel` to the object-safe backend the generator holds one of
//! per quality class.

use std::sync::Arc;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use secrecy::ExposeSecret;
use serde::Deserialize;

use crate::error::GenerationError;
use crate::memory::Content;
use crate::runtime::generation::{GenerationService, QualityClass};
use crate::runtime::vision::extract_json_object;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

/// Configuration for creating the generation service.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    /// Model used for the respond/ignore/stop classifier.
    pub fast_model: String,
    /// Model used for full response generation.
    pub quality_model: String,
}

/// Object-safe completion backend for one model.
#[async_trait]
trait CompletionBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Bridges a rig `CompletionModel` to `CompletionBackend`.
struct RigAdapter<M> {
    model: M,
    provider: &'static str,
}

impl<M> RigAdapter<M> {
    fn new(model: M, provider: &'static str) -> Self {
        Self { model, provider }
    }
}

#[async_trait]
impl<M> CompletionBackend for RigAdapter<M>
where
    M: rig::completion::CompletionModel,
{
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let agent = rig::agent::AgentBuilder::new(self.model.clone()).build();
        agent
            .prompt(prompt)
            .await
            .map_err(|e| GenerationError::RequestFailed {
                provider: self.provider.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Generation service holding one model per quality class.
pub struct RigGenerator {
    fast: Arc<dyn CompletionBackend>,
    quality: Arc<dyn CompletionBackend>,
}

impl RigGenerator {
    /// Create the generator from configuration.
    pub fn from_config(config: &LlmConfig) -> Result<Self, GenerationError> {
        let (fast, quality) = match config.backend {
            LlmBackend::Anthropic => (
                create_anthropic(config, &config.fast_model)?,
                create_anthropic(config, &config.quality_model)?,
            ),
            LlmBackend::OpenAi => (
                create_openai(config, &config.fast_model)?,
                create_openai(config, &config.quality_model)?,
            ),
        };
        Ok(Self { fast, quality })
    }
}

fn create_anthropic(
    config: &LlmConfig,
    model_name: &str,
) -> Result<Arc<dyn CompletionBackend>, GenerationError> {
    use rig::providers::anthropic;

    let client: rig::client::Client<anthropic::client::AnthropicExt> =
        anthropic::Client::new(config.api_key.expose_secret()).map_err(|e| {
            GenerationError::RequestFailed {
                provider: "anthropic".to_string(),
                reason: format!("Failed to create Anthropic client: {}", e),
            }
        })?;

    let model = client.completion_model(model_name);
    tracing::info!("Using Anthropic (model: {})", model_name);
    Ok(Arc::new(RigAdapter::new(model, "anthropic")))
}

fn create_openai(
    config: &LlmConfig,
    model_name: &str,
) -> Result<Arc<dyn CompletionBackend>, GenerationError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(config.api_key.expose_secret()).map_err(|e| {
            GenerationError::RequestFailed {
                provider: "openai".to_string(),
                reason: format!("Failed to create OpenAI client: {}", e),
            }
        })?;

    let model = client.completion_model(model_name);
    tracing::info!("Using OpenAI (model: {})", model_name);
    Ok(Arc::new(RigAdapter::new(model, "openai")))
}

#[async_trait]
impl GenerationService for RigGenerator {
    async fn generate(
        &self,
        context: &str,
        quality: QualityClass,
    ) -> Result<Option<Content>, GenerationError> {
        let backend = match quality {
            QualityClass::Fast => &self.fast,
            QualityClass::Quality => &self.quality,
        };
        let raw = backend.complete(context).await?;
        Ok(parse_generated(&raw))
    }
}

// ── Response parsing ────────────────────────────────────────────────

/// JSON shape the reply template asks the model to produce.
#[derive(Deserialize)]
struct GeneratedPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    action: Option<String>,
}

/// Parse raw model output into content.
///
/// The reply template asks for `{"text": ..., "action": ...}`; models
/// sometimes answer in plain prose, which is accepted as text with no
/// action. Empty output maps to `None`.
fn parse_generated(raw: &str) -> Option<Content> {
    if let Some(json) = extract_json_object(raw) {
        if let Ok(payload) = serde_json::from_str::<GeneratedPayload>(&json) {
            if !payload.text.is_empty() {
                let mut content = Content::new(payload.text, "");
                content.action = payload.action.filter(|a| !a.is_empty());
                return Some(content);
            }
        }
    }

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(Content::new(trimmed, ""))
}

// ── Tests ───────────────────────────────────────────────────────────
