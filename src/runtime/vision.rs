//! Image-description service.
//!
//! Contract plus a default implementation that calls an OpenAI-compatible
//! vision endpoint over HTTP. Failures are always tolerated by the caller.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::VisionError;

/// What the describer extracted from an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDescription {
    pub title: String,
    pub description: String,
}

/// Describes the image behind a fetchable URL.
#[async_trait]
pub trait ImageDescriber: Send + Sync {
    async fn describe(&self, url: &str) -> Result<ImageDescription, VisionError>;
}

// ── HTTP implementation ─────────────────────────────────────────────

const DESCRIBE_PROMPT: &str = "Describe the image. Respond with ONLY a JSON object: \
     {\"title\": \"<a few words>\", \"description\": \"<one or two sentences>\"}";

/// Max tokens for a describe call (kept tight — this runs per attachment).
const DESCRIBE_MAX_TOKENS: u32 = 256;

/// Vision describer backed by an OpenAI-compatible `chat/completions`
/// endpoint that accepts `image_url` content parts.
pub struct VisionDescriber {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl VisionDescriber {
    pub fn new(base_url: impl Into<String>, api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }
}

#[async_trait]
impl ImageDescriber for VisionDescriber {
    async fn describe(&self, url: &str) -> Result<ImageDescription, VisionError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": DESCRIBE_MAX_TOKENS,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": DESCRIBE_PROMPT },
                    { "type": "image_url", "image_url": { "url": url } }
                ]
            }]
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| VisionError::RequestFailed(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(VisionError::RequestFailed(format!(
                "HTTP {status}: {body_text}"
            )));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| VisionError::InvalidResponse(e.to_string()))?;

        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| VisionError::InvalidResponse("no message content".into()))?;

        Ok(parse_description(content))
    }
}

// ── Response parsing ────────────────────────────────────────────────

#[derive(Deserialize)]
struct DescribePayload {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

/// Parse the model output into a description.
///
/// The model may wrap its JSON in prose or markdown fences; if no JSON
/// object can be extracted, the raw text becomes the description.
fn parse_description(raw: &str) -> ImageDescription {
    if let Some(json) = extract_json_object(raw) {
        if let Ok(payload) = serde_json::from_str::<DescribePayload>(&json) {
            if !payload.title.is_empty() || !payload.description.is_empty() {
                return ImageDescription {
                    title: if payload.title.is_empty() {
                        "Image".into()
                    } else {
                        payload.title
                    },
                    description: payload.description,
                };
            }
        }
    }

    ImageDescription {
        title: "Image".into(),
        description: raw.trim().to_string(),
    }
}

/// Extract the outermost `{...}` object from a string, if any.
pub(crate) fn extract_json_object(raw: &str) -> Option<String> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(raw[start..=end].to_string())
}

// ── Tests ───────────────────────────────────────────────────────────
