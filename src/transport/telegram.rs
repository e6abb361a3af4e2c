//! Telegram transport — long-polls the Bot API for updates.
//!
//! Native Bot API implementation over reqwest, adapted to the
//! `ChatTransport` contract (event stream, file resolution, sized sends).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TransportError;
use crate::transport::event::{
    ChatKind, ChatRef, EventPayload, InboundEvent, PhotoSize, Sender,
};
use crate::transport::{ChatTransport, EventStream, SentMessage};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram transport — connects to the Bot API via long-polling.
pub struct TelegramTransport {
    bot_token: String,
    api_base: String,
    client: reqwest::Client,
}

impl TelegramTransport {
    pub fn new(bot_token: String) -> Self {
        Self {
            bot_token,
            api_base: DEFAULT_API_BASE.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Point the transport at a different API base (for tests).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_base, self.bot_token)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{file_path}", self.api_base, self.bot_token)
    }

    /// Fetch the bot's own account via `getMe`.
    ///
    /// Returns `(account id, username)`; used by bootstrap to derive the
    /// agent identity and mention handle.
    pub async fn identify(&self) -> Result<(i64, String), TransportError> {
        let resp = self
            .client
            .get(self.api_url("getMe"))
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(TransportError::Http(format!(
                "getMe returned {}",
                resp.status()
            )));
        }

        let data: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let id = data["result"]["id"].as_i64().ok_or_else(|| {
            TransportError::InvalidUpdate {
                name: "telegram".into(),
                reason: "getMe result missing id".into(),
            }
        })?;
        let username = data["result"]["username"]
            .as_str()
            .unwrap_or_default()
            .to_string();
        Ok((id, username))
    }
}

// ── ChatTransport implementation ────────────────────────────────────

#[async_trait]
impl ChatTransport for TelegramTransport {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<EventStream, TransportError> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let client = self.client.clone();
        let url = self.api_url("getUpdates");

        tokio::spawn(async move {
            let mut offset: i64 = 0;

            tracing::info!("Telegram transport listening for updates...");

            loop {
                let body = serde_json::json!({
                    "offset": offset,
                    "timeout": 30,
                    "allowed_updates": ["message"]
                });

                let resp = match client.post(&url).json(&body).send().await {
                    Ok(r) => r,
                    Err(e) => {
                        tracing::warn!("Telegram poll error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                let data: serde_json::Value = match resp.json().await {
                    Ok(d) => d,
                    Err(e) => {
                        tracing::warn!("Telegram parse error: {e}");
                        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        continue;
                    }
                };

                if let Some(results) = data.get("result").and_then(serde_json::Value::as_array) {
                    for update in results {
                        if let Some(uid) =
                            update.get("update_id").and_then(serde_json::Value::as_i64)
                        {
                            offset = uid + 1;
                        }

                        let Some(event) = parse_update(update) else {
                            continue;
                        };

                        if tx.send(event).is_err() {
                            tracing::info!("Telegram listener channel closed");
                            return;
                        }
                    }
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        });

        Ok(Box::pin(stream))
    }

    async fn resolve_file_url(&self, file_id: &str) -> Result<String, TransportError> {
        let resp = self
            .client
            .post(self.api_url("getFile"))
            .json(&serde_json::json!({ "file_id": file_id }))
            .send()
            .await
            .map_err(|e| TransportError::FileResolution {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(TransportError::FileResolution {
                name: "telegram".into(),
                reason: format!("getFile failed: {err}"),
            });
        }

        let data: serde_json::Value =
            resp.json()
                .await
                .map_err(|e| TransportError::FileResolution {
                    name: "telegram".into(),
                    reason: e.to_string(),
                })?;

        let file_path = data["result"]["file_path"].as_str().ok_or_else(|| {
            TransportError::FileResolution {
                name: "telegram".into(),
                reason: "getFile result missing file_path".into(),
            }
        })?;

        Ok(self.file_url(file_path))
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<SentMessage, TransportError> {
        let mut body = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(message_id) = reply_to {
            body["reply_parameters"] = serde_json::json!({ "message_id": message_id });
        }

        let resp = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            return Err(TransportError::SendFailed {
                name: "telegram".into(),
                reason: format!("sendMessage failed: {err}"),
            });
        }

        let data: serde_json::Value =
            resp.json().await.map_err(|e| TransportError::SendFailed {
                name: "telegram".into(),
                reason: e.to_string(),
            })?;

        let result = &data["result"];
        let message_id =
            result["message_id"]
                .as_i64()
                .ok_or_else(|| TransportError::SendFailed {
                    name: "telegram".into(),
                    reason: "sendMessage result missing message_id".into(),
                })?;
        let timestamp = result["date"]
            .as_i64()
            .and_then(|d| DateTime::from_timestamp(d, 0))
            .unwrap_or_else(Utc::now);
        let sent_text = result["text"].as_str().unwrap_or(text).to_string();

        Ok(SentMessage {
            message_id,
            text: sent_text,
            timestamp,
        })
    }
}

// ── Update parsing ──────────────────────────────────────────────────

/// Parse one `getUpdates` entry into an `InboundEvent`.
///
/// Returns `None` when the update carries no message or no chat; events with
/// a missing sender or an unrecognized payload are still surfaced so the
/// pipeline can treat them as no-ops.
fn parse_update(update: &serde_json::Value) -> Option<InboundEvent> {
    let message = update.get("message")?;

    let message_id = message.get("message_id")?.as_i64()?;
    let chat = message.get("chat")?;
    let chat_id = chat.get("id")?.as_i64()?;
    let kind = match chat.get("type").and_then(serde_json::Value::as_str) {
        Some("private") => ChatKind::Private,
        Some("group") => ChatKind::Group,
        Some("supergroup") => ChatKind::Supergroup,
        _ => ChatKind::Channel,
    };

    let sender = message.get("from").map(|from| Sender {
        id: from["id"].as_i64().unwrap_or_default(),
        username: from["username"].as_str().map(String::from),
        first_name: from["first_name"].as_str().map(String::from),
        is_bot: from["is_bot"].as_bool().unwrap_or(false),
    });

    let timestamp = message
        .get("date")
        .and_then(serde_json::Value::as_i64)
        .and_then(|d| DateTime::from_timestamp(d, 0))
        .unwrap_or_else(Utc::now);

    let caption = message
        .get("caption")
        .and_then(serde_json::Value::as_str)
        .map(String::from);

    let payload = if let Some(text) = message.get("text").and_then(serde_json::Value::as_str) {
        Some(EventPayload::Text { text: text.into() })
    } else if let Some(photos) = message.get("photo").and_then(serde_json::Value::as_array) {
        let sizes = photos
            .iter()
            .filter_map(|p| {
                Some(PhotoSize {
                    file_id: p["file_id"].as_str()?.to_string(),
                    width: p["width"].as_u64().unwrap_or(0) as u32,
                    height: p["height"].as_u64().unwrap_or(0) as u32,
                })
            })
            .collect();
        Some(EventPayload::Photo { sizes, caption })
    } else if let Some(doc) = message.get("document") {
        doc["file_id"].as_str().map(|file_id| EventPayload::Document {
            file_id: file_id.to_string(),
            mime_type: doc["mime_type"].as_str().map(String::from),
            caption,
        })
    } else {
        None
    };

    let reply_to_message_id = message
        .get("reply_to_message")
        .and_then(|r| r.get("message_id"))
        .and_then(serde_json::Value::as_i64);

    Some(InboundEvent {
        message_id,
        chat: ChatRef { id: chat_id, kind },
        sender,
        timestamp,
        payload,
        reply_to_message_id,
    })
}

// ── Tests ───────────────────────────────────────────────────────────
