//! Chat-transport abstraction for message I/O.

pub mod event;
pub mod telegram;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::TransportError;

pub use event::{ChatKind, ChatRef, EventPayload, InboundEvent, PhotoSize, Sender};
pub use telegram::TelegramTransport;

/// Maximum outbound message length enforced by the transport, in characters.
pub const MAX_MESSAGE_LENGTH: usize = 4096;

/// Stream of inbound events delivered serially by the transport.
pub type EventStream = BoxStream<'static, InboundEvent>;

/// Record of a message the transport accepted for delivery.
#[derive(Debug, Clone)]
pub struct SentMessage {
    /// Transport-native id of the sent message.
    pub message_id: i64,
    /// Text as delivered.
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Chat transport — pure I/O, no pipeline logic.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Transport tag stamped onto normalized content (e.g. "telegram").
    fn name(&self) -> &str;

    /// Begin delivering inbound events.
    async fn start(&self) -> Result<EventStream, TransportError>;

    /// Resolve a transport file reference to a fetchable URL.
    async fn resolve_file_url(&self, file_id: &str) -> Result<String, TransportError>;

    /// Send text to a chat, optionally as a reply to a message.
    ///
    /// The text must fit [`MAX_MESSAGE_LENGTH`]; splitting longer responses
    /// is the pipeline's job.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<SentMessage, TransportError>;
}
