//! Inbound event model.
//!
//! One `InboundEvent` per unit of incoming chat activity. The payload is a
//! tagged variant per content kind — text, photo, document — rather than a
//! flat struct of optional fields probed by presence checks.

use chrono::{DateTime, Utc};

/// The chat an event arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatRef {
    pub id: i64,
    pub kind: ChatKind,
}

/// Chat flavor as reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// One-to-one conversation with the agent.
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_private(self) -> bool {
        matches!(self, ChatKind::Private)
    }
}

/// Who sent the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub is_bot: bool,
}

impl Sender {
    /// Display name: username, else first name, else a placeholder.
    pub fn display_name(&self) -> &str {
        self.username
            .as_deref()
            .or(self.first_name.as_deref())
            .unwrap_or("Unknown User")
    }
}

/// One resolution variant of a photo. The transport delivers these ordered
/// smallest to largest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
}

/// Message content, one case per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventPayload {
    Text {
        text: String,
    },
    Photo {
        sizes: Vec<PhotoSize>,
        caption: Option<String>,
    },
    Document {
        file_id: String,
        mime_type: Option<String>,
        caption: Option<String>,
    },
}

/// One unit of incoming chat activity from the transport.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    /// Transport-native message id.
    pub message_id: i64,
    pub chat: ChatRef,
    /// Missing sender means the event is a no-op for the pipeline.
    pub sender: Option<Sender>,
    pub timestamp: DateTime<Utc>,
    /// Missing payload means the event is a no-op for the pipeline.
    pub payload: Option<EventPayload>,
    /// Transport message id this event replies to, if any.
    pub reply_to_message_id: Option<i64>,
}

impl InboundEvent {
    /// Body text of a plain text message.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Some(EventPayload::Text { text }) => Some(text),
            _ => None,
        }
    }

    /// Caption attached to a photo or document, if non-empty.
    pub fn caption(&self) -> Option<&str> {
        let caption = match &self.payload {
            Some(EventPayload::Photo { caption, .. }) => caption.as_deref(),
            Some(EventPayload::Document { caption, .. }) => caption.as_deref(),
            _ => None,
        };
        caption.filter(|c| !c.is_empty())
    }

    /// Text the user actually typed: message text, else a non-empty caption.
    pub fn visible_text(&self) -> Option<&str> {
        self.text().or_else(|| self.caption())
    }

    /// Whether the payload carries an image: a photo, or a document whose
    /// declared MIME type is `image/*`.
    pub fn has_image(&self) -> bool {
        match &self.payload {
            Some(EventPayload::Photo { .. }) => true,
            Some(EventPayload::Document { mime_type, .. }) => mime_type
                .as_deref()
                .is_some_and(|m| m.starts_with("image/")),
            _ => false,
        }
    }

    /// An image with no accompanying text or caption.
    pub fn is_image_only(&self) -> bool {
        self.has_image() && self.visible_text().is_none()
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn event(payload: Option<EventPayload>) -> InboundEvent {
        InboundEvent {
            message_id: 1,
            chat: ChatRef {
                id: 10,
                kind: ChatKind::Group,
            },
            sender: Some(Sender {
                id: 5,
                username: Some("alice".into()),
                first_name: None,
                is_bot: false,
            }),
            timestamp: Utc::now(),
            payload,
            reply_to_message_id: None,
        }
    }

    #[test]
    fn text_payload() {
        let e = event(Some(EventPayload::Text {
            text: "hello".into(),
        }));
        assert_eq!(e.text(), Some("hello"));
        assert_eq!(e.visible_text(), Some("hello"));
        assert!(!e.has_image());
    }

    #[test]
    fn photo_with_caption() {
        let e = event(Some(EventPayload::Photo {
            sizes: vec![],
            caption: Some("chart".into()),
        }));
        assert_eq!(e.text(), None);
        assert_eq!(e.caption(), Some("chart"));
        assert_eq!(e.visible_text(), Some("chart"));
        assert!(e.has_image());
        assert!(!e.is_image_only());
    }

    #[test]
    fn photo_without_caption_is_image_only() {
        let e = event(Some(EventPayload::Photo {
            sizes: vec![],
            caption: None,
        }));
        assert!(e.is_image_only());
    }

    #[test]
    fn empty_caption_counts_as_no_text() {
        let e = event(Some(EventPayload::Photo {
            sizes: vec![],
            caption: Some(String::new()),
        }));
        assert_eq!(e.caption(), None);
        assert!(e.is_image_only());
    }

    #[test]
    fn image_document_detected_by_mime() {
        let e = event(Some(EventPayload::Document {
            file_id: "f1".into(),
            mime_type: Some("image/png".into()),
            caption: None,
        }));
        assert!(e.has_image());
        assert!(e.is_image_only());
    }

    #[test]
    fn non_image_document_is_not_an_image() {
        let e = event(Some(EventPayload::Document {
            file_id: "f1".into(),
            mime_type: Some("application/pdf".into()),
            caption: None,
        }));
        assert!(!e.has_image());
        assert!(!e.is_image_only());
    }

    #[test]
    fn document_without_mime_is_not_an_image() {
        let e = event(Some(EventPayload::Document {
            file_id: "f1".into(),
            mime_type: None,
            caption: None,
        }));
        assert!(!e.has_image());
    }

    #[test]
    fn sender_display_name_fallbacks() {
        let named = Sender {
            id: 1,
            username: Some("alice".into()),
            first_name: Some("Alice".into()),
            is_bot: false,
        };
        assert_eq!(named.display_name(), "alice");

        let first_only = Sender {
            id: 1,
            username: None,
            first_name: Some("Alice".into()),
            is_bot: false,
        };
        assert_eq!(first_only.display_name(), "Alice");

        let anonymous = Sender {
            id: 1,
            username: None,
            first_name: None,
            is_bot: false,
        };
        assert_eq!(anonymous.display_name(), "Unknown User");
    }
}
