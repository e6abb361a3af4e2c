//! Attachment normalization — image payloads become text descriptions.

use std::sync::Arc;

use tracing::warn;

use crate::error::Error;
use crate::runtime::vision::ImageDescriber;
use crate::transport::event::{EventPayload, InboundEvent};
use crate::transport::ChatTransport;

/// Extracts a textual description from an event's image attachment.
pub struct AttachmentNormalizer {
    transport: Arc<dyn ChatTransport>,
    vision: Arc<dyn ImageDescriber>,
}

impl AttachmentNormalizer {
    pub fn new(transport: Arc<dyn ChatTransport>, vision: Arc<dyn ImageDescriber>) -> Self {
        Self { transport, vision }
    }

    /// Describe the event's image, if it carries one.
    ///
    /// Any failure along the way — file resolution, the describe call — is
    /// logged and collapsed to `None`; a broken attachment must never abort
    /// message processing.
    pub async fn describe_attachment(&self, event: &InboundEvent) -> Option<String> {
        match self.try_describe(event).await {
            Ok(description) => description,
            Err(e) => {
                warn!(error = %e, "Attachment description failed, continuing without it");
                None
            }
        }
    }

    async fn try_describe(&self, event: &InboundEvent) -> Result<Option<String>, Error> {
        let file_id = match &event.payload {
            // Highest-resolution variant is last in the ordered size list.
            Some(EventPayload::Photo { sizes, .. }) => match sizes.last() {
                Some(photo) => photo.file_id.as_str(),
                None => return Ok(None),
            },
            Some(EventPayload::Document {
                file_id, mime_type, ..
            }) if mime_type.as_deref().is_some_and(|m| m.starts_with("image/")) => {
                file_id.as_str()
            }
            _ => return Ok(None),
        };

        let url = self.transport.resolve_file_url(file_id).await?;
        let described = self.vision.describe(&url).await?;
        Ok(Some(format!(
            "[Image: {}\n{}]",
            described.title, described.description
        )))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
