//! Per-event orchestration.
//!
//! One `MessageManager` drives every inbound event through the same
//! sequence: filter → normalize → inbound memory → state → decision →
//! generation → chunked delivery → state refresh → action processing →
//! evaluation. Any error that escapes a step is caught at the top level,
//! logged, and the event is dropped; other events are unaffected.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::memory::{derive_message_id, derive_room_id, derive_user_id, Content, Memory};
use crate::pipeline::attachment::AttachmentNormalizer;
use crate::pipeline::chunker::split_into_chunks;
use crate::pipeline::decision::ResponseDecisionEngine;
use crate::pipeline::memory_writer::{ConversationIds, ConversationMemoryWriter};
use crate::pipeline::templates::{compose_context, TemplateSet};
use crate::runtime::actions::DeliverAndRecord;
use crate::runtime::generation::QualityClass;
use crate::runtime::state::State;
use crate::runtime::AgentRuntime;
use crate::transport::{ChatTransport, InboundEvent, MAX_MESSAGE_LENGTH};

/// Orchestrates the inbound-message pipeline.
pub struct MessageManager {
    runtime: Arc<AgentRuntime>,
    transport: Arc<dyn ChatTransport>,
    attachments: AttachmentNormalizer,
    decision: ResponseDecisionEngine,
    writer: Arc<ConversationMemoryWriter>,
    templates: TemplateSet,
}

impl MessageManager {
    pub fn new(runtime: Arc<AgentRuntime>, transport: Arc<dyn ChatTransport>) -> Self {
        let templates = TemplateSet::from_overrides(&runtime.config.templates);
        let attachments =
            AttachmentNormalizer::new(Arc::clone(&transport), Arc::clone(&runtime.vision));
        let decision = ResponseDecisionEngine::new(
            Arc::clone(&runtime.generation),
            templates.clone(),
            &runtime.config.identity,
        );
        let writer = Arc::new(ConversationMemoryWriter::new(
            Arc::clone(&runtime.store),
            runtime.agent_id(),
        ));
        Self {
            runtime,
            transport,
            attachments,
            decision,
            writer,
            templates,
        }
    }

    /// Process one inbound event to completion.
    ///
    /// Never propagates: an error anywhere in the pipeline is logged with
    /// context and the event is dropped. No retry, no reply to the chat.
    pub async fn handle_event(&self, event: InboundEvent) {
        if let Err(e) = self.process_event(&event).await {
            error!(
                error = %e,
                message_id = event.message_id,
                chat = event.chat.id,
                "Event processing failed, dropping event"
            );
        }
    }

    async fn process_event(&self, event: &InboundEvent) -> Result<()> {
        // Missing sender or payload is a pure no-op, not an error.
        let Some(sender) = &event.sender else {
            return Ok(());
        };
        if event.payload.is_none() {
            return Ok(());
        }

        let policy = self.runtime.config.policy;
        if policy.ignore_bot_messages && sender.is_bot {
            debug!(sender = sender.id, "Ignoring bot message per policy");
            return Ok(());
        }
        if policy.ignore_direct_messages && event.chat.kind.is_private() {
            debug!(chat = event.chat.id, "Ignoring direct message per policy");
            return Ok(());
        }

        let agent_id = self.runtime.agent_id();
        let ids = ConversationIds {
            user_id: derive_user_id(sender.id),
            room_id: derive_room_id(event.chat.id, agent_id),
        };

        // Normalize text, caption and attachment into one content body.
        let image_description = self.attachments.describe_attachment(event).await;
        let typed = event.visible_text().unwrap_or_default();
        let full_text = match &image_description {
            Some(described) if typed.is_empty() => described.clone(),
            Some(described) => format!("{typed} {described}"),
            None => typed.to_string(),
        };
        if full_text.is_empty() {
            // Nothing to remember or react to.
            return Ok(());
        }

        let mut content = Content::new(full_text, self.transport.name());
        content.in_reply_to = event
            .reply_to_message_id
            .map(|id| derive_message_id(id, agent_id));

        let memory = self
            .writer
            .record_inbound(event.message_id, ids, content, event.timestamp)
            .await?;

        let mut state = self.runtime.state.compose_state(&memory).await?;
        state = self.runtime.state.refresh_state(state).await?;

        let decision = self.decision.decide(event, &state).await;
        let responded = decision.should_respond();
        debug!(?decision, message_id = event.message_id, "Decision made");

        if responded {
            if let Some(response_memories) = self.respond(event, ids, &state).await? {
                state = self.runtime.state.refresh_state(state).await?;
                let delivery = self.delivery(event, ids);
                self.runtime
                    .actions
                    .process(&memory, &response_memories, &state, &delivery)
                    .await
                    .map_err(Error::Pipeline)?;
            }
        }

        self.runtime
            .evaluator
            .evaluate(&memory, &state, responded)
            .await
            .map_err(Error::Pipeline)?;
        Ok(())
    }

    /// Generate and deliver a response.
    ///
    /// Returns `None` when generation produced nothing usable — the caller
    /// still proceeds to evaluation. A delivery failure propagates and ends
    /// the event; memories of already-delivered chunks remain.
    async fn respond(
        &self,
        event: &InboundEvent,
        ids: ConversationIds,
        state: &State,
    ) -> Result<Option<Vec<Memory>>> {
        let context = compose_context(state, self.templates.reply());

        let mut response = match self
            .runtime
            .generation
            .generate(&context, QualityClass::Quality)
            .await
        {
            Ok(Some(content)) if !content.text.is_empty() => content,
            Ok(_) => {
                warn!("Generation returned no usable content, not responding");
                return Ok(None);
            }
            Err(e) => {
                warn!(error = %e, "Generation failed, not responding");
                return Ok(None);
            }
        };
        response.source = self.transport.name().to_string();

        let delivery = self.delivery(event, ids);
        let memories = delivery.deliver(response).await?;
        Ok(Some(memories))
    }

    fn delivery(&self, event: &InboundEvent, ids: ConversationIds) -> ChunkedDelivery {
        ChunkedDelivery {
            transport: Arc::clone(&self.transport),
            writer: Arc::clone(&self.writer),
            ids,
            chat_id: event.chat.id,
            reply_to: Some(event.message_id),
            in_reply_to: derive_message_id(event.message_id, self.runtime.agent_id()),
        }
    }
}

// ── Deliver-and-record ──────────────────────────────────────────────

/// The orchestrator's deliver-and-record capability: chunk, send in order,
/// persist each chunk's memory only after its send succeeds.
///
/// Also handed to the action processor so follow-up sends go through the
/// same send-then-persist sequence.
pub struct ChunkedDelivery {
    transport: Arc<dyn ChatTransport>,
    writer: Arc<ConversationMemoryWriter>,
    ids: ConversationIds,
    chat_id: i64,
    /// Transport message the first chunk replies to.
    reply_to: Option<i64>,
    /// Memory id of the triggering message, linked from every chunk.
    in_reply_to: Uuid,
}

#[async_trait]
impl DeliverAndRecord for ChunkedDelivery {
    async fn deliver(&self, content: Content) -> std::result::Result<Vec<Memory>, Error> {
        let chunks = split_into_chunks(&content.text, MAX_MESSAGE_LENGTH);
        let total = chunks.len();
        let mut memories = Vec::with_capacity(total);

        for (i, chunk) in chunks.iter().enumerate() {
            let reply_to = if i == 0 { self.reply_to } else { None };
            let sent = self
                .transport
                .send_message(self.chat_id, chunk, reply_to)
                .await?;

            let memory =
                self.writer
                    .outbound_memory(&sent, &content, self.ids, self.in_reply_to, i + 1 == total);
            self.writer.record(&memory).await?;
            memories.push(memory);
        }

        Ok(memories)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
