//! Respond/ignore/stop decision for an inbound event.
//!
//! Cheap deterministic rules run first — direct mention, private chat,
//! pure-image — so the classifier model is only consulted for ambiguous
//! text content.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::AgentIdentity;
use crate::pipeline::templates::{TemplateSet, compose_context};
use crate::runtime::generation::{GenerationService, QualityClass};
use crate::runtime::state::State;
use crate::transport::InboundEvent;

/// Classification of an inbound event. Not persisted; computed per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Respond,
    Ignore,
    /// The agent should disengage. Collapsed to "do not respond" at the
    /// call site; any further disengagement is the evaluation step's
    /// concern, not this engine's.
    Stop,
}

impl Decision {
    pub fn should_respond(self) -> bool {
        matches!(self, Decision::Respond)
    }
}

/// Decides whether the agent responds to an inbound event.
pub struct ResponseDecisionEngine {
    generation: Arc<dyn GenerationService>,
    templates: TemplateSet,
    /// Transport handle (without `@`) used for mention detection.
    handle: String,
}

impl ResponseDecisionEngine {
    pub fn new(
        generation: Arc<dyn GenerationService>,
        templates: TemplateSet,
        identity: &AgentIdentity,
    ) -> Self {
        Self {
            generation,
            templates,
            handle: identity.handle.clone(),
        }
    }

    /// Deterministic short-circuit rules in order, then the classifier.
    pub async fn decide(&self, event: &InboundEvent, state: &State) -> Decision {
        // Direct mention of the agent's handle in message text.
        if let Some(text) = event.text() {
            if !self.handle.is_empty() && text.contains(&format!("@{}", self.handle)) {
                debug!("Direct mention, responding");
                return Decision::Respond;
            }
        }

        // One-to-one private conversations always get a response.
        if event.chat.kind.is_private() {
            debug!("Private chat, responding");
            return Decision::Respond;
        }

        // Images alone never trigger a classifier call.
        if event.is_image_only() {
            debug!("Image without text, ignoring");
            return Decision::Ignore;
        }

        // Ambiguous text or caption: ask the classifier.
        if event.visible_text().is_some() {
            return self.classify(state).await;
        }

        Decision::Ignore
    }

    async fn classify(&self, state: &State) -> Decision {
        let context = compose_context(state, self.templates.decision());

        match self.generation.generate(&context, QualityClass::Fast).await {
            Ok(Some(content)) => parse_decision(&content.text).unwrap_or_else(|| {
                warn!(raw = %content.text, "Unparseable classifier output, ignoring");
                Decision::Ignore
            }),
            Ok(None) => {
                warn!("Classifier returned nothing, ignoring");
                Decision::Ignore
            }
            Err(e) => {
                warn!(error = %e, "Classifier call failed, ignoring");
                Decision::Ignore
            }
        }
    }
}

/// Map categorical classifier output onto a decision.
///
/// The first of RESPOND / IGNORE / STOP appearing in the text wins, so
/// bracketed answers and short explanations both parse.
pub fn parse_decision(raw: &str) -> Option<Decision> {
    let upper = raw.to_uppercase();
    let candidates = [
        ("RESPOND", Decision::Respond),
        ("IGNORE", Decision::Ignore),
        ("STOP", Decision::Stop),
    ];

    candidates
        .iter()
        .filter_map(|(token, decision)| upper.find(token).map(|pos| (pos, *decision)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, decision)| decision)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::error::GenerationError;
    use crate::memory::Content;
    use crate::transport::event::{ChatKind, ChatRef, EventPayload, Sender};

    /// Generation stub that returns a fixed answer and counts calls.
    struct FixedClassifier {
        answer: Option<String>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl FixedClassifier {
        fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.into()),
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn silent() -> Self {
            Self {
                answer: None,
                calls: AtomicUsize::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                answer: None,
                calls: AtomicUsize::new(0),
                fail: true,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationService for FixedClassifier {
        async fn generate(
            &self,
            _context: &str,
            _quality: QualityClass,
        ) -> Result<Option<Content>, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GenerationError::RequestFailed {
                    provider: "test".into(),
                    reason: "down".into(),
                });
            }
            Ok(self.answer.as_ref().map(|a| Content::new(a.clone(), "")))
        }
    }

    fn engine(classifier: Arc<FixedClassifier>) -> ResponseDecisionEngine {
        let identity = AgentIdentity::from_account(1, "Assistant", "agent");
        ResponseDecisionEngine::new(classifier, TemplateSet::default(), &identity)
    }

    fn event(kind: ChatKind, payload: Option<EventPayload>) -> InboundEvent {
        InboundEvent {
            message_id: 1,
            chat: ChatRef { id: 10, kind },
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

    fn text_event(kind: ChatKind, text: &str) -> InboundEvent {
        event(kind, Some(EventPayload::Text { text: text.into() }))
    }

    #[tokio::test]
    async fn direct_mention_responds_without_classifier() {
        let classifier = Arc::new(FixedClassifier::answering("[IGNORE]"));
        let engine = engine(Arc::clone(&classifier));
        let event = text_event(ChatKind::Group, "@agent what's the trend?");

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Respond);
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn private_chat_responds_without_classifier() {
        let classifier = Arc::new(FixedClassifier::answering("[IGNORE]"));
        let engine = engine(Arc::clone(&classifier));
        let event = text_event(ChatKind::Private, "hello");

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Respond);
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn private_chat_rule_fires_for_captioned_photo() {
        let classifier = Arc::new(FixedClassifier::answering("[IGNORE]"));
        let engine = engine(Arc::clone(&classifier));
        let event = event(
            ChatKind::Private,
            Some(EventPayload::Photo {
                sizes: vec![],
                caption: Some("chart".into()),
            }),
        );

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Respond);
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn pure_image_in_group_is_ignored_without_classifier() {
        let classifier = Arc::new(FixedClassifier::answering("[RESPOND]"));
        let engine = engine(Arc::clone(&classifier));
        let event = event(
            ChatKind::Group,
            Some(EventPayload::Photo {
                sizes: vec![],
                caption: None,
            }),
        );

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Ignore);
        assert_eq!(classifier.call_count(), 0);
    }

    #[tokio::test]
    async fn group_text_delegates_to_classifier() {
        let classifier = Arc::new(FixedClassifier::answering("[RESPOND]"));
        let engine = engine(Arc::clone(&classifier));
        let event = text_event(ChatKind::Group, "what do you all think?");

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Respond);
        assert_eq!(classifier.call_count(), 1);
    }

    #[tokio::test]
    async fn classifier_stop_maps_to_stop() {
        let classifier = Arc::new(FixedClassifier::answering("[STOP]"));
        let engine = engine(classifier);
        let event = text_event(ChatKind::Group, "be quiet please");

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Stop);
        assert!(!decision.should_respond());
    }

    #[tokio::test]
    async fn classifier_failure_means_ignore() {
        let classifier = Arc::new(FixedClassifier::failing());
        let engine = engine(classifier);
        let event = text_event(ChatKind::Group, "hmm");

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Ignore);
    }

    #[tokio::test]
    async fn classifier_silence_means_ignore() {
        let classifier = Arc::new(FixedClassifier::silent());
        let engine = engine(classifier);
        let event = text_event(ChatKind::Group, "hmm");

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Ignore);
    }

    #[tokio::test]
    async fn payload_without_text_or_image_is_ignored() {
        let classifier = Arc::new(FixedClassifier::answering("[RESPOND]"));
        let engine = engine(Arc::clone(&classifier));
        let event = event(
            ChatKind::Group,
            Some(EventPayload::Document {
                file_id: "f".into(),
                mime_type: Some("application/pdf".into()),
                caption: None,
            }),
        );

        let decision = engine.decide(&event, &State::new()).await;
        assert_eq!(decision, Decision::Ignore);
        assert_eq!(classifier.call_count(), 0);
    }

    #[test]
    fn parse_decision_variants() {
        assert_eq!(parse_decision("[RESPOND]"), Some(Decision::Respond));
        assert_eq!(parse_decision("IGNORE"), Some(Decision::Ignore));
        assert_eq!(parse_decision("stop"), Some(Decision::Stop));
        assert_eq!(parse_decision("I think [STOP] fits"), Some(Decision::Stop));
        assert_eq!(parse_decision("no idea"), None);
    }

    #[test]
    fn parse_decision_first_token_wins() {
        assert_eq!(
            parse_decision("IGNORE (not RESPOND)"),
            Some(Decision::Ignore)
        );
    }
}
