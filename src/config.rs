//! Configuration types.
//!
//! Consumed by the pipeline, owned by the bootstrap layer: the agent's
//! identity, message-filtering policy, and per-character template overrides.

use uuid::Uuid;

use crate::memory::derive_user_id;

/// Who the agent is on the transport.
#[derive(Debug, Clone)]
pub struct AgentIdentity {
    /// Stable agent id used to salt room and message ids.
    pub id: Uuid,
    /// Display name, substituted into prompt templates.
    pub name: String,
    /// Transport handle (without the leading `@`) used for mention detection.
    pub handle: String,
}

impl AgentIdentity {
    /// Derive the agent identity from a transport account id and handle.
    ///
    /// The agent id is stable across restarts for the same account.
    pub fn from_account(account_id: i64, name: impl Into<String>, handle: impl Into<String>) -> Self {
        Self {
            id: derive_user_id(account_id),
            name: name.into(),
            handle: handle.into(),
        }
    }
}

/// Filtering policy applied before any processing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePolicy {
    /// Drop messages sent by other bots.
    pub ignore_bot_messages: bool,
    /// Drop messages from one-to-one private chats.
    pub ignore_direct_messages: bool,
}

/// Character-supplied prompt template overrides.
///
/// `None` means "use the built-in default"; the ordered lookup lives in
/// [`crate::pipeline::templates::TemplateSet`].
#[derive(Debug, Clone, Default)]
pub struct TemplateOverrides {
    /// Override for the respond/ignore/stop decision prompt.
    pub decision: Option<String>,
    /// Override for the reply-generation prompt.
    pub reply: Option<String>,
}

/// Agent configuration handed to the orchestrator.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub identity: AgentIdentity,
    pub policy: MessagePolicy,
    pub templates: TemplateOverrides,
}

impl AgentConfig {
    pub fn new(identity: AgentIdentity) -> Self {
        Self {
            identity,
            policy: MessagePolicy::default(),
            templates: TemplateOverrides::default(),
        }
    }

    pub fn with_policy(mut self, policy: MessagePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_templates(mut self, templates: TemplateOverrides) -> Self {
        self.templates = templates;
        self
    }
}
