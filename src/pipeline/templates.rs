//! Prompt templates and context composition.
//!
//! Templates carry `{{placeholder}}` slots filled from the `State`
//! snapshot. Character-supplied overrides take precedence over the
//! built-in defaults through one explicit lookup, `TemplateSet`.

use regex::Regex;

use crate::config::TemplateOverrides;
use crate::runtime::state::State;

/// Built-in respond/ignore/stop decision template.
pub const DEFAULT_DECISION_TEMPLATE: &str = "\
# Task: Decide whether {{agentName}} should respond to the last message.

{{agentName}} is in a chat with other users and should only respond when \
addressed directly or when the conversation is clearly relevant to it.

Response options are [RESPOND], [IGNORE] and [STOP].

- If a message is not addressed to {{agentName}} and is not relevant, choose [IGNORE].
- If a user asks {{agentName}} to be quiet or the conversation has moved on without it, choose [STOP].
- If {{agentName}} is mid-conversation with a user and they have not asked it to stop, choose [RESPOND].
- If in doubt, prefer [IGNORE].

Recent messages:
{{recentMessages}}

Conversation thread:
{{formattedConversation}}

# INSTRUCTIONS: Choose the option that best describes how {{agentName}} should \
react to the last message. Respond with only one of [RESPOND], [IGNORE] or [STOP].";

/// Built-in reply-generation template.
pub const DEFAULT_REPLY_TEMPLATE: &str = "\
# Task: Generate a reply in the voice and style of {{agentName}}.

Recent messages:
{{recentMessages}}

Conversation thread:
{{formattedConversation}}

# INSTRUCTIONS: Write {{agentName}}'s reply to the last message. Respond with \
ONLY a JSON object: {\"text\": \"<the reply>\", \"action\": \"<optional action name>\"}. \
Omit \"action\" unless one applies.";

/// Ordered template lookup: character override first, built-in default last.
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    decision_override: Option<String>,
    reply_override: Option<String>,
}

impl TemplateSet {
    pub fn from_overrides(overrides: &TemplateOverrides) -> Self {
        Self {
            decision_override: overrides.decision.clone(),
            reply_override: overrides.reply.clone(),
        }
    }

    /// The decision template in effect.
    pub fn decision(&self) -> &str {
        self.decision_override
            .as_deref()
            .unwrap_or(DEFAULT_DECISION_TEMPLATE)
    }

    /// The reply template in effect.
    pub fn reply(&self) -> &str {
        self.reply_override
            .as_deref()
            .unwrap_or(DEFAULT_REPLY_TEMPLATE)
    }
}

/// Fill a template's `{{placeholder}}` slots from the state snapshot.
///
/// Missing keys and non-string values substitute as empty strings.
pub fn compose_context(state: &State, template: &str) -> String {
    let placeholder = Regex::new(r"\{\{(\w+)\}\}").expect("static regex");
    placeholder
        .replace_all(template, |caps: &regex::Captures<'_>| {
            state.get_str(&caps[1]).unwrap_or_default().to_string()
        })
        .into_owned()
}

// ── Tests ───────────────────────────────────────────────────────────
