//! Conversation messages and the per-turn history.

use crate::tool::{ToolInvocationRequest, ToolResult};

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        invocations: Vec<ToolInvocationRequest>,
    },
    ToolResult(ToolResult),
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ConversationMessage::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ConversationMessage::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: Option<String>, invocations: Vec<ToolInvocationRequest>) -> Self {
        ConversationMessage::Assistant {
            content,
            invocations,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            ConversationMessage::System { .. } => "system",
            ConversationMessage::User { .. } => "user",
            ConversationMessage::Assistant { .. } => "assistant",
            ConversationMessage::ToolResult(_) => "tool",
        }
    }
}

/// Append-only message sequence for one user turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    /// Start a turn: the system prompt followed by the user's message.
    pub fn start(system_prompt: &str, user_text: &str) -> Self {
        ConversationHistory {
            messages: vec![
                ConversationMessage::system(system_prompt),
                ConversationMessage::user(user_text),
            ],
        }
    }

    pub fn push(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ConversationMessage> {
        self.messages.last()
    }

    /// Every invocation id requested by the model so far, in order.
    pub fn requested_ids(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                ConversationMessage::Assistant { invocations, .. } => Some(invocations),
                _ => None,
            })
            .flatten()
            .map(|i| i.id.as_str())
            .collect()
    }

    /// Every invocation id answered by a tool result so far, in order.
    pub fn answered_ids(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                ConversationMessage::ToolResult(r) => Some(r.invocation_id.as_str()),
                _ => None,
            })
            .collect()
    }
}
