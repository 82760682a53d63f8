//! The language model seam.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ModelServiceError;
use crate::message::ConversationMessage;
use crate::tool::{ToolInvocationRequest, ToolSpec};

/// What the model answered for one submission.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    TextOnly(String),
    WithInvocations(Option<String>, Vec<ToolInvocationRequest>),
}

impl ModelResponse {
    /// A response with an empty invocation list is plain text.
    pub fn from_parts(text: Option<String>, invocations: Vec<ToolInvocationRequest>) -> Self {
        if invocations.is_empty() {
            ModelResponse::TextOnly(text.unwrap_or_default())
        } else {
            ModelResponse::WithInvocations(text, invocations)
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            ModelResponse::TextOnly(text) => Some(text),
            ModelResponse::WithInvocations(text, _) => text.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    #[default]
    Auto,
}

#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub messages: &'a [ConversationMessage],
    pub tools: &'a [ToolSpec],
    pub tool_choice: ToolChoice,
}

#[async_trait]
pub trait ModelService: Send + Sync {
    /// Model identifier, used in logs.
    fn name(&self) -> &str;

    async fn complete(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelServiceError>;
}
