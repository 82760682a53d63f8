//! `ModelService` backed by an OpenAI-compatible chat completions API.

mod wire;

use async_trait::async_trait;
use calchat_core::{
    ModelRequest, ModelResponse, ModelService, ModelServiceError, ToolInvocationRequest,
};
use tracing::debug;

use crate::wire::{ChatRequest, ChatResponse, WireMessage, WireTool};

pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiChat {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        OpenAiChat {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn parse_response(body: &str) -> Result<ModelResponse, ModelServiceError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ModelServiceError::Malformed(e.to_string()))?;

    let message = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelServiceError::Malformed("response has no choices".into()))?
        .message;

    let invocations: Vec<ToolInvocationRequest> = message
        .tool_calls
        .into_iter()
        .map(ToolInvocationRequest::from)
        .collect();

    Ok(ModelResponse::from_parts(message.content, invocations))
}

#[async_trait]
impl ModelService for OpenAiChat {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: ModelRequest<'_>,
    ) -> Result<ModelResponse, ModelServiceError> {
        let tools: Vec<WireTool<'_>> = request.tools.iter().map(WireTool::from).collect();
        let tool_choice = (!tools.is_empty()).then_some(request.tool_choice);
        let body = ChatRequest {
            model: &self.model,
            messages: request.messages.iter().map(WireMessage::from).collect(),
            tools,
            tool_choice,
        };

        debug!(model = %self.model, messages = body.messages.len(), "POST chat/completions");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelServiceError::Transport(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ModelServiceError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelServiceError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_response(&text)
    }
}
