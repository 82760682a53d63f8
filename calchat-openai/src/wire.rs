//! Request and response bodies for `POST /chat/completions`.

use calchat_core::{ConversationMessage, ToolChoice, ToolInvocationRequest, ToolSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Serialize)]
pub struct WireTool<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: &'a ToolSpec,
}

impl<'a> From<&'a ToolSpec> for WireTool<'a> {
    fn from(spec: &'a ToolSpec) -> Self {
        WireTool {
            kind: "function",
            function: spec,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum WireMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<WireToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl From<&ConversationMessage> for WireMessage {
    fn from(message: &ConversationMessage) -> Self {
        match message {
            ConversationMessage::System { content } => WireMessage::System {
                content: content.clone(),
            },
            ConversationMessage::User { content } => WireMessage::User {
                content: content.clone(),
            },
            ConversationMessage::Assistant {
                content,
                invocations,
            } => WireMessage::Assistant {
                content: content.clone(),
                tool_calls: invocations.iter().map(WireToolCall::from).collect(),
            },
            ConversationMessage::ToolResult(result) => WireMessage::Tool {
                tool_call_id: result.invocation_id.clone(),
                content: result.payload.to_json_string(),
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WireToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

/// `arguments` is JSON text, not a JSON object.
#[derive(Debug, Serialize, Deserialize)]
pub struct WireFunction {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

impl From<&ToolInvocationRequest> for WireToolCall {
    fn from(request: &ToolInvocationRequest) -> Self {
        let arguments = match &request.arguments {
            // Unparseable arguments were kept as the raw text
            Value::String(raw) => raw.clone(),
            Value::Null => "{}".to_string(),
            other => other.to_string(),
        };

        WireToolCall {
            id: request.id.clone(),
            kind: function_kind(),
            function: WireFunction {
                name: request.name.clone(),
                arguments,
            },
        }
    }
}

impl From<WireToolCall> for ToolInvocationRequest {
    fn from(call: WireToolCall) -> Self {
        let raw = call.function.arguments;
        let arguments = if raw.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&raw).unwrap_or(Value::String(raw))
        };

        ToolInvocationRequest::new(call.id, call.function.name, arguments)
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<WireToolCall>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use calchat_core::{ToolPayload, ToolResult};
    use serde_json::json;

    #[test]
    fn assistant_tool_calls_encode_arguments_as_text() {
        let message = ConversationMessage::assistant(
            None,
            vec![ToolInvocationRequest::new("call_1", "search_events", json!({"query": "John"}))],
        );

        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(
            wire,
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "search_events", "arguments": "{\"query\":\"John\"}"}
                }]
            })
        );
    }

    #[test]
    fn tool_results_carry_call_id_and_json_payload() {
        let result = ToolResult::new("call_1", ToolPayload::error("boom"));
        let message = ConversationMessage::ToolResult(result);

        let wire = serde_json::to_value(WireMessage::from(&message)).unwrap();
        assert_eq!(
            wire,
            json!({"role": "tool", "tool_call_id": "call_1", "content": "{\"error\":\"boom\"}"})
        );
    }

    #[test]
    fn unparseable_arguments_are_kept_as_text() {
        let call: WireToolCall = serde_json::from_value(json!({
            "id": "c",
            "type": "function",
            "function": {"name": "search_events", "arguments": "{query: John"}
        }))
        .unwrap();

        let request = ToolInvocationRequest::from(call);
        assert_eq!(request.arguments, Value::String("{query: John".into()));
    }
}
