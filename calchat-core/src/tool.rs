//! Tool declarations, invocation requests and their results.

use serde::{Deserialize, Serialize};

use crate::event::EventRecord;

/// A capability offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON-Schema-like object describing the arguments.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the model.
///
/// `id` is opaque and must come back unchanged on the matching `ToolResult`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocationRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolInvocationRequest {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        ToolInvocationRequest {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Either the events a tool produced or an error the model should see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolPayload {
    Events(Vec<EventRecord>),
    Error { error: String },
}

impl ToolPayload {
    pub fn error(message: impl Into<String>) -> Self {
        ToolPayload::Error {
            error: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolPayload::Error { .. })
    }

    pub fn events(&self) -> Option<&[EventRecord]> {
        match self {
            ToolPayload::Events(events) => Some(events),
            ToolPayload::Error { .. } => None,
        }
    }

    /// JSON text sent back to the model as the tool message content.
    pub fn to_json_string(&self) -> String {
        match serde_json::to_string(self) {
            Ok(s) => s,
            Err(e) => format!("{{\"error\":\"Failed to serialize tool result: {}\"}}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub invocation_id: String,
    pub payload: ToolPayload,
}

impl ToolResult {
    pub fn new(invocation_id: impl Into<String>, payload: ToolPayload) -> Self {
        ToolResult {
            invocation_id: invocation_id.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_payload_serializes_as_error_object() {
        let payload = ToolPayload::error("Unknown function: registerEvent");
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"error": "Unknown function: registerEvent"})
        );
        assert!(payload.is_error());
        assert!(payload.events().is_none());
    }

    #[test]
    fn empty_event_list_serializes_as_empty_array() {
        let payload = ToolPayload::Events(vec![]);
        assert_eq!(payload.to_json_string(), "[]");
        assert_eq!(payload.events(), Some(&[][..]));
    }

    #[test]
    fn payload_reads_back_from_wire_json() {
        let payload: ToolPayload = serde_json::from_str(r#"{"error":"boom"}"#).unwrap();
        assert_eq!(payload, ToolPayload::error("boom"));

        let payload: ToolPayload = serde_json::from_str("[]").unwrap();
        assert_eq!(payload, ToolPayload::Events(vec![]));
    }
}
