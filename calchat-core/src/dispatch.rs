//! Turns tool invocation requests into tool results.
//!
//! Every outcome is a `ToolResult`: unknown tools, bad arguments, backend
//! failures and timeouts become `{"error": ...}` payloads for the model.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::CalendarBackend;
use crate::error::DispatchError;
use crate::event::{self, EventRecord};
use crate::registry::{CalendarTool, DEFAULT_CALENDAR_ID, DEFAULT_MAX_RESULTS, ToolRegistry};
use crate::tool::{ToolInvocationRequest, ToolPayload, ToolResult};

pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct UpcomingArgs {
    #[serde(default = "default_max_results")]
    max_results: u32,
    #[serde(default = "default_calendar_id")]
    calendar_id: String,
}

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default = "default_max_results")]
    max_results: u32,
    #[serde(default = "default_calendar_id")]
    calendar_id: String,
}

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

fn default_calendar_id() -> String {
    DEFAULT_CALENDAR_ID.to_string()
}

#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    backend: Arc<dyn CalendarBackend>,
    backend_timeout: Duration,
}

impl Dispatcher {
    pub fn new(registry: Arc<ToolRegistry>, backend: Arc<dyn CalendarBackend>) -> Self {
        Dispatcher {
            registry,
            backend,
            backend_timeout: DEFAULT_BACKEND_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, backend_timeout: Duration) -> Self {
        self.backend_timeout = backend_timeout;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute one request. Never fails: errors are carried in the payload.
    pub async fn dispatch(&self, request: &ToolInvocationRequest) -> ToolResult {
        let payload = match self.execute(request).await {
            Ok(events) => {
                debug!(
                    tool = %request.name,
                    id = %request.id,
                    count = events.len(),
                    "Tool call succeeded"
                );
                ToolPayload::Events(events)
            }
            Err(e) => {
                warn!(tool = %request.name, id = %request.id, error = %e, "Tool call failed");
                ToolPayload::error(e.to_string())
            }
        };

        ToolResult::new(request.id.clone(), payload)
    }

    /// Execute a batch concurrently. Results come back in request order.
    pub async fn dispatch_all(&self, requests: &[ToolInvocationRequest]) -> Vec<ToolResult> {
        join_all(requests.iter().map(|request| self.dispatch(request))).await
    }

    async fn execute(
        &self,
        request: &ToolInvocationRequest,
    ) -> Result<Vec<EventRecord>, DispatchError> {
        let (tool, schema) = self
            .registry
            .resolve(&request.name)
            .ok_or_else(|| DispatchError::UnknownTool(request.name.clone()))?;

        let arguments = schema
            .validate(&request.arguments)
            .map_err(|detail| DispatchError::Schema {
                tool: request.name.clone(),
                detail,
            })?;

        let call = self.call_backend(tool, arguments);
        let mut events = tokio::time::timeout(self.backend_timeout, call)
            .await
            .map_err(|_| DispatchError::Timeout(self.backend_timeout))??;

        event::sort_by_start(&mut events);
        Ok(events)
    }

    async fn call_backend(
        &self,
        tool: CalendarTool,
        arguments: Value,
    ) -> Result<Vec<EventRecord>, DispatchError> {
        let events = match tool {
            CalendarTool::GetUpcomingEvents => {
                let args: UpcomingArgs = typed(tool, arguments)?;
                self.backend
                    .fetch_upcoming(&args.calendar_id, args.max_results)
                    .await?
            }
            CalendarTool::SearchEvents => {
                let args: SearchArgs = typed(tool, arguments)?;
                self.backend
                    .search_events(&args.calendar_id, &args.query, args.max_results)
                    .await?
            }
        };
        Ok(events)
    }
}

/// Deserialize validated arguments; serde fills in the defaults.
fn typed<T: DeserializeOwned>(tool: CalendarTool, arguments: Value) -> Result<T, DispatchError> {
    serde_json::from_value(arguments).map_err(|e| DispatchError::Schema {
        tool: tool.name().to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::event::EventTime;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(hour: u32) -> EventTime {
        EventTime::DateTime(Utc.with_ymd_and_hms(2025, 3, 20, hour, 0, 0).unwrap())
    }

    /// Returns its events in the order given; records every call.
    #[derive(Default)]
    struct RecordingBackend {
        events: Vec<EventRecord>,
        calls: AtomicUsize,
        last_call: Mutex<Option<(String, Option<String>, u32)>>,
        fail_with: Option<String>,
        delay: Option<Duration>,
    }

    #[async_trait]
    impl CalendarBackend for RecordingBackend {
        async fn fetch_upcoming(
            &self,
            calendar_id: &str,
            max_results: u32,
        ) -> Result<Vec<EventRecord>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_call.lock().unwrap() = Some((calendar_id.to_string(), None, max_results));
            self.respond().await
        }

        async fn search_events(
            &self,
            calendar_id: &str,
            query: &str,
            max_results: u32,
        ) -> Result<Vec<EventRecord>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_call.lock().unwrap() =
                Some((calendar_id.to_string(), Some(query.to_string()), max_results));
            self.respond().await
        }
    }

    impl RecordingBackend {
        async fn respond(&self) -> Result<Vec<EventRecord>, BackendError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.fail_with {
                Some(message) => Err(BackendError::new(message.clone())),
                None => Ok(self.events.clone()),
            }
        }
    }

    fn dispatcher(backend: Arc<RecordingBackend>) -> Dispatcher {
        Dispatcher::new(Arc::new(ToolRegistry::calendar().unwrap()), backend)
    }

    #[tokio::test]
    async fn upcoming_results_are_sorted_by_start() {
        let backend = Arc::new(RecordingBackend {
            events: vec![
                EventRecord::new("late", "Review", at(16), at(17)),
                EventRecord::new("early", "Standup", at(9), at(10)),
            ],
            ..Default::default()
        });
        let request =
            ToolInvocationRequest::new("call_1", "get_upcoming_events", json!({"max_results": 2}));

        let result = dispatcher(backend.clone()).dispatch(&request).await;

        assert_eq!(result.invocation_id, "call_1");
        let events = result.payload.events().unwrap();
        let ids: Vec<_> = events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["early", "late"]);
        assert_eq!(
            *backend.last_call.lock().unwrap(),
            Some(("primary".to_string(), None, 2))
        );
    }

    #[tokio::test]
    async fn search_passes_query_and_defaults() {
        let backend = Arc::new(RecordingBackend::default());
        let request = ToolInvocationRequest::new("c", "search_events", json!({"query": "dentist"}));

        let result = dispatcher(backend.clone()).dispatch(&request).await;

        assert_eq!(result.payload, ToolPayload::Events(vec![]));
        assert_eq!(
            *backend.last_call.lock().unwrap(),
            Some(("primary".to_string(), Some("dentist".to_string()), 10))
        );
    }

    #[tokio::test]
    async fn unknown_tool_never_reaches_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let request = ToolInvocationRequest::new("c", "registerEvent", json!({}));

        let result = dispatcher(backend.clone()).dispatch(&request).await;

        assert_eq!(result.payload, ToolPayload::error("Unknown function: registerEvent"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_query_is_a_schema_error() {
        let backend = Arc::new(RecordingBackend::default());
        let request = ToolInvocationRequest::new("c", "search_events", json!({"max_results": 3}));

        let result = dispatcher(backend.clone()).dispatch(&request).await;

        let expected = r#"Invalid arguments for search_events: "query" is a required property"#;
        assert_eq!(result.payload, ToolPayload::error(expected));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let backend = Arc::new(RecordingBackend::default());
        let request = ToolInvocationRequest::new("c", "get_upcoming_events", json!([1, 2]));

        let result = dispatcher(backend.clone()).dispatch(&request).await;

        assert_eq!(
            result.payload,
            ToolPayload::error(
                "Invalid arguments for get_upcoming_events: arguments must be a JSON object"
            )
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn backend_failure_becomes_error_payload() {
        let backend = Arc::new(RecordingBackend {
            fail_with: Some("An error occurred: 403 Forbidden".into()),
            ..Default::default()
        });
        let request = ToolInvocationRequest::new("c", "get_upcoming_events", json!({}));

        let result = dispatcher(backend).dispatch(&request).await;

        assert_eq!(result.payload, ToolPayload::error("An error occurred: 403 Forbidden"));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let backend = Arc::new(RecordingBackend {
            delay: Some(Duration::from_secs(5)),
            ..Default::default()
        });
        let request = ToolInvocationRequest::new("c", "get_upcoming_events", json!({}));

        let result = dispatcher(backend)
            .with_timeout(Duration::from_millis(20))
            .dispatch(&request)
            .await;

        assert_eq!(result.payload, ToolPayload::error("Calendar request timed out after 20ms"));
    }

    #[tokio::test]
    async fn batch_keeps_request_order_and_isolates_failures() {
        let backend = Arc::new(RecordingBackend {
            events: vec![EventRecord::new("e1", "Lunch", at(12), at(13))],
            ..Default::default()
        });
        let requests = vec![
            ToolInvocationRequest::new("a", "get_upcoming_events", json!({})),
            ToolInvocationRequest::new("b", "nope", json!({})),
            ToolInvocationRequest::new("c", "search_events", json!({"query": "Lunch"})),
        ];

        let results = dispatcher(backend.clone()).dispatch_all(&requests).await;

        let ids: Vec<_> = results.iter().map(|r| r.invocation_id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(!results[0].payload.is_error());
        assert!(results[1].payload.is_error());
        assert!(!results[2].payload.is_error());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn repeated_dispatch_is_idempotent() {
        let backend = Arc::new(RecordingBackend {
            events: vec![
                EventRecord::new("x", "B", at(11), at(12)),
                EventRecord::new("y", "A", at(10), at(11)),
            ],
            ..Default::default()
        });
        let dispatcher = dispatcher(backend);
        let request =
            ToolInvocationRequest::new("c", "get_upcoming_events", json!({"max_results": 5}));

        let first = dispatcher.dispatch(&request).await;
        let second = dispatcher.dispatch(&request).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn coerced_arguments_reach_the_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let request = ToolInvocationRequest::new(
            "c",
            "search_events",
            json!({"query": "dentist", "max_results": "3", "calendar_id": null}),
        );

        let result = dispatcher(backend.clone()).dispatch(&request).await;

        assert!(!result.payload.is_error());
        assert_eq!(
            *backend.last_call.lock().unwrap(),
            Some(("primary".to_string(), Some("dentist".to_string()), 3))
        );
    }

    #[tokio::test]
    async fn zero_max_results_is_rejected_before_the_backend() {
        let backend = Arc::new(RecordingBackend::default());
        let request =
            ToolInvocationRequest::new("c", "get_upcoming_events", json!({"max_results": 0}));

        let result = dispatcher(backend.clone()).dispatch(&request).await;

        assert!(result.payload.is_error());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
