//! One user turn: model call, tool dispatch, resubmission.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::dispatch::Dispatcher;
use crate::error::ModelServiceError;
use crate::message::{ConversationHistory, ConversationMessage};
use crate::model::{ModelRequest, ModelResponse, ModelService, ToolChoice};
use crate::tool::ToolInvocationRequest;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that can access \
Google Calendar. You can get upcoming events and search for events. When asked about \
calendar events, use the available tools to provide accurate information.";

pub const DEFAULT_MAX_TOOL_HOPS: u32 = 1;
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// What a turn produced besides the answer text.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub answer: String,
    pub history: ConversationHistory,
    /// Completed rounds of tool dispatch.
    pub tool_hops: u32,
}

#[derive(Debug)]
enum TurnState {
    AwaitingModel,
    HasToolRequests(Vec<ToolInvocationRequest>),
    Done(String),
}

impl TurnState {
    fn label(&self) -> &'static str {
        match self {
            TurnState::AwaitingModel => "awaiting_model",
            TurnState::HasToolRequests(_) => "has_tool_requests",
            TurnState::Done(_) => "done",
        }
    }
}

pub struct Orchestrator {
    model: Arc<dyn ModelService>,
    dispatcher: Dispatcher,
    system_prompt: String,
    max_tool_hops: u32,
    model_timeout: Duration,
}

impl Orchestrator {
    pub fn new(model: Arc<dyn ModelService>, dispatcher: Dispatcher) -> Self {
        Orchestrator {
            model,
            dispatcher,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_tool_hops: DEFAULT_MAX_TOOL_HOPS,
            model_timeout: DEFAULT_MODEL_TIMEOUT,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Rounds of tool dispatch per turn. Never below one.
    pub fn with_max_tool_hops(mut self, hops: u32) -> Self {
        self.max_tool_hops = hops.max(1);
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = timeout;
        self
    }

    /// Run a turn and return the answer. Model failures become the answer
    /// text instead of an error.
    pub async fn submit_turn(&self, user_text: &str) -> String {
        match self.run_turn(user_text).await {
            Ok(report) => report.answer,
            Err(e) => {
                warn!(model = %self.model.name(), error = %e, "Turn failed");
                format!("An error occurred: {}", e)
            }
        }
    }

    pub async fn run_turn(&self, user_text: &str) -> Result<TurnReport, ModelServiceError> {
        let mut history = ConversationHistory::start(&self.system_prompt, user_text);
        let mut tool_hops = 0;
        let mut state = TurnState::AwaitingModel;

        loop {
            debug!(state = state.label(), tool_hops, "Turn state");

            state = match state {
                TurnState::AwaitingModel => match self.complete(&history).await? {
                    ModelResponse::TextOnly(text) => {
                        let message = ConversationMessage::assistant(Some(text.clone()), vec![]);
                        history.push(message);
                        TurnState::Done(text)
                    }
                    ModelResponse::WithInvocations(text, invocations) => {
                        let message =
                            ConversationMessage::assistant(text.clone(), invocations.clone());
                        history.push(message);

                        if tool_hops >= self.max_tool_hops {
                            warn!(
                                requested = invocations.len(),
                                max_tool_hops = self.max_tool_hops,
                                "Tool hop limit reached; ignoring further tool requests"
                            );
                            TurnState::Done(text.unwrap_or_default())
                        } else {
                            TurnState::HasToolRequests(invocations)
                        }
                    }
                },
                TurnState::HasToolRequests(invocations) => {
                    info!(count = invocations.len(), "Dispatching tool calls");
                    let results = self.dispatcher.dispatch_all(&invocations).await;
                    for result in results {
                        history.push(ConversationMessage::ToolResult(result));
                    }
                    tool_hops += 1;
                    TurnState::AwaitingModel
                }
                TurnState::Done(answer) => {
                    return Ok(TurnReport {
                        answer,
                        history,
                        tool_hops,
                    });
                }
            };
        }
    }

    async fn complete(
        &self,
        history: &ConversationHistory,
    ) -> Result<ModelResponse, ModelServiceError> {
        let request = ModelRequest {
            messages: history.messages(),
            tools: self.dispatcher.registry().list_tools(),
            tool_choice: ToolChoice::Auto,
        };

        debug!(model = %self.model.name(), messages = history.len(), "Submitting to model");

        tokio::time::timeout(self.model_timeout, self.model.complete(request))
            .await
            .map_err(|_| ModelServiceError::Timeout(self.model_timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CalendarBackend;
    use crate::error::BackendError;
    use crate::event::EventRecord;
    use crate::registry::ToolRegistry;
    use crate::tool::ToolPayload;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EmptyBackend;

    #[async_trait]
    impl CalendarBackend for EmptyBackend {
        async fn fetch_upcoming(&self, _: &str, _: u32) -> Result<Vec<EventRecord>, BackendError> {
            Ok(vec![])
        }

        async fn search_events(
            &self,
            _: &str,
            _: &str,
            _: u32,
        ) -> Result<Vec<EventRecord>, BackendError> {
            Ok(vec![])
        }
    }

    /// Plays back canned responses and keeps a copy of each submission.
    struct ScriptedModel {
        responses: Mutex<Vec<Result<ModelResponse, ModelServiceError>>>,
        seen: Mutex<Vec<Vec<ConversationMessage>>>,
    }

    impl ScriptedModel {
        fn new(mut responses: Vec<Result<ModelResponse, ModelServiceError>>) -> Arc<Self> {
            responses.reverse();
            Arc::new(ScriptedModel {
                responses: Mutex::new(responses),
                seen: Mutex::new(vec![]),
            })
        }
    }

    #[async_trait]
    impl ModelService for ScriptedModel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            request: ModelRequest<'_>,
        ) -> Result<ModelResponse, ModelServiceError> {
            self.seen.lock().unwrap().push(request.messages.to_vec());
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ModelServiceError::Malformed("script exhausted".into())))
        }
    }

    fn dispatcher(backend: Arc<dyn CalendarBackend>) -> Dispatcher {
        Dispatcher::new(Arc::new(ToolRegistry::calendar().unwrap()), backend)
    }

    fn orchestrator(model: Arc<ScriptedModel>) -> Orchestrator {
        Orchestrator::new(model, dispatcher(Arc::new(EmptyBackend)))
    }

    fn call(id: &str) -> ToolInvocationRequest {
        ToolInvocationRequest::new(id, "get_upcoming_events", json!({}))
    }

    #[tokio::test]
    async fn text_only_response_ends_the_turn() {
        let model = ScriptedModel::new(vec![Ok(ModelResponse::TextOnly("Hello!".into()))]);

        let report = orchestrator(model.clone()).run_turn("hi").await.unwrap();

        assert_eq!(report.answer, "Hello!");
        assert_eq!(report.tool_hops, 0);
        assert_eq!(model.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn every_request_is_answered_before_resubmission() {
        let model = ScriptedModel::new(vec![
            Ok(ModelResponse::WithInvocations(None, vec![call("c1"), call("c2")])),
            Ok(ModelResponse::TextOnly("Nothing scheduled.".into())),
        ]);

        let report = orchestrator(model.clone())
            .run_turn("what's next?")
            .await
            .unwrap();

        assert_eq!(report.answer, "Nothing scheduled.");
        let seen = model.seen.lock().unwrap();
        let second = &seen[1];
        let roles: Vec<_> = second.iter().map(|m| m.role()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "tool", "tool"]);
        assert_eq!(report.history.requested_ids(), report.history.answered_ids());
    }

    #[tokio::test]
    async fn requests_past_the_hop_limit_are_not_dispatched() {
        let model = ScriptedModel::new(vec![
            Ok(ModelResponse::WithInvocations(None, vec![call("c1")])),
            Ok(ModelResponse::WithInvocations(
                Some("Partial answer".into()),
                vec![call("c2")],
            )),
        ]);

        let report = orchestrator(model).run_turn("hi").await.unwrap();

        assert_eq!(report.answer, "Partial answer");
        assert_eq!(report.tool_hops, 1);
        assert_eq!(report.history.answered_ids(), ["c1"]);
    }

    #[tokio::test]
    async fn raised_hop_limit_allows_chained_calls() {
        let model = ScriptedModel::new(vec![
            Ok(ModelResponse::WithInvocations(None, vec![call("c1")])),
            Ok(ModelResponse::WithInvocations(None, vec![call("c2")])),
            Ok(ModelResponse::TextOnly("Done".into())),
        ]);

        let report = orchestrator(model)
            .with_max_tool_hops(2)
            .run_turn("hi")
            .await
            .unwrap();

        assert_eq!(report.answer, "Done");
        assert_eq!(report.tool_hops, 2);
        assert_eq!(report.history.answered_ids(), ["c1", "c2"]);
    }

    #[tokio::test]
    async fn model_failure_becomes_terminal_string() {
        let model = ScriptedModel::new(vec![Err(ModelServiceError::Transport(
            "connection refused".into(),
        ))]);

        let answer = orchestrator(model).submit_turn("hi").await;

        assert_eq!(answer, "An error occurred: Model request failed: connection refused");
    }

    #[tokio::test]
    async fn tool_results_carry_payload_json() {
        let model = ScriptedModel::new(vec![
            Ok(ModelResponse::WithInvocations(
                None,
                vec![ToolInvocationRequest::new("c1", "registerEvent", json!({}))],
            )),
            Ok(ModelResponse::TextOnly("I can't do that.".into())),
        ]);

        let report = orchestrator(model).run_turn("book lunch").await.unwrap();

        let tool_message = report
            .history
            .messages()
            .iter()
            .find_map(|m| match m {
                ConversationMessage::ToolResult(r) => Some(r.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(tool_message.payload, ToolPayload::error("Unknown function: registerEvent"));
    }

    #[tokio::test]
    async fn custom_system_prompt_leads_the_history() {
        let model = ScriptedModel::new(vec![Ok(ModelResponse::TextOnly("ok".into()))]);

        let report = orchestrator(model)
            .with_system_prompt("Be brief.")
            .run_turn("hi")
            .await
            .unwrap();

        assert_eq!(report.history.messages()[0], ConversationMessage::system("Be brief."));
    }

    #[tokio::test]
    async fn zero_hop_limit_still_dispatches_one_round() {
        let model = ScriptedModel::new(vec![
            Ok(ModelResponse::WithInvocations(None, vec![call("c1")])),
            Ok(ModelResponse::TextOnly("Nothing scheduled.".into())),
        ]);

        let report = orchestrator(model)
            .with_max_tool_hops(0)
            .run_turn("what's next?")
            .await
            .unwrap();

        assert_eq!(report.answer, "Nothing scheduled.");
        assert_eq!(report.tool_hops, 1);
        assert_eq!(report.history.answered_ids(), ["c1"]);
    }

    /// Never answers in time.
    struct StalledModel;

    #[async_trait]
    impl ModelService for StalledModel {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn complete(
            &self,
            _request: ModelRequest<'_>,
        ) -> Result<ModelResponse, ModelServiceError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(ModelResponse::TextOnly("too late".into()))
        }
    }

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CalendarBackend for CountingBackend {
        async fn fetch_upcoming(&self, _: &str, _: u32) -> Result<Vec<EventRecord>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        async fn search_events(
            &self,
            _: &str,
            _: &str,
            _: u32,
        ) -> Result<Vec<EventRecord>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn slow_model_times_out_without_touching_the_backend() {
        let backend = Arc::new(CountingBackend::default());
        let orchestrator = Orchestrator::new(Arc::new(StalledModel), dispatcher(backend.clone()))
            .with_model_timeout(Duration::from_millis(20));

        let answer = orchestrator.submit_turn("what's next?").await;

        assert_eq!(answer, "An error occurred: Model request timed out after 20ms");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
