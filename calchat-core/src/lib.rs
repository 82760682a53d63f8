//! Core of calchat: the tool-calling conversation loop.
//!
//! This crate holds everything that does not talk to the network:
//! - `registry`: the calendar tools offered to the model
//! - `schema` and `dispatch`: argument validation and tool execution
//! - `orchestrator`: the per-turn model/tool loop
//! - `backend` and `model`: the seams implemented by provider crates
//! - `config` and `error`: configuration and the error taxonomy

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod message;
pub mod model;
pub mod orchestrator;
pub mod registry;
pub mod schema;
pub mod tool;

pub use backend::CalendarBackend;
pub use config::AppConfig;
pub use dispatch::Dispatcher;
pub use error::{BackendError, ConfigError, DispatchError, ModelServiceError, RegistryError};
pub use event::{EventRecord, EventTime};
pub use message::{ConversationHistory, ConversationMessage};
pub use model::{ModelRequest, ModelResponse, ModelService, ToolChoice};
pub use orchestrator::{Orchestrator, TurnReport};
pub use registry::{CalendarTool, ToolRegistry};
pub use schema::ArgumentSchema;
pub use tool::{ToolInvocationRequest, ToolPayload, ToolResult, ToolSpec};
