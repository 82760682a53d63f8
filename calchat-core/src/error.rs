//! Error types for calchat.
//!
//! Dispatch-level errors (`DispatchError`, `BackendError`) are turned into
//! tool result payloads and fed back to the model. `ModelServiceError` is
//! the only kind that ends a turn early.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A failed calendar backend call, carrying a human-readable message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BackendError {
    message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        BackendError {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A tool whose parameter schema does not compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid parameter schema for {tool}: {detail}")]
pub struct RegistryError {
    pub tool: String,
    pub detail: String,
}

/// Why a tool invocation could not produce events.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Unknown function: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {detail}")]
    Schema { tool: String, detail: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("Calendar request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Failure of the language model call itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelServiceError {
    #[error("Model request failed: {0}")]
    Transport(String),

    #[error("Model service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed model response: {0}")]
    Malformed(String),

    #[error("Model request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read config file at {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to write config file at {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
