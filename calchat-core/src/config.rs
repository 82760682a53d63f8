//! Global calchat configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::orchestrator::DEFAULT_MAX_TOOL_HOPS;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const DEFAULT_CONFIG: &str = r#"# calchat configuration

# Chat model and OpenAI-compatible endpoint.
# The MODEL and OPENAI_BASE_URL environment variables override these.
model = "gpt-3.5-turbo"
base_url = "https://api.openai.com/v1"

# Rounds of tool calls allowed per question before the model must answer.
# At least 1.
max_tool_hops = 1

# Request timeouts, in seconds.
model_timeout_secs = 60
backend_timeout_secs = 15

# Replace the built-in system prompt.
# system_prompt = "You are a helpful assistant that can access Google Calendar."
"#;

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_max_tool_hops() -> u32 {
    DEFAULT_MAX_TOOL_HOPS
}

fn default_model_timeout_secs() -> u64 {
    60
}

fn default_backend_timeout_secs() -> u64 {
    15
}

/// Configuration at ~/.config/calchat/config.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_tool_hops")]
    pub max_tool_hops: u32,

    #[serde(default = "default_model_timeout_secs")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_backend_timeout_secs")]
    pub backend_timeout_secs: u64,

    pub system_prompt: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            model: default_model(),
            base_url: default_base_url(),
            max_tool_hops: default_max_tool_hops(),
            model_timeout_secs: default_model_timeout_secs(),
            backend_timeout_secs: default_backend_timeout_secs(),
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// Directory holding calchat's config and provider state.
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("calchat"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load from the default location.
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`. A missing file means all defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply `MODEL` and `OPENAI_BASE_URL` from the given lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(model) = lookup("MODEL").filter(|v| !v.trim().is_empty()) {
            self.model = model;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.base_url = base_url;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "model",
                reason: "must not be empty".into(),
            });
        }
        if self.max_tool_hops == 0 {
            return Err(ConfigError::Invalid {
                key: "max_tool_hops",
                reason: "must be at least 1".into(),
            });
        }
        if self.model_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "model_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        if self.backend_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "backend_timeout_secs",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    pub fn model_timeout(&self) -> Duration {
        Duration::from_secs(self.model_timeout_secs)
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }
}

/// Write the commented default config to `path`. Refuses to overwrite.
pub fn create_default_config(path: &Path) -> ConfigResult<()> {
    if path.exists() {
        return Err(ConfigError::Invalid {
            key: "config",
            reason: format!("{} already exists", path.display()),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, DEFAULT_CONFIG).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}
