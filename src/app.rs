//! Wires the OpenAI model, Google backend and orchestrator together.

use std::sync::Arc;

use anyhow::{Context, Result};
use calchat_core::{AppConfig, Dispatcher, Orchestrator, ToolRegistry};
use calchat_openai::OpenAiChat;
use calchat_provider_google::{BackendSession, GoogleCalendar, SessionStore};
use tracing::{debug, info};

pub struct App {
    pub orchestrator: Orchestrator,
    calendar: Arc<GoogleCalendar>,
}

impl App {
    pub fn build(config: &AppConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .context("OPENAI_API_KEY is not set. Export it or add it to a .env file.")?;

        let session = BackendSession::acquire(SessionStore::default_location()?)?;
        let calendar = Arc::new(GoogleCalendar::new(session));

        let model = Arc::new(OpenAiChat::new(
            api_key,
            config.model.as_str(),
            config.base_url.as_str(),
        ));
        let registry = Arc::new(ToolRegistry::calendar()?);
        let dispatcher =
            Dispatcher::new(registry, calendar.clone()).with_timeout(config.backend_timeout());

        let mut orchestrator = Orchestrator::new(model, dispatcher)
            .with_max_tool_hops(config.max_tool_hops)
            .with_model_timeout(config.model_timeout());

        if let Some(prompt) = &config.system_prompt {
            orchestrator = orchestrator.with_system_prompt(prompt.as_str());
        }

        debug!(
            model = %config.model,
            base_url = %config.base_url,
            max_tool_hops = config.max_tool_hops,
            "Assistant ready"
        );

        Ok(App {
            orchestrator,
            calendar,
        })
    }

    /// Persist the Google session before exit.
    pub async fn shutdown(&self) -> Result<()> {
        self.calendar.release().await?;
        info!("Saved Google session");
        Ok(())
    }
}
