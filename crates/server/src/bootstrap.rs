use std::sync::Arc;

use sfquery_agent::{AgentRuntime, LlmError};
use sfquery_core::config::{AppConfig, ConfigError};
use thiserror::Error;
use tracing::info;

use crate::api::AppState;

pub struct Application {
    pub config: AppConfig,
    pub runtime: Arc<AgentRuntime>,
}

impl Application {
    pub fn state(&self) -> AppState {
        AppState { runtime: Arc::clone(&self.runtime) }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.config.server.bind_address, self.config.server.port)
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = ?config.llm.provider,
        model = %config.llm.model,
        "starting application bootstrap"
    );

    let runtime = AgentRuntime::from_config(&config)?;

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        base_url = %config.llm.effective_base_url(),
        timeout_secs = config.llm.timeout_secs,
        "reasoning engine ready"
    );

    Ok(Application { config, runtime: Arc::new(runtime) })
}

#[cfg(test)]
mod tests {
    use sfquery_core::config::{AppConfig, LlmProvider};

    use crate::bootstrap::{bootstrap_with_config, BootstrapError};

    #[test]
    fn bootstrap_builds_runtime_for_ollama() {
        let mut config = AppConfig::default();
        config.llm.provider = LlmProvider::Ollama;
        config.llm.model = "llama3.1".to_string();
        config.server.port = 9090;

        let app = bootstrap_with_config(config).expect("ollama needs no credential");
        assert_eq!(app.bind_address(), "0.0.0.0:9090");
        assert_eq!(app.state().runtime.available_models().models, vec!["llama3.1"]);
    }

    #[test]
    fn bootstrap_rejects_gemini_without_credential() {
        let mut config = AppConfig::default();
        config.llm.api_key = None;

        let error = bootstrap_with_config(config).err().expect("missing key");
        assert!(matches!(error, BootstrapError::Llm(_)));
        assert!(error.to_string().contains("api key"));
    }
}
