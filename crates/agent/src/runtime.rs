use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use sfquery_core::config::AppConfig;
use sfquery_core::{format_response, normalize, ModelInfo, PingStatus, QueryError, QueryResponse};
use tracing::{debug, info, info_span, Instrument};

use crate::dispatcher::Dispatcher;
use crate::engine::{AgentCrew, ReasoningEngine};
use crate::llm::{build_client, LlmError};

/// The request pipeline: normalize, dispatch, format.
pub struct AgentRuntime {
    dispatcher: Dispatcher,
    models: Vec<String>,
}

impl AgentRuntime {
    pub fn new(engine: Arc<dyn ReasoningEngine>, timeout: Duration, models: Vec<String>) -> Self {
        Self { dispatcher: Dispatcher::new(engine, timeout), models }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, LlmError> {
        let llm = build_client(&config.llm)?;
        let crew = AgentCrew::new(llm, config.agent.admin_profiles.clone());
        Ok(Self::new(
            Arc::new(crew),
            Duration::from_secs(config.llm.timeout_secs),
            config.available_models(),
        ))
    }

    pub fn available_models(&self) -> ModelInfo {
        ModelInfo { models: self.models.clone() }
    }

    pub fn ping(&self) -> PingStatus {
        PingStatus::for_model(self.models.first().cloned().unwrap_or_default())
    }

    pub async fn handle_query(
        &self,
        payload: &Value,
        correlation_id: &str,
    ) -> Result<QueryResponse, QueryError> {
        let span = info_span!("query", correlation_id = %correlation_id);
        async move {
            let request = normalize(payload)?;
            debug!(
                event_name = "query.received",
                query_text = %request.query_text,
                user_id = %request.user_id.0,
                context_supplied = request.permissions.supplied,
            );

            let raw = self.dispatcher.dispatch(&request).await?;
            let response = format_response(raw, &request.query_text);
            info!(
                event_name = "query.completed",
                field_access = ?response.field_access,
                visualization = response.visualization.is_some(),
            );
            Ok(response)
        }
        .instrument(span)
        .await
    }
}
