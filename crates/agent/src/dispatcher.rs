use std::sync::Arc;
use std::time::Duration;

use sfquery_core::{CanonicalRequest, QueryError, RawResult};
use tracing::warn;

use crate::engine::ReasoningEngine;

/// Hands canonical requests to the reasoning engine under a deadline. No
/// retries.
pub struct Dispatcher {
    engine: Arc<dyn ReasoningEngine>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(engine: Arc<dyn ReasoningEngine>, timeout: Duration) -> Self {
        Self { engine, timeout }
    }

    pub async fn dispatch(&self, request: &CanonicalRequest) -> Result<RawResult, QueryError> {
        match tokio::time::timeout(self.timeout, self.engine.run(request)).await {
            Err(_) => {
                warn!(
                    event_name = "query.dispatch.timeout",
                    timeout_secs = self.timeout.as_secs(),
                    "reasoning engine did not answer in time"
                );
                Err(QueryError::Upstream(format!(
                    "reasoning engine timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
            Ok(Err(error)) => {
                warn!(event_name = "query.dispatch.failed", error = %error, "reasoning engine failed");
                Err(QueryError::Upstream(error.to_string()))
            }
            Ok(Ok(raw)) if raw.text.trim().is_empty() => {
                warn!(event_name = "query.dispatch.empty", "reasoning engine returned empty text");
                Err(QueryError::Upstream("reasoning engine returned an empty answer".to_string()))
            }
            Ok(Ok(raw)) => Ok(raw),
        }
    }
}
