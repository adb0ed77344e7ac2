use serde_json::Value;
use sfquery_agent::AgentRuntime;
use sfquery_core::config::{AppConfig, LoadOptions};
use sfquery_core::{QueryError, QueryRequest};
use uuid::Uuid;

use crate::commands::{CommandResult, EXIT_CONFIG, EXIT_OK, EXIT_REQUEST};

#[derive(Debug, Clone, Default)]
pub struct AskArgs {
    pub query: String,
    pub context: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
}

pub fn run(args: AskArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("ask", "config_validation", error.to_string(), EXIT_CONFIG)
        }
    };

    let runtime = match AgentRuntime::from_config(&config) {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure("ask", "llm_setup", error.to_string(), EXIT_CONFIG)
        }
    };

    execute(&runtime, args)
}

/// Runs one query and renders either the response or the error body.
pub fn execute(runtime: &AgentRuntime, args: AskArgs) -> CommandResult {
    let correlation_id = Uuid::new_v4().to_string();

    let payload = match build_payload(args) {
        Ok(payload) => payload,
        Err(error) => return reject(error, &correlation_id),
    };

    let executor = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(executor) => executor,
        Err(error) => {
            return CommandResult::failure(
                "ask",
                "async_runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_REQUEST,
            )
        }
    };

    match executor.block_on(runtime.handle_query(&payload, &correlation_id)) {
        Ok(response) => CommandResult::json("ask", &response, EXIT_OK),
        Err(error) => reject(error, &correlation_id),
    }
}

fn build_payload(args: AskArgs) -> Result<Value, QueryError> {
    let context = args
        .context
        .as_deref()
        .map(|raw| {
            serde_json::from_str::<Value>(raw).map_err(|error| {
                QueryError::MalformedContext(format!("--context is not valid JSON: {error}"))
            })
        })
        .transpose()?;

    let request = QueryRequest {
        query_text: args.query,
        user_id: args.user_id.unwrap_or_default(),
        username: args.username.unwrap_or_default(),
        context,
    };
    Ok(request.to_payload())
}

fn reject(error: QueryError, correlation_id: &str) -> CommandResult {
    CommandResult::json("ask", &error.into_interface(correlation_id).body(), EXIT_REQUEST)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;
    use sfquery_agent::{AgentRuntime, EngineError, LlmError, ReasoningEngine};
    use sfquery_core::{AccessVerdict, CanonicalRequest, FieldRef, PermissionCheck, RawResult};

    use super::{execute, AskArgs};

    struct EchoEngine {
        fail: bool,
    }

    #[async_trait]
    impl ReasoningEngine for EchoEngine {
        async fn run(&self, request: &CanonicalRequest) -> Result<RawResult, EngineError> {
            if self.fail {
                return Err(EngineError::Llm(LlmError::Timeout));
            }
            let verdict = match request.permissions.profile.as_deref() {
                Some("System Administrator") => AccessVerdict::Granted,
                _ => AccessVerdict::Unknown,
            };
            Ok(RawResult::text(format!("answered for {}", request.user_id.0))
                .with_permission_check(PermissionCheck {
                    target: Some(FieldRef::new("Account", "Rating")),
                    verdict,
                    message: String::new(),
                }))
        }
    }

    fn runtime(fail: bool) -> AgentRuntime {
        AgentRuntime::new(
            Arc::new(EchoEngine { fail }),
            Duration::from_secs(5),
            vec!["gemini-1.5-flash".to_string()],
        )
    }

    fn parse(output: &str) -> Value {
        serde_json::from_str(output).expect("ask output should be JSON")
    }

    #[test]
    fn prints_query_response_on_success() {
        let result = execute(
            &runtime(false),
            AskArgs {
                query: "Can I see Account.Rating?".to_string(),
                context: Some(r#"{"profile": "System Administrator"}"#.to_string()),
                user_id: Some("005xx".to_string()),
                username: None,
            },
        );

        assert_eq!(result.exit_code, 0);
        let payload = parse(&result.output);
        assert_eq!(payload["text"], "answered for 005xx");
        assert_eq!(payload["field_access"], true);
        assert_eq!(payload["query_text"], "Can I see Account.Rating?");
    }

    #[test]
    fn invalid_context_json_is_a_malformed_context_error() {
        let result = execute(
            &runtime(false),
            AskArgs {
                query: "Can I see Account.Rating?".to_string(),
                context: Some("{profile".to_string()),
                ..AskArgs::default()
            },
        );

        assert_eq!(result.exit_code, 3);
        let payload = parse(&result.output);
        assert_eq!(payload["kind"], "MalformedContextError");
        assert!(payload["correlation_id"].as_str().is_some());
    }

    #[test]
    fn engine_failure_prints_upstream_error_body() {
        let result =
            execute(&runtime(true), AskArgs { query: "List accounts".to_string(), ..AskArgs::default() });

        assert_eq!(result.exit_code, 3);
        assert_eq!(parse(&result.output)["kind"], "UpstreamError");
    }
}
