use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sfquery_core::{AccessVerdict, CanonicalRequest, FieldRef, PermissionCheck, RawResult};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::classify::{classify, QueryKind};
use crate::llm::{extract_json, LlmClient, LlmError};
use crate::permissions::{check_field_access, extract_field_ref, FieldAccessFinding};
use crate::roles::AgentRole;
use crate::tools::{ToolInput, ToolRegistry};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("tool `{name}` failed: {reason}")]
    Tool { name: &'static str, reason: String },
}

/// Produces a [`RawResult`] for a canonical request. The service only
/// depends on this capability.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn run(&self, request: &CanonicalRequest) -> Result<RawResult, EngineError>;
}

/// Routes a question through a small crew of LLM roles backed by
/// deterministic tools.
pub struct AgentCrew {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    admin_profiles: Vec<String>,
}

impl AgentCrew {
    pub fn new(llm: Arc<dyn LlmClient>, admin_profiles: Vec<String>) -> Self {
        Self { tools: ToolRegistry::standard(&admin_profiles), llm, admin_profiles }
    }

    async fn ask(&self, role: AgentRole, prompt: String) -> Result<String, EngineError> {
        debug!(event_name = "engine.agent.call", role = role.title(), model = self.llm.model());
        Ok(self.llm.complete(&role.system_prompt(), &prompt).await?)
    }

    async fn tool(
        &self,
        name: &'static str,
        request: &CanonicalRequest,
    ) -> Result<Value, EngineError> {
        let input = ToolInput { text: &request.query_text, permissions: &request.permissions };
        self.tools
            .execute(name, input)
            .await
            .map_err(|error| EngineError::Tool { name, reason: error.to_string() })
    }

    async fn permission_flow(&self, request: &CanonicalRequest) -> Result<RawResult, EngineError> {
        let named = extract_field_ref(&request.query_text, &request.permissions);
        let finding = if named.is_some() {
            let output = self.tool("field_access", request).await?;
            Some(serde_json::from_value::<FieldAccessFinding>(output).map_err(|error| {
                EngineError::Tool { name: "field_access", reason: error.to_string() }
            })?)
        } else {
            self.identify_field(request).await?.map(|target| {
                check_field_access(&request.permissions, &target, &self.admin_profiles)
            })
        };

        let (summary, check) = match finding {
            Some(finding) => {
                let summary = serde_json::to_string(&finding).map_err(|error| {
                    EngineError::Tool { name: "field_access", reason: error.to_string() }
                })?;
                (summary, finding.into_check())
            }
            None => {
                let message =
                    "The question does not name a specific object and field to check.".to_string();
                let summary = json!({ "found": false, "message": &message }).to_string();
                (summary, PermissionCheck { target: None, verdict: AccessVerdict::Unknown, message })
            }
        };

        info!(
            event_name = "engine.permission.checked",
            field = check.target.as_ref().map(ToString::to_string).unwrap_or_default(),
            verdict = check.verdict.as_str(),
        );

        let text = self
            .ask(
                AgentRole::ResponseFormatter,
                format!(
                    "Answer the user's question using only this field access check.\n\
                     Question: \"{question}\"\n\
                     Check result: {summary}\n\
                     If the verdict is unknown, say plainly that access could not be determined \
                     and suggest reviewing the profile's field-level security in Setup.",
                    question = request.query_text,
                ),
            )
            .await?;

        Ok(RawResult::text(text).with_permission_check(check))
    }

    /// Asks the security expert to name the object and field when the
    /// question does not spell them out.
    async fn identify_field(
        &self,
        request: &CanonicalRequest,
    ) -> Result<Option<FieldRef>, EngineError> {
        let reply = self
            .ask(
                AgentRole::SecurityExpert,
                format!(
                    "Identify the Salesforce object and field this question is about: \"{}\"\n\
                     Reply with JSON only, for example \
                     {{\"object\": \"Account\", \"field\": \"Rating\"}}. \
                     Use null for anything the question does not identify.",
                    request.query_text
                ),
            )
            .await?;

        let identified = extract_json(&reply).and_then(|value| {
            let object = value.get("object")?.as_str()?.trim().to_string();
            let field = value.get("field")?.as_str()?.trim().to_string();
            (!object.is_empty() && !field.is_empty()).then(|| FieldRef::new(object, field))
        });
        if identified.is_none() {
            debug!(event_name = "engine.permission.unidentified", "security expert named no field");
        }
        Ok(identified)
    }

    async fn analyze(&self, request: &CanonicalRequest) -> Result<String, EngineError> {
        let profile = request.permissions.profile.as_deref().unwrap_or("unknown");
        self.ask(
            AgentRole::QueryAnalyzer,
            format!(
                "Analyze this Salesforce question from a user with profile \"{profile}\": \"{}\"\n\
                 List the objects, fields, filters, and groupings it needs.",
                request.query_text
            ),
        )
        .await
    }

    async fn data_notes(
        &self,
        request: &CanonicalRequest,
        analysis: &str,
    ) -> Result<String, EngineError> {
        let soql = self.tool("soql_query", request).await?;
        self.ask(
            AgentRole::DataExpert,
            format!(
                "Question: \"{question}\"\nAnalysis: {analysis}\nProposed query: {soql}\n\
                 Refine the SOQL if needed and describe the data it returns. If object_access \
                 is \"denied\", explain that the user cannot read that object instead.",
                question = request.query_text,
            ),
        )
        .await
    }

    async fn visualization_flow(
        &self,
        request: &CanonicalRequest,
    ) -> Result<RawResult, EngineError> {
        let analysis = self.analyze(request).await?;
        let notes = self.data_notes(request, &analysis).await?;
        let hint = self.tool("chart_hint", request).await?;

        let chart_reply = self
            .ask(
                AgentRole::VisualizationExpert,
                format!(
                    "Question: \"{question}\"\nData: {notes}\nSuggested chart: {hint}\n\
                     Return a single Chart.js JSON object with keys \"type\", \"title\", and \
                     \"data\" (with \"labels\" and \"datasets\", each dataset having \"label\" \
                     and numeric \"data\"). Return only the JSON.",
                    question = request.query_text,
                ),
            )
            .await?;

        let chart = extract_json(&chart_reply);
        if chart.is_none() {
            warn!(event_name = "engine.visualization.no_chart", "chart reply held no JSON object");
        }

        let closing = if chart.is_some() {
            "Write a short explanation to accompany the chart shown to the user."
        } else {
            "No chart could be produced. Summarize the data in words."
        };
        let text = self
            .ask(
                AgentRole::ResponseFormatter,
                format!(
                    "Question: \"{question}\"\nData: {notes}\n{closing}",
                    question = request.query_text,
                ),
            )
            .await?;

        let raw = RawResult::text(text);
        Ok(match chart {
            Some(chart) => raw.with_chart(chart),
            None => raw,
        })
    }

    async fn data_flow(&self, request: &CanonicalRequest) -> Result<RawResult, EngineError> {
        let analysis = self.analyze(request).await?;
        let notes = self.data_notes(request, &analysis).await?;
        let text = self
            .ask(
                AgentRole::ResponseFormatter,
                format!(
                    "Question: \"{question}\"\nFindings: {notes}\n\
                     Answer the user's question clearly and include the SOQL used.",
                    question = request.query_text,
                ),
            )
            .await?;
        Ok(RawResult::text(text))
    }
}

#[async_trait]
impl ReasoningEngine for AgentCrew {
    async fn run(&self, request: &CanonicalRequest) -> Result<RawResult, EngineError> {
        let kind = classify(&request.query_text);
        info!(event_name = "engine.route", kind = kind.as_str());
        match kind {
            QueryKind::PermissionCheck => self.permission_flow(request).await,
            QueryKind::Visualization => self.visualization_flow(request).await,
            QueryKind::Data => self.data_flow(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;
    use sfquery_core::{normalize, AccessVerdict, CanonicalRequest, FieldRef};

    use super::{AgentCrew, EngineError, ReasoningEngine};
    use crate::llm::{LlmClient, LlmError};

    /// Replies with queued answers and records every (system, prompt) pair.
    #[derive(Default)]
    struct ScriptedLlm {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedLlm {
        fn with_replies(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self { replies: Mutex::new(replies.into()), calls: Mutex::default() })
        }

        fn systems(&self) -> Vec<String> {
            self.calls
                .lock()
                .expect("calls lock")
                .iter()
                .map(|(system, _)| system.lines().next().unwrap_or_default().to_string())
                .collect()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
            self.calls.lock().expect("calls lock").push((system.to_string(), prompt.to_string()));
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Empty("script exhausted".to_string())))
        }
    }

    fn crew(llm: &Arc<ScriptedLlm>) -> AgentCrew {
        AgentCrew::new(llm.clone(), vec!["System Administrator".to_string()])
    }

    fn request(payload: serde_json::Value) -> CanonicalRequest {
        normalize(&payload).expect("valid payload")
    }

    #[tokio::test]
    async fn permission_question_with_field_skips_the_security_expert() {
        let llm = ScriptedLlm::with_replies(vec![Ok(
            "No, the Sales Rep profile cannot see Account.Rating.".to_string()
        )]);
        let raw = crew(&llm)
            .run(&request(json!({
                "query_text": "Does the Sales Rep profile have access to Account.Rating?",
                "context": { "profile": "Sales Rep", "fieldPermissions": { "Account.Rating": false } }
            })))
            .await
            .expect("engine succeeds");

        let check = raw.permission_check.expect("permission check");
        assert_eq!(check.verdict, AccessVerdict::Denied);
        assert_eq!(check.target, Some(FieldRef::new("Account", "Rating")));
        assert_eq!(raw.text, "No, the Sales Rep profile cannot see Account.Rating.");
        assert_eq!(llm.systems(), vec!["You are the Response Formatter."]);
    }

    #[tokio::test]
    async fn email_address_in_question_does_not_hide_the_denied_field() {
        let llm = ScriptedLlm::with_replies(vec![Ok("No, Jane cannot see it.".to_string())]);
        let raw = crew(&llm)
            .run(&request(json!({
                "query_text": "Can jane@acme.com see Account.Rating?",
                "context": { "profile": "Sales Rep", "fieldPermissions": { "Account.Rating": false } }
            })))
            .await
            .expect("engine succeeds");

        let check = raw.permission_check.expect("permission check");
        assert_eq!(check.target, Some(FieldRef::new("Account", "Rating")));
        assert_eq!(check.verdict, AccessVerdict::Denied);
        assert_eq!(llm.systems(), vec!["You are the Response Formatter."]);
    }

    #[tokio::test]
    async fn permission_question_without_field_asks_security_expert() {
        let llm = ScriptedLlm::with_replies(vec![
            Ok("```json\n{\"object\": \"Opportunity\", \"field\": \"Amount\"}\n```".to_string()),
            Ok("As an administrator you can see the amount.".to_string()),
        ]);
        let raw = crew(&llm)
            .run(&request(json!({
                "query_text": "Can I see how much each deal is worth?",
                "context": { "profile": "System Administrator" }
            })))
            .await
            .expect("engine succeeds");

        let check = raw.permission_check.expect("permission check");
        assert_eq!(check.target, Some(FieldRef::new("Opportunity", "Amount")));
        assert_eq!(check.verdict, AccessVerdict::Granted);
        assert_eq!(
            llm.systems(),
            vec!["You are the Salesforce Security Expert.", "You are the Response Formatter."]
        );
    }

    #[tokio::test]
    async fn unidentified_permission_target_is_unknown() {
        let llm = ScriptedLlm::with_replies(vec![
            Ok("I am not sure which field you mean.".to_string()),
            Ok("I could not tell which field you meant.".to_string()),
        ]);
        let raw = crew(&llm)
            .run(&request(json!({ "query_text": "Do I have permission to do that?" })))
            .await
            .expect("engine succeeds");

        let check = raw.permission_check.expect("permission check");
        assert_eq!(check.target, None);
        assert_eq!(check.verdict, AccessVerdict::Unknown);
    }

    #[tokio::test]
    async fn visualization_flow_attaches_extracted_chart() {
        let llm = ScriptedLlm::with_replies(vec![
            Ok("Opportunities grouped by StageName.".to_string()),
            Ok("SELECT StageName, COUNT(Id) FROM Opportunity GROUP BY StageName".to_string()),
            Ok("Here is the chart:\n```json\n{\"type\": \"pie\", \"title\": \"By Stage\", \"data\": {\"labels\": [\"Won\", \"Lost\"], \"datasets\": [{\"label\": \"Deals\", \"data\": [3, 2]}]}}\n```".to_string()),
            Ok("Most deals are won.".to_string()),
        ]);
        let raw = crew(&llm)
            .run(&request(json!({ "query_text": "Pie chart of opportunities by stage" })))
            .await
            .expect("engine succeeds");

        assert!(raw.permission_check.is_none());
        assert_eq!(raw.text, "Most deals are won.");
        assert_eq!(raw.chart.expect("chart")["type"], "pie");
        assert_eq!(
            llm.systems(),
            vec![
                "You are the Query Analyzer.",
                "You are the Salesforce Data Expert.",
                "You are the Data Visualization Expert.",
                "You are the Response Formatter.",
            ]
        );
    }

    #[tokio::test]
    async fn visualization_without_json_has_no_chart() {
        let llm = ScriptedLlm::with_replies(vec![
            Ok("analysis".to_string()),
            Ok("notes".to_string()),
            Ok("I would draw a bar chart.".to_string()),
            Ok("Here is a summary instead.".to_string()),
        ]);
        let raw = crew(&llm)
            .run(&request(json!({ "query_text": "Graph accounts by industry" })))
            .await
            .expect("engine succeeds");

        assert!(raw.chart.is_none());
        assert_eq!(raw.text, "Here is a summary instead.");
    }

    #[tokio::test]
    async fn data_flow_passes_drafted_soql_to_the_data_expert() {
        let llm = ScriptedLlm::with_replies(vec![
            Ok("analysis".to_string()),
            Ok("notes".to_string()),
            Ok("You have 12 contacts.".to_string()),
        ]);
        let raw = crew(&llm)
            .run(&request(json!({ "query_text": "How many contacts were added last week?" })))
            .await
            .expect("engine succeeds");

        assert_eq!(raw.text, "You have 12 contacts.");
        let calls = llm.calls.lock().expect("calls lock");
        assert!(calls[1].1.contains("FROM Contact"));
    }

    #[tokio::test]
    async fn llm_failure_is_an_engine_error() {
        let llm = ScriptedLlm::with_replies(vec![Err(LlmError::Timeout)]);
        let error = crew(&llm)
            .run(&request(json!({ "query_text": "List my accounts" })))
            .await
            .expect_err("engine fails");
        assert!(matches!(error, EngineError::Llm(LlmError::Timeout)));
    }
}
