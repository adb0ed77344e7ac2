use std::collections::HashMap;
use std::sync::OnceLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use sfquery_core::{ChartType, PermissionContext};

use crate::permissions::{check_field_access, extract_field_ref, object_access};
use crate::soql::SoqlPlan;

/// What every tool sees: the user's question and their permissions.
#[derive(Clone, Copy, Debug)]
pub struct ToolInput<'a> {
    pub text: &'a str,
    pub permissions: &'a PermissionContext,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, input: ToolInput<'_>) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn standard(admin_profiles: &[String]) -> Self {
        let mut registry = Self::default();
        registry.register(FieldAccessTool::new(admin_profiles.to_vec()));
        registry.register(SoqlQueryTool);
        registry.register(ChartHintTool);
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub async fn execute(&self, name: &str, input: ToolInput<'_>) -> Result<Value> {
        let tool = self.tools.get(name).ok_or_else(|| anyhow!("tool `{name}` is not registered"))?;
        tool.execute(input).await
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

pub struct FieldAccessTool {
    admin_profiles: Vec<String>,
}

impl FieldAccessTool {
    pub fn new(admin_profiles: Vec<String>) -> Self {
        Self { admin_profiles }
    }
}

#[async_trait]
impl Tool for FieldAccessTool {
    fn name(&self) -> &'static str {
        "field_access"
    }

    async fn execute(&self, input: ToolInput<'_>) -> Result<Value> {
        let Some(target) = extract_field_ref(input.text, input.permissions) else {
            return Ok(json!({
                "found": false,
                "message": "No Object.Field reference was found in the question."
            }));
        };
        let finding = check_field_access(input.permissions, &target, &self.admin_profiles);
        Ok(serde_json::to_value(finding)?)
    }
}

/// Drafts the SOQL that would answer a question. Nothing is sent to
/// Salesforce.
pub struct SoqlQueryTool;

#[async_trait]
impl Tool for SoqlQueryTool {
    fn name(&self) -> &'static str {
        "soql_query"
    }

    async fn execute(&self, input: ToolInput<'_>) -> Result<Value> {
        let plan = SoqlPlan::for_text(input.text);
        let access = plan.object.as_deref().map(|object| object_access(input.permissions, object));
        let mut value = serde_json::to_value(&plan)?;
        if let Some(map) = value.as_object_mut() {
            map.insert("object_access".to_string(), serde_json::to_value(access)?);
        }
        Ok(value)
    }
}

/// Whole-word keywords per chart type, checked in order.
fn chart_keywords() -> &'static [(ChartType, Regex)] {
    static RULES: OnceLock<Vec<(ChartType, Regex)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (ChartType::Pie, r"(?i)\b(?:pies?|distributions?)\b"),
            (ChartType::Line, r"(?i)\b(?:lines?|trends?|over\s+time)\b"),
            (ChartType::Scatter, r"(?i)\b(?:scatter|correlations?)\b"),
            (ChartType::Area, r"(?i)\barea\b"),
        ]
        .into_iter()
        .map(|(kind, pattern)| (kind, Regex::new(pattern).expect("valid chart keyword regex")))
        .collect()
    })
}

pub fn chart_hint(text: &str) -> ChartType {
    chart_keywords()
        .iter()
        .find(|(_, keywords)| keywords.is_match(text))
        .map_or(ChartType::Bar, |(kind, _)| *kind)
}

pub struct ChartHintTool;

#[async_trait]
impl Tool for ChartHintTool {
    fn name(&self) -> &'static str {
        "chart_hint"
    }

    async fn execute(&self, input: ToolInput<'_>) -> Result<Value> {
        Ok(json!({ "chart_type": chart_hint(input.text).as_str() }))
    }
}
