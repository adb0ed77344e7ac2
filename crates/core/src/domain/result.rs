use serde_json::Value;

use crate::domain::permission::{AccessVerdict, FieldRef};

/// What the reasoning engine hands back before response shaping.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawResult {
    pub text: String,
    pub permission_check: Option<PermissionCheck>,
    /// Unvalidated chart payload; the formatter decides whether it survives.
    pub chart: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PermissionCheck {
    pub target: Option<FieldRef>,
    pub verdict: AccessVerdict,
    pub message: String,
}

impl RawResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), ..Self::default() }
    }

    pub fn with_permission_check(mut self, check: PermissionCheck) -> Self {
        self.permission_check = Some(check);
        self
    }

    pub fn with_chart(mut self, chart: Value) -> Self {
        self.chart = Some(chart);
        self
    }
}
