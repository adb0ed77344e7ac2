use serde::Serialize;

const PERMISSION_KEYWORDS: &[&str] = &[
    "access",
    "permission",
    "field-level security",
    "fls",
    "can i see",
    "can i edit",
    "can i update",
    "can i create",
    "visible",
    "editable",
    "have access",
    "have permission",
];

const VISUALIZATION_KEYWORDS: &[&str] = &[
    "chart",
    "graph",
    "plot",
    "visualization",
    "visualize",
    "dashboard",
    "report",
    "show me",
    "display",
    "trend",
    "distribution",
    "comparison",
    "pie chart",
    "bar graph",
    "line chart",
    "histogram",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    PermissionCheck,
    Visualization,
    Data,
}

impl QueryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PermissionCheck => "permission_check",
            Self::Visualization => "visualization",
            Self::Data => "data",
        }
    }
}

/// Permission questions win over visualization requests.
pub fn classify(query_text: &str) -> QueryKind {
    let lowered = query_text.to_lowercase();
    if contains_any(&lowered, PERMISSION_KEYWORDS) {
        QueryKind::PermissionCheck
    } else if contains_any(&lowered, VISUALIZATION_KEYWORDS) {
        QueryKind::Visualization
    } else {
        QueryKind::Data
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}
