use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::permission::PermissionContext;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Wire shape of a `process_query` body, for clients building requests.
/// The server never deserializes into this type; see `normalizer::normalize`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query_text: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl QueryRequest {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self { query_text: query_text.into(), ..Self::default() }
    }

    pub fn to_payload(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanonicalRequest {
    /// Caller's text, untouched. Trimming is only used for validation.
    pub query_text: String,
    pub user_id: UserId,
    pub username: String,
    pub permissions: PermissionContext,
}
