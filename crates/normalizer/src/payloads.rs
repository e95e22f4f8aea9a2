use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One issue node as returned by the GraphQL `issues` connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssue {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
    /// Expected shape `{"totalCount": n}`; kept verbatim so malformed payloads survive.
    #[serde(default)]
    pub comments: Value,
}

impl RawIssue {
    /// Lenient extraction from a response node: fields with an unexpected type read as absent.
    pub fn from_node(node: &Value) -> Self {
        Self {
            title: string_field(node, "title"),
            created_at: string_field(node, "createdAt"),
            closed_at: string_field(node, "closedAt"),
            comments: node.get("comments").cloned().unwrap_or(Value::Null),
        }
    }
}

fn string_field(node: &Value, key: &str) -> Option<String> {
    node.get(key)
        .and_then(|v| if v.is_null() { None } else { v.as_str() })
        .map(|s| s.to_string())
}
