use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Append-only proctoring event logged against a live attempt (tab switch,
/// camera loss, fullscreen exit and the like, as reported by the client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViolationEntry {
    pub violation_type: String,
    pub occurred_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: Option<JsonValue>,
}
