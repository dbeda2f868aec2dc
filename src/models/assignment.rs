use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Disjunctive eligibility rule: a principal matches if caught by any of the
/// three channels (explicit users, role names, group membership). The time
/// window and `is_active` gate usability independent of membership.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Assignment {
    pub id: Uuid,
    pub test_id: Uuid,
    pub assigned_by: Uuid,
    pub assigned_to_users: Vec<Uuid>,
    pub assigned_to_roles: Vec<String>,
    pub assigned_to_groups: Vec<Uuid>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
