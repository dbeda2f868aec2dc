use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::answer::AttemptAnswer;
use crate::models::snapshot::QuestionSnapshot;
use crate::models::violation::ViolationEntry;

/// Attempt lifecycle: `in_progress` is the only non-terminal state. Both
/// terminal states are final; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    AutoSubmitted,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AttemptStatus::Submitted | AttemptStatus::AutoSubmitted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Submitted => "submitted",
            AttemptStatus::AutoSubmitted => "auto_submitted",
        }
    }
}

/// One principal's timed, single-shot run at a test under one assignment.
/// Never deleted in normal operation; terminal rows are the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TestAttempt {
    pub id: Uuid,
    pub test_id: Uuid,
    pub assignment_id: Uuid,
    pub user_id: Uuid,
    pub attempt_token: String,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub question_snapshots: JsonValue,
    pub answers: JsonValue,
    pub violations: JsonValue,
    pub score: i32,
    pub max_score: i32,
    pub requires_evaluation: bool,
    pub evaluated_by: Option<Uuid>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub evaluation_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestAttempt {
    pub fn snapshots(&self) -> Vec<QuestionSnapshot> {
        serde_json::from_value(self.question_snapshots.clone()).unwrap_or_default()
    }

    pub fn answer_entries(&self) -> Vec<AttemptAnswer> {
        serde_json::from_value(self.answers.clone()).unwrap_or_default()
    }

    pub fn violation_entries(&self) -> Vec<ViolationEntry> {
        serde_json::from_value(self.violations.clone()).unwrap_or_default()
    }

    pub fn violation_count(&self) -> i32 {
        self.violations
            .as_array()
            .map(|v| v.len() as i32)
            .unwrap_or(0)
    }

    /// Wall-clock expiry has passed but no terminal transition has landed yet.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.status == AttemptStatus::InProgress && now > self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_are_final() {
        assert!(!AttemptStatus::InProgress.is_terminal());
        assert!(AttemptStatus::Submitted.is_terminal());
        assert!(AttemptStatus::AutoSubmitted.is_terminal());
    }

    #[test]
    fn status_serializes_snake_case() {
        let s = serde_json::to_string(&AttemptStatus::AutoSubmitted).unwrap();
        assert_eq!(s, "\"auto_submitted\"");
        assert_eq!(AttemptStatus::AutoSubmitted.as_str(), "auto_submitted");
    }
}
