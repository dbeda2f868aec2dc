use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;
use validator::Validate;

use crate::models::answer::AttemptAnswer;
use crate::models::snapshot::{QuestionSnapshot, SnapshotQuestionView};
use crate::models::test::Test;
use crate::models::test_attempt::{AttemptStatus, TestAttempt};
use crate::models::violation::ViolationEntry;

#[derive(Debug, Deserialize)]
pub struct StartAttemptPayload {
    pub assignment_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: Uuid,
    pub selected_option_index: Option<i32>,
    pub answer_text: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitAttemptPayload {
    #[validate(length(min = 1, message = "Attempt token is required"))]
    pub attempt_token: String,
    pub answers: Vec<SubmittedAnswer>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReportViolationPayload {
    #[validate(length(min = 1, message = "Attempt token is required"))]
    pub attempt_token: String,
    #[validate(length(min = 1, max = 100, message = "Violation type must be 1-100 characters"))]
    pub violation_type: String,
    pub details: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
pub struct ManualMarkPayload {
    pub question_id: Uuid,
    pub marks_awarded: i32,
    pub feedback: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EvaluateAttemptPayload {
    pub marks: Vec<ManualMarkPayload>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<AttemptStatus>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Returned only to the attempt's owner at creation or resume; the only
/// responses that ever carry the attempt token.
#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub assignment_id: Uuid,
    pub test_title: String,
    pub status: AttemptStatus,
    pub resumed: bool,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub attempt_token: String,
    pub max_score: i32,
    pub questions: Vec<SnapshotQuestionView>,
}

impl StartAttemptResponse {
    pub fn build(attempt: &TestAttempt, test: &Test, resumed: bool) -> Self {
        Self {
            attempt_id: attempt.id,
            test_id: attempt.test_id,
            assignment_id: attempt.assignment_id,
            test_title: test.title.clone(),
            status: attempt.status,
            resumed,
            started_at: attempt.started_at,
            expires_at: attempt.expires_at,
            attempt_token: attempt.attempt_token.clone(),
            max_score: attempt.max_score,
            questions: attempt.snapshots().iter().map(|s| s.client_view()).collect(),
        }
    }
}

/// Owner view of an attempt: questions without the answer key, no token.
#[derive(Debug, Serialize)]
pub struct AttemptView {
    pub id: Uuid,
    pub test_id: Uuid,
    pub assignment_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub questions: Vec<SnapshotQuestionView>,
    pub answers: Vec<AttemptAnswer>,
    pub violation_count: i32,
    pub score: i32,
    pub max_score: i32,
    pub passed: Option<bool>,
    pub requires_evaluation: bool,
}

impl AttemptView {
    pub fn build(attempt: &TestAttempt, passing_score: i32) -> Self {
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            assignment_id: attempt.assignment_id,
            status: attempt.status,
            started_at: attempt.started_at,
            expires_at: attempt.expires_at,
            submitted_at: attempt.submitted_at,
            questions: attempt.snapshots().iter().map(|s| s.client_view()).collect(),
            answers: attempt.answer_entries(),
            violation_count: attempt.violation_count(),
            score: attempt.score,
            max_score: attempt.max_score,
            passed: attempt
                .status
                .is_terminal()
                .then(|| attempt.score >= passing_score),
            requires_evaluation: attempt.requires_evaluation,
        }
    }
}

/// One row of the owner's attempt history.
#[derive(Debug, Serialize)]
pub struct OwnAttemptView {
    pub id: Uuid,
    pub test_id: Uuid,
    pub test_title: String,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: i32,
    pub max_score: i32,
    pub passed: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ViolationAck {
    pub attempt_id: Uuid,
    pub status: AttemptStatus,
    pub violations: i32,
    pub terminated: bool,
}

/// Evaluator view: snapshot entries with the answer key, stored answers and
/// violations in full. Never includes the attempt token.
#[derive(Debug, Serialize)]
pub struct EvaluationAttemptView {
    pub id: Uuid,
    pub test_id: Uuid,
    pub test_title: String,
    pub user_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub questions: Vec<QuestionSnapshot>,
    pub answers: Vec<AttemptAnswer>,
    pub violations: Vec<ViolationEntry>,
    pub score: i32,
    pub max_score: i32,
    pub passing_score: i32,
    pub passed: Option<bool>,
    pub requires_evaluation: bool,
    pub evaluated_by: Option<Uuid>,
    pub evaluated_at: Option<DateTime<Utc>>,
    pub evaluation_notes: Option<String>,
}

impl EvaluationAttemptView {
    pub fn build(attempt: &TestAttempt, test: &Test) -> Self {
        Self {
            id: attempt.id,
            test_id: attempt.test_id,
            test_title: test.title.clone(),
            user_id: attempt.user_id,
            status: attempt.status,
            started_at: attempt.started_at,
            expires_at: attempt.expires_at,
            submitted_at: attempt.submitted_at,
            questions: attempt.snapshots(),
            answers: attempt.answer_entries(),
            violations: attempt.violation_entries(),
            score: attempt.score,
            max_score: attempt.max_score,
            passing_score: test.passing_score,
            passed: attempt
                .status
                .is_terminal()
                .then(|| attempt.score >= test.passing_score),
            requires_evaluation: attempt.requires_evaluation,
            evaluated_by: attempt.evaluated_by,
            evaluated_at: attempt.evaluated_at,
            evaluation_notes: attempt.evaluation_notes.clone(),
        }
    }
}

/// Reporting row: outcome fields only, no question or answer content.
#[derive(Debug, Serialize)]
pub struct ReportAttemptView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub assignment_id: Uuid,
    pub status: AttemptStatus,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub score: i32,
    pub max_score: i32,
    pub passed: Option<bool>,
    pub violation_count: i32,
    pub requires_evaluation: bool,
}

impl ReportAttemptView {
    pub fn build(attempt: &TestAttempt, passing_score: i32) -> Self {
        Self {
            id: attempt.id,
            user_id: attempt.user_id,
            assignment_id: attempt.assignment_id,
            status: attempt.status,
            started_at: attempt.started_at,
            submitted_at: attempt.submitted_at,
            score: attempt.score,
            max_score: attempt.max_score,
            passed: attempt
                .status
                .is_terminal()
                .then(|| attempt.score >= passing_score),
            violation_count: attempt.violation_count(),
            requires_evaluation: attempt.requires_evaluation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attempt(status: AttemptStatus, score: i32) -> TestAttempt {
        let now = Utc::now();
        TestAttempt {
            id: Uuid::new_v4(),
            test_id: Uuid::new_v4(),
            assignment_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            attempt_token: "secret-token".into(),
            status,
            started_at: now,
            expires_at: now + chrono::Duration::minutes(30),
            submitted_at: status.is_terminal().then_some(now),
            question_snapshots: json!([{
                "question_id": Uuid::new_v4(),
                "kind": "mcq",
                "text": "2 + 2?",
                "options": ["3", "4"],
                "marks": 2,
                "correct_option_index": 1
            }]),
            answers: json!([]),
            violations: json!([]),
            score,
            max_score: 2,
            requires_evaluation: false,
            evaluated_by: None,
            evaluated_at: None,
            evaluation_notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn owner_view_strips_token_and_answer_key() {
        let view = AttemptView::build(&attempt(AttemptStatus::InProgress, 0), 1);
        let rendered = serde_json::to_value(&view).unwrap();
        assert!(rendered.get("attempt_token").is_none());
        assert!(rendered["questions"][0].get("correct_option_index").is_none());
        assert_eq!(rendered["passed"], serde_json::Value::Null);
    }

    #[test]
    fn passed_is_computed_only_for_terminal_attempts() {
        let failing = AttemptView::build(&attempt(AttemptStatus::Submitted, 0), 1);
        assert_eq!(failing.passed, Some(false));
        let passing = AttemptView::build(&attempt(AttemptStatus::AutoSubmitted, 2), 1);
        assert_eq!(passing.passed, Some(true));
        let live = AttemptView::build(&attempt(AttemptStatus::InProgress, 2), 1);
        assert_eq!(live.passed, None);
    }

    #[test]
    fn evaluator_view_keeps_key_but_not_token() {
        let row = attempt(AttemptStatus::Submitted, 2);
        let test = Test {
            id: row.test_id,
            title: "Rust basics".into(),
            description: None,
            duration_minutes: 30,
            schedule_start: None,
            schedule_end: None,
            shuffle_questions: false,
            shuffle_options: false,
            violation_threshold: 0,
            passing_score: 1,
            question_ids: vec![],
            created_by: Uuid::new_v4(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let rendered = serde_json::to_value(EvaluationAttemptView::build(&row, &test)).unwrap();
        assert!(rendered.get("attempt_token").is_none());
        assert_eq!(rendered["questions"][0]["correct_option_index"], json!(1));
        assert_eq!(rendered["passed"], json!(true));
    }

    #[test]
    fn start_response_carries_token_and_stripped_questions() {
        let row = attempt(AttemptStatus::InProgress, 0);
        let test = Test {
            id: row.test_id,
            title: "Rust basics".into(),
            description: None,
            duration_minutes: 30,
            schedule_start: None,
            schedule_end: None,
            shuffle_questions: false,
            shuffle_options: false,
            violation_threshold: 0,
            passing_score: 1,
            question_ids: vec![],
            created_by: Uuid::new_v4(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let rendered =
            serde_json::to_value(StartAttemptResponse::build(&row, &test, true)).unwrap();
        assert_eq!(rendered["attempt_token"], json!("secret-token"));
        assert_eq!(rendered["resumed"], json!(true));
        assert!(rendered["questions"][0].get("correct_option_index").is_none());
    }
}
