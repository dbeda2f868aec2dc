use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Test {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub schedule_start: Option<DateTime<Utc>>,
    pub schedule_end: Option<DateTime<Utc>>,
    pub shuffle_questions: bool,
    pub shuffle_options: bool,
    pub violation_threshold: i32,
    pub passing_score: i32,
    pub question_ids: Vec<Uuid>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Test {
    /// Second window check layered on top of the assignment's window: a test
    /// may carry its own schedule independent of any assignment.
    pub fn schedule_allows(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.schedule_start {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.schedule_end {
            if now > end {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn test_row(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Test {
        Test {
            id: Uuid::new_v4(),
            title: "Rust basics".into(),
            description: None,
            duration_minutes: 30,
            schedule_start: start,
            schedule_end: end,
            shuffle_questions: false,
            shuffle_options: false,
            violation_threshold: 0,
            passing_score: 0,
            question_ids: vec![],
            created_by: Uuid::new_v4(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn unscheduled_test_is_always_open() {
        assert!(test_row(None, None).schedule_allows(Utc::now()));
    }

    #[test]
    fn schedule_window_is_inclusive_of_bounds() {
        let now = Utc::now();
        let t = test_row(Some(now - Duration::hours(1)), Some(now + Duration::hours(1)));
        assert!(t.schedule_allows(now));
        assert!(!t.schedule_allows(now - Duration::hours(2)));
        assert!(!t.schedule_allows(now + Duration::hours(2)));
    }
}
