use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTestPayload {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "Duration must be 1-1440 minutes"))]
    pub duration_minutes: i32,
    pub schedule_start: Option<DateTime<Utc>>,
    pub schedule_end: Option<DateTime<Utc>>,
    pub shuffle_questions: Option<bool>,
    pub shuffle_options: Option<bool>,
    #[validate(range(min = 0, message = "Violation threshold cannot be negative"))]
    pub violation_threshold: Option<i32>,
    #[validate(range(min = 0, message = "Passing score cannot be negative"))]
    pub passing_score: Option<i32>,
    pub question_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTestPayload {
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440, message = "Duration must be 1-1440 minutes"))]
    pub duration_minutes: Option<i32>,
    pub schedule_start: Option<DateTime<Utc>>,
    pub schedule_end: Option<DateTime<Utc>>,
    pub shuffle_questions: Option<bool>,
    pub shuffle_options: Option<bool>,
    #[validate(range(min = 0, message = "Violation threshold cannot be negative"))]
    pub violation_threshold: Option<i32>,
    #[validate(range(min = 0, message = "Passing score cannot be negative"))]
    pub passing_score: Option<i32>,
    pub question_ids: Option<Vec<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListTestsQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub is_active: Option<bool>,
    pub created_by: Option<Uuid>,
    pub search: Option<String>,
}
