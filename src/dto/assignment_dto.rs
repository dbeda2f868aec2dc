use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::assignment::Assignment;
use crate::models::test::Test;

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentPayload {
    pub test_id: Uuid,
    pub assigned_to_users: Option<Vec<Uuid>>,
    pub assigned_to_roles: Option<Vec<String>>,
    pub assigned_to_groups: Option<Vec<Uuid>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssignmentPayload {
    pub assigned_to_users: Option<Vec<Uuid>>,
    pub assigned_to_roles: Option<Vec<String>>,
    pub assigned_to_groups: Option<Vec<Uuid>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ListAssignmentsQuery {
    pub test_id: Option<Uuid>,
}

/// One entry of the "tests I can take right now" listing. Carries no
/// question content; the snapshot is only built when an attempt starts.
#[derive(Debug, Serialize)]
pub struct EligibleTestView {
    pub assignment_id: Uuid,
    pub test_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub duration_minutes: i32,
    pub schedule_start: Option<DateTime<Utc>>,
    pub schedule_end: Option<DateTime<Utc>>,
    pub assignment_start_at: Option<DateTime<Utc>>,
    pub assignment_end_at: Option<DateTime<Utc>>,
}

impl EligibleTestView {
    pub fn from_pair(assignment: &Assignment, test: &Test) -> Self {
        Self {
            assignment_id: assignment.id,
            test_id: test.id,
            title: test.title.clone(),
            description: test.description.clone(),
            duration_minutes: test.duration_minutes,
            schedule_start: test.schedule_start,
            schedule_end: test.schedule_end,
            assignment_start_at: assignment.start_at,
            assignment_end_at: assignment.end_at,
        }
    }
}
