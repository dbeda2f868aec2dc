use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::assignment_dto::{CreateAssignmentPayload, UpdateAssignmentPayload};
use crate::eligibility;
use crate::error::{is_foreign_key_violation, Error, Result};
use crate::models::assignment::Assignment;
use crate::models::test::Test;
use crate::services::group_service::GroupService;

#[derive(Clone)]
pub struct AssignmentService {
    pool: PgPool,
    groups: GroupService,
}

impl AssignmentService {
    pub fn new(pool: PgPool) -> Self {
        let groups = GroupService::new(pool.clone());
        Self { pool, groups }
    }

    pub async fn create_assignment(
        &self,
        payload: CreateAssignmentPayload,
        assigned_by: Uuid,
    ) -> Result<Assignment> {
        if let (Some(start), Some(end)) = (payload.start_at, payload.end_at) {
            if start >= end {
                return Err(Error::BadRequest(
                    "Assignment start must be before its end".to_string(),
                ));
            }
        }

        let test_exists: bool =
            sqlx::query_scalar(r#"SELECT EXISTS(SELECT 1 FROM tests WHERE id = $1)"#)
                .bind(payload.test_id)
                .fetch_one(&self.pool)
                .await?;
        if !test_exists {
            return Err(Error::NotFound("Test not found".to_string()));
        }

        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            INSERT INTO assignments (
                test_id, assigned_by, assigned_to_users, assigned_to_roles,
                assigned_to_groups, start_at, end_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payload.test_id)
        .bind(assigned_by)
        .bind(payload.assigned_to_users.unwrap_or_default())
        .bind(payload.assigned_to_roles.unwrap_or_default())
        .bind(payload.assigned_to_groups.unwrap_or_default())
        .bind(payload.start_at)
        .bind(payload.end_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(assignment)
    }

    pub async fn get_assignment(&self, assignment_id: Uuid) -> Result<Assignment> {
        let assignment =
            sqlx::query_as::<_, Assignment>(r#"SELECT * FROM assignments WHERE id = $1"#)
                .bind(assignment_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(assignment)
    }

    pub async fn update_assignment(
        &self,
        assignment_id: Uuid,
        payload: UpdateAssignmentPayload,
    ) -> Result<Assignment> {
        let current = self.get_assignment(assignment_id).await?;
        if let (Some(start), Some(end)) = (
            payload.start_at.or(current.start_at),
            payload.end_at.or(current.end_at),
        ) {
            if start >= end {
                return Err(Error::BadRequest(
                    "Assignment start must be before its end".to_string(),
                ));
            }
        }

        let assignment = sqlx::query_as::<_, Assignment>(
            r#"
            UPDATE assignments
            SET assigned_to_users = COALESCE($1, assigned_to_users),
                assigned_to_roles = COALESCE($2, assigned_to_roles),
                assigned_to_groups = COALESCE($3, assigned_to_groups),
                start_at = COALESCE($4, start_at),
                end_at = COALESCE($5, end_at),
                is_active = COALESCE($6, is_active),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(payload.assigned_to_users)
        .bind(payload.assigned_to_roles)
        .bind(payload.assigned_to_groups)
        .bind(payload.start_at)
        .bind(payload.end_at)
        .bind(payload.is_active)
        .bind(assignment_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(assignment)
    }

    pub async fn list_assignments(&self, test_id: Option<Uuid>) -> Result<Vec<Assignment>> {
        let assignments = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT * FROM assignments
            WHERE ($1::uuid IS NULL OR test_id = $1)
            ORDER BY created_at DESC
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    pub async fn delete_assignment(&self, assignment_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM assignments WHERE id = $1"#)
            .bind(assignment_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(r) => Ok(r.rows_affected() > 0),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::Conflict(
                "Assignment has recorded attempts and cannot be deleted".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the principal is covered by this assignment right now. The
    /// direct channels are checked first; the group channel costs a query and
    /// only runs when the cheap checks miss.
    pub async fn is_eligible(
        &self,
        assignment: &Assignment,
        user_id: Uuid,
        roles: &[String],
    ) -> Result<bool> {
        let now = Utc::now();
        if !eligibility::assignment_is_active(assignment, now) {
            return Ok(false);
        }
        if eligibility::matches_users_or_roles(assignment, user_id, roles) {
            return Ok(true);
        }
        if assignment.assigned_to_groups.is_empty() {
            return Ok(false);
        }
        let groups = self
            .groups
            .load_active_groups(&assignment.assigned_to_groups)
            .await?;
        Ok(eligibility::matches_groups(assignment, user_id, &groups))
    }

    /// Every (assignment, test) pair the principal can currently start,
    /// active assignments within their window against active tests.
    pub async fn available_tests(
        &self,
        user_id: Uuid,
        roles: &[String],
    ) -> Result<Vec<(Assignment, Test)>> {
        let candidates = sqlx::query_as::<_, Assignment>(
            r#"
            SELECT a.* FROM assignments a
            JOIN tests t ON t.id = a.test_id
            WHERE a.is_active = TRUE
              AND t.is_active = TRUE
              AND (a.start_at IS NULL OR a.start_at <= NOW())
              AND (a.end_at IS NULL OR a.end_at >= NOW())
            ORDER BY a.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        // One group fetch for the whole candidate set.
        let mut group_ids: Vec<Uuid> = candidates
            .iter()
            .flat_map(|a| a.assigned_to_groups.iter().copied())
            .collect();
        group_ids.sort();
        group_ids.dedup();
        let groups = self.groups.load_active_groups(&group_ids).await?;

        let mut eligible = Vec::new();
        for assignment in candidates {
            if eligibility::matches_users_or_roles(&assignment, user_id, roles)
                || eligibility::matches_groups(&assignment, user_id, &groups)
            {
                eligible.push(assignment);
            }
        }

        if eligible.is_empty() {
            return Ok(vec![]);
        }

        let mut test_ids: Vec<Uuid> = eligible.iter().map(|a| a.test_id).collect();
        test_ids.sort();
        test_ids.dedup();
        let tests = sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = ANY($1)"#)
            .bind(&test_ids)
            .fetch_all(&self.pool)
            .await?;

        let mut pairs = Vec::with_capacity(eligible.len());
        for assignment in eligible {
            if let Some(test) = tests.iter().find(|t| t.id == assignment.test_id) {
                pairs.push((assignment, test.clone()));
            }
        }
        Ok(pairs)
    }
}
