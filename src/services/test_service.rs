use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::test_dto::{CreateTestPayload, UpdateTestPayload};
use crate::error::{is_foreign_key_violation, Error, Result};
use crate::models::test::Test;

#[derive(Debug, serde::Serialize)]
pub struct PaginatedTests {
    #[serde(rename = "items")]
    pub tests: Vec<Test>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Default)]
pub struct TestFilter {
    pub is_active: Option<bool>,
    pub created_by: Option<Uuid>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_test(&self, payload: CreateTestPayload, created_by: Uuid) -> Result<Test> {
        check_schedule(payload.schedule_start, payload.schedule_end)?;
        let question_ids = self
            .prune_question_ids(&payload.question_ids.unwrap_or_default())
            .await?;

        let test = sqlx::query_as::<_, Test>(
            r#"
            INSERT INTO tests (
                title, description, duration_minutes, schedule_start, schedule_end,
                shuffle_questions, shuffle_options, violation_threshold,
                passing_score, question_ids, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.duration_minutes)
        .bind(payload.schedule_start)
        .bind(payload.schedule_end)
        .bind(payload.shuffle_questions.unwrap_or(false))
        .bind(payload.shuffle_options.unwrap_or(false))
        .bind(payload.violation_threshold.unwrap_or(0))
        .bind(payload.passing_score.unwrap_or(0))
        .bind(question_ids)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(test)
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1"#)
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(test)
    }

    pub async fn update_test(&self, test_id: Uuid, payload: UpdateTestPayload) -> Result<Test> {
        let current = self.get_test(test_id).await?;
        check_schedule(
            payload.schedule_start.or(current.schedule_start),
            payload.schedule_end.or(current.schedule_end),
        )?;

        let question_ids = match payload.question_ids {
            Some(ids) => Some(self.prune_question_ids(&ids).await?),
            None => None,
        };

        let test = sqlx::query_as::<_, Test>(
            r#"
            UPDATE tests
            SET title = COALESCE($1, title),
                description = COALESCE($2, description),
                duration_minutes = COALESCE($3, duration_minutes),
                schedule_start = COALESCE($4, schedule_start),
                schedule_end = COALESCE($5, schedule_end),
                shuffle_questions = COALESCE($6, shuffle_questions),
                shuffle_options = COALESCE($7, shuffle_options),
                violation_threshold = COALESCE($8, violation_threshold),
                passing_score = COALESCE($9, passing_score),
                question_ids = COALESCE($10, question_ids),
                is_active = COALESCE($11, is_active),
                updated_at = NOW()
            WHERE id = $12
            RETURNING *
            "#,
        )
        .bind(payload.title)
        .bind(payload.description)
        .bind(payload.duration_minutes)
        .bind(payload.schedule_start)
        .bind(payload.schedule_end)
        .bind(payload.shuffle_questions)
        .bind(payload.shuffle_options)
        .bind(payload.violation_threshold)
        .bind(payload.passing_score)
        .bind(question_ids)
        .bind(payload.is_active)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(test)
    }

    pub async fn list_tests(
        &self,
        page: i64,
        per_page: i64,
        filter: TestFilter,
    ) -> Result<PaginatedTests> {
        let offset = (page - 1) * per_page;
        let search = filter.search.map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM tests
            WHERE ($1::bool IS NULL OR is_active = $1)
              AND ($2::uuid IS NULL OR created_by = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
            "#,
        )
        .bind(filter.is_active)
        .bind(filter.created_by)
        .bind(search.clone())
        .fetch_one(&self.pool)
        .await?;

        let tests = sqlx::query_as::<_, Test>(
            r#"
            SELECT * FROM tests
            WHERE ($1::bool IS NULL OR is_active = $1)
              AND ($2::uuid IS NULL OR created_by = $2)
              AND ($3::text IS NULL OR title ILIKE $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(filter.is_active)
        .bind(filter.created_by)
        .bind(search)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total_pages = if per_page > 0 {
            ((total as f64) / (per_page as f64)).ceil() as i64
        } else {
            1
        };

        Ok(PaginatedTests {
            tests,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn delete_test(&self, test_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM tests WHERE id = $1"#)
            .bind(test_id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(r) => Ok(r.rows_affected() > 0),
            Err(e) if is_foreign_key_violation(&e) => Err(Error::Conflict(
                "Test has recorded attempts and cannot be deleted".to_string(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Keep only question ids that still resolve in the bank, preserving the
    /// author's ordering. Stale references and repeats are dropped silently.
    async fn prune_question_ids(&self, ids: &[Uuid]) -> Result<Vec<Uuid>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let existing: Vec<Uuid> =
            sqlx::query_scalar(r#"SELECT id FROM questions WHERE id = ANY($1)"#)
                .bind(ids)
                .fetch_all(&self.pool)
                .await?;

        Ok(retain_known_unique(ids, &existing))
    }
}

/// The question list of a test is an ordered set: a repeated id collapses
/// onto its first occurrence. Each question snapshots once per attempt and
/// counts once toward the maximum score.
fn retain_known_unique(ids: &[Uuid], existing: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| existing.contains(id) && seen.insert(**id))
        .copied()
        .collect()
}

fn check_schedule(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(Error::BadRequest(
                "Schedule start must be before schedule end".to_string(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn schedule_rejects_inverted_window() {
        let now = Utc::now();
        assert!(check_schedule(Some(now), Some(now - Duration::hours(1))).is_err());
        assert!(check_schedule(Some(now), Some(now)).is_err());
        assert!(check_schedule(Some(now), Some(now + Duration::hours(1))).is_ok());
    }

    #[test]
    fn schedule_allows_open_ends() {
        assert!(check_schedule(None, None).is_ok());
        assert!(check_schedule(Some(Utc::now()), None).is_ok());
        assert!(check_schedule(None, Some(Utc::now())).is_ok());
    }

    #[test]
    fn question_id_lists_drop_repeats_and_stale_refs() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stale = Uuid::new_v4();

        let pruned = retain_known_unique(&[a, stale, b, a, b, a], &[a, b]);
        assert_eq!(pruned, vec![a, b]);

        assert!(retain_known_unique(&[stale, stale], &[]).is_empty());
        assert_eq!(retain_known_unique(&[b, a], &[a, b]), vec![b, a]);
    }
}
