use std::collections::HashSet;

use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::question_dto::{CreateQuestionPayload, UpdateQuestionPayload};
use crate::error::{Error, Result};
use crate::models::question::{Difficulty, Question, QuestionKind, QuestionOption};

#[derive(Debug, serde::Serialize)]
pub struct PaginatedQuestions {
    #[serde(rename = "items")]
    pub questions: Vec<Question>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Default)]
pub struct QuestionFilter {
    pub kind: Option<QuestionKind>,
    pub difficulty: Option<Difficulty>,
    pub tag: Option<String>,
    pub search: Option<String>,
}

#[derive(Clone)]
pub struct QuestionService {
    pool: PgPool,
}

impl QuestionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_question(
        &self,
        payload: CreateQuestionPayload,
        created_by: Uuid,
    ) -> Result<Question> {
        let options = check_options(payload.kind, payload.options.unwrap_or_default())?;
        let options_json = serde_json::to_value(&options)?;

        let question = sqlx::query_as::<_, Question>(
            r#"
            INSERT INTO questions (kind, text, options, marks, difficulty, tags, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payload.kind)
        .bind(payload.text)
        .bind(options_json)
        .bind(payload.marks.unwrap_or(1))
        .bind(payload.difficulty.unwrap_or(Difficulty::Medium))
        .bind(payload.tags.unwrap_or_default())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn get_question(&self, question_id: Uuid) -> Result<Question> {
        let question =
            sqlx::query_as::<_, Question>(r#"SELECT * FROM questions WHERE id = $1"#)
                .bind(question_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(question)
    }

    pub async fn update_question(
        &self,
        question_id: Uuid,
        payload: UpdateQuestionPayload,
    ) -> Result<Question> {
        let current = self.get_question(question_id).await?;
        let kind = payload.kind.unwrap_or(current.kind);
        let options_json = match payload.options {
            Some(options) => Some(serde_json::to_value(check_options(kind, options)?)?),
            None => {
                if payload.kind.is_some() && kind != current.kind {
                    // Kind change without an option list: re-check what is stored.
                    let stored = current.option_list();
                    Some(serde_json::to_value(check_options(kind, stored)?)?)
                } else {
                    None
                }
            }
        };

        let question = sqlx::query_as::<_, Question>(
            r#"
            UPDATE questions
            SET kind = COALESCE($1, kind),
                text = COALESCE($2, text),
                options = COALESCE($3, options),
                marks = COALESCE($4, marks),
                difficulty = COALESCE($5, difficulty),
                tags = COALESCE($6, tags),
                updated_at = NOW()
            WHERE id = $7
            RETURNING *
            "#,
        )
        .bind(payload.kind)
        .bind(payload.text)
        .bind(options_json)
        .bind(payload.marks)
        .bind(payload.difficulty)
        .bind(payload.tags)
        .bind(question_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn list_questions(
        &self,
        page: i64,
        per_page: i64,
        filter: QuestionFilter,
    ) -> Result<PaginatedQuestions> {
        let offset = (page - 1) * per_page;
        let search = filter.search.map(|s| format!("%{}%", s));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM questions
            WHERE ($1::question_kind IS NULL OR kind = $1)
              AND ($2::question_difficulty IS NULL OR difficulty = $2)
              AND ($3::text IS NULL OR $3 = ANY(tags))
              AND ($4::text IS NULL OR text ILIKE $4)
            "#,
        )
        .bind(filter.kind)
        .bind(filter.difficulty)
        .bind(filter.tag.clone())
        .bind(search.clone())
        .fetch_one(&self.pool)
        .await?;

        let questions = sqlx::query_as::<_, Question>(
            r#"
            SELECT * FROM questions
            WHERE ($1::question_kind IS NULL OR kind = $1)
              AND ($2::question_difficulty IS NULL OR difficulty = $2)
              AND ($3::text IS NULL OR $3 = ANY(tags))
              AND ($4::text IS NULL OR text ILIKE $4)
            ORDER BY created_at DESC
            LIMIT $5 OFFSET $6
            "#,
        )
        .bind(filter.kind)
        .bind(filter.difficulty)
        .bind(filter.tag)
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

        Ok(PaginatedQuestions {
            questions,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    /// Deleting a bank question never touches attempts already taken: they
    /// grade against their own frozen snapshot. Tests referencing the id are
    /// pruned the next time they are saved or snapshotted.
    pub async fn delete_question(&self, question_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM questions WHERE id = $1"#)
            .bind(question_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetch the given questions preserving the order of `ids`. Repeats and
    /// ids that no longer resolve are silently skipped; each question loads
    /// at most once.
    pub async fn load_existing_ordered(&self, ids: &[Uuid]) -> Result<Vec<Question>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, Question>(
            r#"SELECT * FROM questions WHERE id = ANY($1)"#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(order_by_ids(&rows, ids))
    }
}

/// Reorder `rows` to follow `ids`, one entry per distinct id regardless of
/// how often it repeats.
fn order_by_ids(rows: &[Question], ids: &[Uuid]) -> Vec<Question> {
    let mut seen = HashSet::with_capacity(ids.len());
    let mut ordered = Vec::with_capacity(rows.len());
    for id in ids {
        if !seen.insert(*id) {
            continue;
        }
        if let Some(q) = rows.iter().find(|q| q.id == *id) {
            ordered.push(q.clone());
        }
    }
    ordered
}

/// MCQ questions need at least two options and exactly one flagged correct;
/// descriptive questions carry none.
fn check_options(kind: QuestionKind, options: Vec<QuestionOption>) -> Result<Vec<QuestionOption>> {
    match kind {
        QuestionKind::Descriptive => {
            if options.is_empty() {
                Ok(options)
            } else {
                Err(Error::BadRequest(
                    "Descriptive questions cannot carry options".to_string(),
                ))
            }
        }
        QuestionKind::Mcq => {
            if options.len() < 2 {
                return Err(Error::BadRequest(
                    "Multiple-choice questions need at least two options".to_string(),
                ));
            }
            let correct = options.iter().filter(|o| o.is_correct).count();
            if correct != 1 {
                return Err(Error::BadRequest(
                    "Multiple-choice questions need exactly one correct option".to_string(),
                ));
            }
            Ok(options)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(flags: &[bool]) -> Vec<QuestionOption> {
        flags
            .iter()
            .enumerate()
            .map(|(i, correct)| QuestionOption {
                text: format!("option {}", i),
                is_correct: *correct,
            })
            .collect()
    }

    #[test]
    fn mcq_needs_exactly_one_correct_option() {
        assert!(check_options(QuestionKind::Mcq, opts(&[true, false])).is_ok());
        assert!(check_options(QuestionKind::Mcq, opts(&[false, false])).is_err());
        assert!(check_options(QuestionKind::Mcq, opts(&[true, true])).is_err());
        assert!(check_options(QuestionKind::Mcq, opts(&[true])).is_err());
    }

    #[test]
    fn descriptive_rejects_options() {
        assert!(check_options(QuestionKind::Descriptive, vec![]).is_ok());
        assert!(check_options(QuestionKind::Descriptive, opts(&[true, false])).is_err());
    }

    fn question(marks: i32) -> Question {
        Question {
            id: Uuid::new_v4(),
            kind: QuestionKind::Mcq,
            text: "2 + 2?".into(),
            options: serde_json::json!([
                {"text": "3", "is_correct": false},
                {"text": "4", "is_correct": true}
            ]),
            marks,
            difficulty: Difficulty::Easy,
            tags: vec![],
            created_by: Uuid::new_v4(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn ordered_load_collapses_repeated_ids() {
        let qa = question(5);
        let qb = question(3);
        let rows = vec![qa.clone(), qb.clone()];

        let ordered = order_by_ids(&rows, &[qb.id, qa.id, qb.id, qa.id]);
        let got: Vec<Uuid> = ordered.iter().map(|q| q.id).collect();
        assert_eq!(got, vec![qb.id, qa.id]);
        assert_eq!(ordered.iter().map(|q| q.marks).sum::<i32>(), 8);
    }

    #[test]
    fn ordered_load_skips_unresolved_ids() {
        let qa = question(5);
        let gone = Uuid::new_v4();
        let ordered = order_by_ids(&[qa.clone()], &[gone, qa.id, gone]);
        assert_eq!(ordered.len(), 1);
        assert_eq!(ordered[0].id, qa.id);
    }
}
