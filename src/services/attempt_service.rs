use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use rand::thread_rng;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::attempt_dto::{
    EvaluateAttemptPayload, ReportViolationPayload, SubmitAttemptPayload, SubmittedAnswer,
};
use crate::error::{is_unique_violation, Error, Result};
use crate::models::answer::AttemptAnswer;
use crate::models::assignment::Assignment;
use crate::models::question::QuestionKind;
use crate::models::snapshot::QuestionSnapshot;
use crate::models::test::Test;
use crate::models::test_attempt::{AttemptStatus, TestAttempt};
use crate::models::violation::ViolationEntry;
use crate::services::assignment_service::AssignmentService;
use crate::services::audit_service::AuditService;
use crate::services::grading_service::{GradingService, ManualMark};
use crate::services::question_service::QuestionService;
use crate::snapshot::{build_snapshots, max_score};
use crate::utils::token::{generate_attempt_token, token_matches};

/// Request metadata recorded alongside violations and audit entries.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

pub struct StartedAttempt {
    pub attempt: TestAttempt,
    pub test: Test,
    pub resumed: bool,
}

pub struct ViolationOutcome {
    pub attempt: TestAttempt,
    pub terminated: bool,
}

#[derive(Debug, serde::Serialize)]
pub struct AttemptStatusSummary {
    pub in_progress: i64,
    pub submitted: i64,
    pub auto_submitted: i64,
    pub pending_evaluation: i64,
    pub average_score: Option<f64>,
}

#[derive(Debug, serde::Serialize)]
pub struct PaginatedAttempts {
    #[serde(rename = "items")]
    pub attempts: Vec<TestAttempt>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

pub struct OwnAttempt {
    pub attempt: TestAttempt,
    pub test_title: String,
    pub passing_score: i32,
}

pub struct TestReportData {
    pub test: Test,
    pub summary: AttemptStatusSummary,
    pub attempts: PaginatedAttempts,
}

#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    audit: AuditService,
    assignments: AssignmentService,
    questions: QuestionService,
}

impl AttemptService {
    pub fn new(pool: PgPool) -> Self {
        let audit = AuditService::new(pool.clone());
        let assignments = AssignmentService::new(pool.clone());
        let questions = QuestionService::new(pool.clone());
        Self {
            pool,
            audit,
            assignments,
            questions,
        }
    }

    /// Start (or resume) an attempt under the given assignment. At most one
    /// live attempt per (test, assignment, principal) can exist; a concurrent
    /// start that loses the insert race resumes the winner's row instead of
    /// failing.
    pub async fn start_attempt(
        &self,
        assignment_id: Uuid,
        user_id: Uuid,
        roles: &[String],
    ) -> Result<StartedAttempt> {
        let now = Utc::now();
        let assignment = self.load_assignment(assignment_id).await?;

        if !self
            .assignments
            .is_eligible(&assignment, user_id, roles)
            .await?
        {
            return Err(Error::Forbidden(
                "Principal is not assigned this test".to_string(),
            ));
        }

        let test = self.load_test(assignment.test_id).await?;
        if !test.is_active {
            return Err(Error::Forbidden("Test is not active".to_string()));
        }
        if !test.schedule_allows(now) {
            return Err(Error::Forbidden(
                "Current time is outside the test window".to_string(),
            ));
        }

        if let Some(existing) = self
            .find_for_triple(test.id, assignment.id, user_id)
            .await?
        {
            let existing = self.expire_if_stale(existing).await?;
            if existing.status == AttemptStatus::InProgress {
                return Ok(StartedAttempt {
                    attempt: existing,
                    test,
                    resumed: true,
                });
            }
            return Err(Error::Forbidden(
                "Attempt already completed for this assignment".to_string(),
            ));
        }

        let questions = self
            .questions
            .load_existing_ordered(&test.question_ids)
            .await?;
        if questions.is_empty() {
            return Err(Error::BadRequest(
                "Test has no questions to take".to_string(),
            ));
        }

        let snapshots = build_snapshots(
            &questions,
            test.shuffle_questions,
            test.shuffle_options,
            &mut thread_rng(),
        );
        let snapshots_json = serde_json::to_value(&snapshots)?;
        let token = generate_attempt_token(get_config().attempt_token_length);
        let expires_at = now + Duration::minutes(test.duration_minutes as i64);

        let insert = sqlx::query_as::<_, TestAttempt>(
            r#"
            INSERT INTO test_attempts (
                test_id, assignment_id, user_id, attempt_token,
                started_at, expires_at, question_snapshots, max_score
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(test.id)
        .bind(assignment.id)
        .bind(user_id)
        .bind(token)
        .bind(now)
        .bind(expires_at)
        .bind(snapshots_json)
        .bind(max_score(&snapshots))
        .fetch_one(&self.pool)
        .await;

        match insert {
            Ok(attempt) => {
                info!(
                    attempt_id = %attempt.id,
                    test_id = %test.id,
                    user_id = %user_id,
                    expires_at = %attempt.expires_at,
                    "attempt started"
                );
                Ok(StartedAttempt {
                    attempt,
                    test,
                    resumed: false,
                })
            }
            Err(e) if is_unique_violation(&e) => {
                let winner = self
                    .find_for_triple(test.id, assignment.id, user_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Conflict("Attempt could not be started".to_string())
                    })?;
                let winner = self.expire_if_stale(winner).await?;
                if winner.status != AttemptStatus::InProgress {
                    return Err(Error::Forbidden(
                        "Attempt already completed for this assignment".to_string(),
                    ));
                }
                Ok(StartedAttempt {
                    attempt: winner,
                    test,
                    resumed: true,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Owner-scoped fetch; runs the lazy expiry check before returning.
    pub async fn get_own_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
    ) -> Result<(TestAttempt, Test)> {
        let attempt = self.fetch_by_id(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(Error::Forbidden(
                "Attempt belongs to another principal".to_string(),
            ));
        }
        let attempt = self.expire_if_stale(attempt).await?;
        let test = self.load_test(attempt.test_id).await?;
        Ok((attempt, test))
    }

    pub async fn list_own_attempts(&self, user_id: Uuid) -> Result<Vec<OwnAttempt>> {
        let rows = sqlx::query_as::<_, TestAttempt>(
            r#"SELECT * FROM test_attempts WHERE user_id = $1 ORDER BY started_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut attempts = Vec::with_capacity(rows.len());
        for row in rows {
            attempts.push(self.expire_if_stale(row).await?);
        }

        let mut test_ids: Vec<Uuid> = attempts.iter().map(|a| a.test_id).collect();
        test_ids.sort();
        test_ids.dedup();
        let tests = sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = ANY($1)"#)
            .bind(&test_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(attempts
            .into_iter()
            .filter_map(|attempt| {
                tests
                    .iter()
                    .find(|t| t.id == attempt.test_id)
                    .map(|t| OwnAttempt {
                        test_title: t.title.clone(),
                        passing_score: t.passing_score,
                        attempt,
                    })
            })
            .collect())
    }

    /// Final submission. Answers replace whatever the row holds, scoring runs
    /// against the frozen snapshot, and the terminal status records whether
    /// the submit beat the deadline. Late submits are accepted but flagged
    /// `auto_submitted`.
    pub async fn submit_attempt(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
        payload: SubmitAttemptPayload,
        client: ClientMeta,
    ) -> Result<TestAttempt> {
        let attempt = self.fetch_by_id(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(Error::Forbidden(
                "Attempt belongs to another principal".to_string(),
            ));
        }
        if !token_matches(&payload.attempt_token, &attempt.attempt_token) {
            return Err(Error::Forbidden("Invalid attempt token".to_string()));
        }
        if attempt.status.is_terminal() {
            return Err(Error::Conflict("Attempt already submitted".to_string()));
        }

        let now = Utc::now();
        let snapshots = attempt.snapshots();
        let answers = normalize_answers(&snapshots, payload.answers)?;
        let status = terminal_status_for_submit(now, attempt.expires_at);

        let finalized = self
            .finalize_with(&attempt, answers, status, now)
            .await?
            .ok_or_else(|| Error::Conflict("Attempt already submitted".to_string()))?;

        info!(
            attempt_id = %finalized.id,
            user_id = %user_id,
            status = finalized.status.as_str(),
            score = finalized.score,
            max_score = finalized.max_score,
            "attempt submitted"
        );
        self.audit
            .log(
                Some(user_id),
                "attempt.submitted",
                "test_attempt",
                finalized.id,
                Some(json!({
                    "status": finalized.status.as_str(),
                    "score": finalized.score,
                    "max_score": finalized.max_score,
                })),
                client.ip,
                client.user_agent,
            )
            .await?;

        Ok(finalized)
    }

    /// Record a proctoring violation. The entry is appended inside the row
    /// update, so concurrent reports serialize on the row and none is lost.
    /// When the test's threshold is enabled and the stored count reaches it,
    /// the attempt is terminated.
    pub async fn report_violation(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
        payload: ReportViolationPayload,
        client: ClientMeta,
    ) -> Result<ViolationOutcome> {
        let attempt = self.fetch_by_id(attempt_id).await?;
        if attempt.user_id != user_id {
            return Err(Error::Forbidden(
                "Attempt belongs to another principal".to_string(),
            ));
        }
        if !token_matches(&payload.attempt_token, &attempt.attempt_token) {
            return Err(Error::Forbidden("Invalid attempt token".to_string()));
        }

        let attempt = self.expire_if_stale(attempt).await?;
        if attempt.status.is_terminal() {
            return Err(Error::Conflict("Attempt already completed".to_string()));
        }

        let now = Utc::now();
        let entry = ViolationEntry {
            violation_type: payload.violation_type.clone(),
            occurred_at: now,
            ip_address: client.ip.clone(),
            user_agent: client.user_agent.clone(),
            details: payload.details.clone(),
        };

        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET violations = violations || $1::jsonb, updated_at = NOW()
            WHERE id = $2 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(serde_json::to_value(&entry)?)
        .bind(attempt.id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::Conflict("Attempt already completed".to_string()))?;

        let count = updated.violation_count();
        let test = self.load_test(updated.test_id).await?;
        if threshold_reached(test.violation_threshold, count) {
            let snapshots = updated.snapshots();
            let mut answers = updated.answer_entries();
            let summary = GradingService::score_attempt(&snapshots, &mut answers);
            let requires_evaluation = has_descriptive(&snapshots);

            let kicked = sqlx::query_as::<_, TestAttempt>(
                r#"
                UPDATE test_attempts
                SET status = 'auto_submitted', submitted_at = $1,
                    answers = $2, score = $3, max_score = $4,
                    requires_evaluation = $5, updated_at = NOW()
                WHERE id = $6 AND status = 'in_progress'
                RETURNING *
                "#,
            )
            .bind(now)
            .bind(serde_json::to_value(&answers)?)
            .bind(summary.score)
            .bind(summary.max_score)
            .bind(requires_evaluation)
            .bind(updated.id)
            .fetch_optional(&self.pool)
            .await?;

            let terminated = match kicked {
                Some(row) => {
                    warn!(
                        attempt_id = %row.id,
                        user_id = %user_id,
                        violations = count,
                        threshold = test.violation_threshold,
                        "attempt terminated after repeated violations"
                    );
                    self.audit
                        .log(
                            Some(user_id),
                            "attempt.violation_terminated",
                            "test_attempt",
                            row.id,
                            Some(json!({
                                "violation_type": payload.violation_type,
                                "violations": count,
                                "threshold": test.violation_threshold,
                            })),
                            client.ip,
                            client.user_agent,
                        )
                        .await?;
                    row
                }
                // A concurrent request finalized the row first; report the
                // state it left behind.
                None => self.fetch_by_id(updated.id).await?,
            };

            return Ok(ViolationOutcome {
                attempt: terminated,
                terminated: true,
            });
        }

        info!(
            attempt_id = %updated.id,
            violation_type = %payload.violation_type,
            violations = count,
            "violation recorded"
        );
        Ok(ViolationOutcome {
            attempt: updated,
            terminated: false,
        })
    }

    /// Terminal attempts whose snapshot contains descriptive questions, oldest
    /// submission first.
    pub async fn pending_evaluation(&self, page: i64, per_page: i64) -> Result<PaginatedAttempts> {
        let offset = (page - 1) * per_page;
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM test_attempts
            WHERE requires_evaluation = TRUE AND status <> 'in_progress'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let attempts = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE requires_evaluation = TRUE AND status <> 'in_progress'
            ORDER BY submitted_at ASC NULLS LAST
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedAttempts {
            attempts,
            total,
            page,
            per_page,
            total_pages: pages_for(total, per_page),
        })
    }

    /// Evaluator-scoped fetch: any attempt, no ownership requirement. The
    /// caller's view keeps the answer key but must never expose the token.
    pub async fn get_for_evaluation(&self, attempt_id: Uuid) -> Result<(TestAttempt, Test)> {
        let attempt = self.fetch_by_id(attempt_id).await?;
        let attempt = self.expire_if_stale(attempt).await?;
        let test = self.load_test(attempt.test_id).await?;
        Ok((attempt, test))
    }

    /// Manual evaluation of descriptive answers. Marks land only on
    /// descriptive entries, the automatic pass re-runs over the merged answer
    /// set, and the attempt leaves the evaluation queue.
    pub async fn evaluate_attempt(
        &self,
        attempt_id: Uuid,
        evaluator_id: Uuid,
        payload: EvaluateAttemptPayload,
    ) -> Result<TestAttempt> {
        let attempt = self.fetch_by_id(attempt_id).await?;
        let attempt = self.expire_if_stale(attempt).await?;
        if attempt.status == AttemptStatus::InProgress {
            return Err(Error::Conflict(
                "Attempt is still in progress".to_string(),
            ));
        }

        let snapshots = attempt.snapshots();
        let mut answers = attempt.answer_entries();
        let marks: Vec<ManualMark> = payload
            .marks
            .into_iter()
            .map(|m| ManualMark {
                question_id: m.question_id,
                marks_awarded: m.marks_awarded,
                feedback: m.feedback,
            })
            .collect();

        GradingService::apply_manual_marks(&snapshots, &mut answers, &marks)?;
        let summary = GradingService::score_attempt(&snapshots, &mut answers);

        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET answers = $1, score = $2, requires_evaluation = FALSE,
                evaluated_by = $3, evaluated_at = NOW(), evaluation_notes = $4,
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(serde_json::to_value(&answers)?)
        .bind(summary.score)
        .bind(evaluator_id)
        .bind(payload.notes.clone())
        .bind(attempt.id)
        .fetch_one(&self.pool)
        .await?;

        info!(
            attempt_id = %updated.id,
            evaluated_by = %evaluator_id,
            score = updated.score,
            "attempt evaluated"
        );
        self.audit
            .log(
                Some(evaluator_id),
                "attempt.evaluated",
                "test_attempt",
                updated.id,
                Some(json!({ "score": updated.score, "max_score": updated.max_score })),
                None,
                None,
            )
            .await?;

        Ok(updated)
    }

    /// Attempts of one test for the reporting surface, with a status
    /// distribution summary. Stale rows of the test are expired first so the
    /// report never shows an `in_progress` attempt that is past its deadline.
    pub async fn report_for_test(
        &self,
        test_id: Uuid,
        status: Option<AttemptStatus>,
        page: i64,
        per_page: i64,
    ) -> Result<TestReportData> {
        let test = self.load_test(test_id).await?;
        self.expire_stale_for_test(test_id).await?;

        let offset = (page - 1) * per_page;
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM test_attempts
            WHERE test_id = $1 AND ($2::attempt_status IS NULL OR status = $2)
            "#,
        )
        .bind(test_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;

        let attempts = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE test_id = $1 AND ($2::attempt_status IS NULL OR status = $2)
            ORDER BY started_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(test_id)
        .bind(status)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let summary = self.status_summary(test_id).await?;

        Ok(TestReportData {
            test,
            summary,
            attempts: PaginatedAttempts {
                attempts,
                total,
                page,
                per_page,
                total_pages: pages_for(total, per_page),
            },
        })
    }

    /// Bulk lazy-expiry pass for the background sweeper. Returns how many
    /// attempts were transitioned; the on-access check remains the
    /// correctness fallback when the sweeper lags.
    pub async fn sweep_expired(&self, limit: i64) -> Result<u64> {
        let stale = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE status = 'in_progress' AND expires_at < NOW()
            ORDER BY expires_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut transitioned = 0u64;
        for attempt in stale {
            let answers = attempt.answer_entries();
            let expires_at = attempt.expires_at;
            if self
                .finalize_with(&attempt, answers, AttemptStatus::AutoSubmitted, expires_at)
                .await?
                .is_some()
            {
                transitioned += 1;
            }
        }
        Ok(transitioned)
    }

    async fn status_summary(&self, test_id: Uuid) -> Result<AttemptStatusSummary> {
        let rows: Vec<(AttemptStatus, i64)> = sqlx::query_as(
            r#"SELECT status, COUNT(*) FROM test_attempts WHERE test_id = $1 GROUP BY status"#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summary = AttemptStatusSummary {
            in_progress: 0,
            submitted: 0,
            auto_submitted: 0,
            pending_evaluation: 0,
            average_score: None,
        };
        for (status, count) in rows {
            match status {
                AttemptStatus::InProgress => summary.in_progress = count,
                AttemptStatus::Submitted => summary.submitted = count,
                AttemptStatus::AutoSubmitted => summary.auto_submitted = count,
            }
        }

        summary.pending_evaluation = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM test_attempts
            WHERE test_id = $1 AND requires_evaluation = TRUE AND status <> 'in_progress'
            "#,
        )
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        summary.average_score = sqlx::query_scalar(
            r#"
            SELECT AVG(score)::float8 FROM test_attempts
            WHERE test_id = $1 AND status <> 'in_progress'
            "#,
        )
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Lazy expiry: transition a stale `in_progress` row before serving it.
    /// `submitted_at` is pinned to the deadline, not the access time. Losing
    /// the conditional update to a concurrent transition is fine; the re-read
    /// returns whatever landed.
    async fn expire_if_stale(&self, attempt: TestAttempt) -> Result<TestAttempt> {
        if !attempt.is_stale(Utc::now()) {
            return Ok(attempt);
        }
        let answers = attempt.answer_entries();
        let expires_at = attempt.expires_at;
        match self
            .finalize_with(&attempt, answers, AttemptStatus::AutoSubmitted, expires_at)
            .await?
        {
            Some(expired) => {
                info!(
                    attempt_id = %expired.id,
                    expired_at = %expires_at,
                    "attempt auto-submitted past its deadline"
                );
                Ok(expired)
            }
            None => self.fetch_by_id(attempt.id).await,
        }
    }

    /// The single terminal write. Conditional on the row still being live;
    /// `None` means some other transition landed first.
    async fn finalize_with(
        &self,
        attempt: &TestAttempt,
        mut answers: Vec<AttemptAnswer>,
        status: AttemptStatus,
        submitted_at: DateTime<Utc>,
    ) -> Result<Option<TestAttempt>> {
        let snapshots = attempt.snapshots();
        let summary = GradingService::score_attempt(&snapshots, &mut answers);
        let requires_evaluation = has_descriptive(&snapshots);

        let updated = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET status = $1, submitted_at = $2, answers = $3,
                score = $4, max_score = $5, requires_evaluation = $6,
                updated_at = NOW()
            WHERE id = $7 AND status = 'in_progress'
            RETURNING *
            "#,
        )
        .bind(status)
        .bind(submitted_at)
        .bind(serde_json::to_value(&answers)?)
        .bind(summary.score)
        .bind(summary.max_score)
        .bind(requires_evaluation)
        .bind(attempt.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    async fn expire_stale_for_test(&self, test_id: Uuid) -> Result<()> {
        let stale = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE test_id = $1 AND status = 'in_progress' AND expires_at < NOW()
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        for attempt in stale {
            let answers = attempt.answer_entries();
            let expires_at = attempt.expires_at;
            self.finalize_with(&attempt, answers, AttemptStatus::AutoSubmitted, expires_at)
                .await?;
        }
        Ok(())
    }

    async fn find_for_triple(
        &self,
        test_id: Uuid,
        assignment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TestAttempt>> {
        let attempt = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE test_id = $1 AND assignment_id = $2 AND user_id = $3
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(test_id)
        .bind(assignment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn fetch_by_id(&self, attempt_id: Uuid) -> Result<TestAttempt> {
        sqlx::query_as::<_, TestAttempt>(r#"SELECT * FROM test_attempts WHERE id = $1"#)
            .bind(attempt_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Attempt not found".to_string()))
    }

    async fn load_assignment(&self, assignment_id: Uuid) -> Result<Assignment> {
        sqlx::query_as::<_, Assignment>(r#"SELECT * FROM assignments WHERE id = $1"#)
            .bind(assignment_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Assignment not found".to_string()))
    }

    async fn load_test(&self, test_id: Uuid) -> Result<Test> {
        sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1"#)
            .bind(test_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::NotFound("Test not found".to_string()))
    }

}

/// Submit after the deadline is still accepted but flagged as automatic.
fn terminal_status_for_submit(now: DateTime<Utc>, expires_at: DateTime<Utc>) -> AttemptStatus {
    if now > expires_at {
        AttemptStatus::AutoSubmitted
    } else {
        AttemptStatus::Submitted
    }
}

/// A threshold of zero disables auto-kick entirely; violations are still
/// recorded.
fn threshold_reached(threshold: i32, count: i32) -> bool {
    threshold >= 1 && count >= threshold
}

fn has_descriptive(snapshots: &[QuestionSnapshot]) -> bool {
    snapshots
        .iter()
        .any(|s| s.kind == QuestionKind::Descriptive)
}

/// Rebuild the stored answer set from a submission. Kind comes from the
/// snapshot, never from the client; unknown ids, duplicates and out-of-range
/// option indices are rejected outright.
fn normalize_answers(
    snapshots: &[QuestionSnapshot],
    submitted: Vec<SubmittedAnswer>,
) -> Result<Vec<AttemptAnswer>> {
    let by_id: HashMap<Uuid, &QuestionSnapshot> =
        snapshots.iter().map(|s| (s.question_id, s)).collect();
    let mut seen: HashSet<Uuid> = HashSet::new();

    let mut answers = Vec::with_capacity(submitted.len());
    for entry in submitted {
        let snapshot = by_id.get(&entry.question_id).ok_or_else(|| {
            Error::BadRequest(format!(
                "Question {} is not part of this attempt",
                entry.question_id
            ))
        })?;
        if !seen.insert(entry.question_id) {
            return Err(Error::BadRequest(format!(
                "Duplicate answer for question {}",
                entry.question_id
            )));
        }

        let answer = match snapshot.kind {
            QuestionKind::Mcq => {
                if let Some(idx) = entry.selected_option_index {
                    if idx < 0 || idx as usize >= snapshot.options.len() {
                        return Err(Error::BadRequest(format!(
                            "Selected option {} is out of range for question {}",
                            idx, entry.question_id
                        )));
                    }
                }
                AttemptAnswer {
                    question_id: entry.question_id,
                    kind: QuestionKind::Mcq,
                    selected_option_index: entry.selected_option_index,
                    answer_text: None,
                    is_correct: None,
                    marks_awarded: 0,
                    feedback: None,
                }
            }
            QuestionKind::Descriptive => AttemptAnswer {
                question_id: entry.question_id,
                kind: QuestionKind::Descriptive,
                selected_option_index: None,
                answer_text: entry.answer_text,
                is_correct: None,
                marks_awarded: 0,
                feedback: None,
            },
        };
        answers.push(answer);
    }
    Ok(answers)
}

fn pages_for(total: i64, per_page: i64) -> i64 {
    if per_page > 0 {
        ((total as f64) / (per_page as f64)).ceil() as i64
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(kind: QuestionKind, options: usize, marks: i32) -> QuestionSnapshot {
        QuestionSnapshot {
            question_id: Uuid::new_v4(),
            kind,
            text: "q".into(),
            options: (0..options).map(|i| format!("opt {}", i)).collect(),
            marks,
            correct_option_index: (kind == QuestionKind::Mcq).then_some(0),
        }
    }

    #[test]
    fn late_submit_is_flagged_auto() {
        let now = Utc::now();
        assert_eq!(
            terminal_status_for_submit(now, now + Duration::minutes(1)),
            AttemptStatus::Submitted
        );
        assert_eq!(
            terminal_status_for_submit(now, now - Duration::seconds(1)),
            AttemptStatus::AutoSubmitted
        );
    }

    #[test]
    fn zero_threshold_never_kicks() {
        assert!(!threshold_reached(0, 1));
        assert!(!threshold_reached(0, 100));
        assert!(!threshold_reached(3, 2));
        assert!(threshold_reached(3, 3));
        assert!(threshold_reached(1, 1));
        assert!(threshold_reached(3, 7));
    }

    #[test]
    fn normalize_takes_kind_from_snapshot() {
        let mcq = snapshot(QuestionKind::Mcq, 3, 1);
        let descriptive = snapshot(QuestionKind::Descriptive, 0, 5);
        let answers = normalize_answers(
            &[mcq.clone(), descriptive.clone()],
            vec![
                SubmittedAnswer {
                    question_id: mcq.question_id,
                    selected_option_index: Some(2),
                    answer_text: Some("ignored for mcq".into()),
                },
                SubmittedAnswer {
                    question_id: descriptive.question_id,
                    selected_option_index: Some(1),
                    answer_text: Some("lifetimes".into()),
                },
            ],
        )
        .unwrap();

        assert_eq!(answers[0].kind, QuestionKind::Mcq);
        assert_eq!(answers[0].selected_option_index, Some(2));
        assert_eq!(answers[0].answer_text, None);
        assert_eq!(answers[1].kind, QuestionKind::Descriptive);
        assert_eq!(answers[1].selected_option_index, None);
        assert_eq!(answers[1].answer_text.as_deref(), Some("lifetimes"));
    }

    #[test]
    fn normalize_rejects_unknown_question() {
        let snap = snapshot(QuestionKind::Mcq, 2, 1);
        let result = normalize_answers(
            &[snap],
            vec![SubmittedAnswer {
                question_id: Uuid::new_v4(),
                selected_option_index: Some(0),
                answer_text: None,
            }],
        );
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn normalize_rejects_duplicates_and_bad_indices() {
        let snap = snapshot(QuestionKind::Mcq, 2, 1);
        let dup = normalize_answers(
            &[snap.clone()],
            vec![
                SubmittedAnswer {
                    question_id: snap.question_id,
                    selected_option_index: Some(0),
                    answer_text: None,
                },
                SubmittedAnswer {
                    question_id: snap.question_id,
                    selected_option_index: Some(1),
                    answer_text: None,
                },
            ],
        );
        assert!(matches!(dup, Err(Error::BadRequest(_))));

        let out_of_range = normalize_answers(
            &[snap.clone()],
            vec![SubmittedAnswer {
                question_id: snap.question_id,
                selected_option_index: Some(2),
                answer_text: None,
            }],
        );
        assert!(matches!(out_of_range, Err(Error::BadRequest(_))));

        let negative = normalize_answers(
            &[snap.clone()],
            vec![SubmittedAnswer {
                question_id: snap.question_id,
                selected_option_index: Some(-1),
                answer_text: None,
            }],
        );
        assert!(matches!(negative, Err(Error::BadRequest(_))));
    }

    #[test]
    fn normalize_allows_unanswered_mcq_entry() {
        let snap = snapshot(QuestionKind::Mcq, 2, 1);
        let answers = normalize_answers(
            &[snap.clone()],
            vec![SubmittedAnswer {
                question_id: snap.question_id,
                selected_option_index: None,
                answer_text: None,
            }],
        )
        .unwrap();
        assert_eq!(answers[0].selected_option_index, None);
    }

    #[test]
    fn descriptive_snapshot_flags_evaluation() {
        let mixed = [
            snapshot(QuestionKind::Mcq, 2, 1),
            snapshot(QuestionKind::Descriptive, 0, 5),
        ];
        assert!(has_descriptive(&mixed));
        assert!(!has_descriptive(&mixed[..1]));
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(pages_for(0, 20), 0);
        assert_eq!(pages_for(1, 20), 1);
        assert_eq!(pages_for(20, 20), 1);
        assert_eq!(pages_for(21, 20), 2);
    }
}
