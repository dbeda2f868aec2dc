use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::dto::attempt_dto::{
    EvaluateAttemptPayload, EvaluationAttemptView, PageQuery, ReportAttemptView, ReportQuery,
};
use crate::error::Result;
use crate::middleware::auth::{Claims, Permission};
use crate::AppState;

pub async fn pending_evaluation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestEvaluate)?;
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let result = state
        .attempt_service
        .pending_evaluation(page, per_page)
        .await?;
    Ok(Json(result))
}

pub async fn get_attempt_for_evaluation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestEvaluate)?;

    let (attempt, test) = state.attempt_service.get_for_evaluation(id).await?;
    Ok(Json(EvaluationAttemptView::build(&attempt, &test)))
}

#[axum::debug_handler]
pub async fn evaluate_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EvaluateAttemptPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestEvaluate)?;

    let attempt = state
        .attempt_service
        .evaluate_attempt(id, claims.principal_id()?, payload)
        .await?;
    let test = state.test_service.get_test(attempt.test_id).await?;
    Ok(Json(EvaluationAttemptView::build(&attempt, &test)))
}

/// Attempt outcomes for one test: status distribution plus a paginated,
/// optionally status-filtered attempt list.
pub async fn test_report(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestReport)?;
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let report = state
        .attempt_service
        .report_for_test(test_id, query.status, page, per_page)
        .await?;

    let items: Vec<ReportAttemptView> = report
        .attempts
        .attempts
        .iter()
        .map(|attempt| ReportAttemptView::build(attempt, report.test.passing_score))
        .collect();

    Ok(Json(json!({
        "test_id": report.test.id,
        "title": report.test.title,
        "passing_score": report.test.passing_score,
        "summary": report.summary,
        "items": items,
        "total": report.attempts.total,
        "page": report.attempts.page,
        "per_page": report.attempts.per_page,
        "total_pages": report.attempts.total_pages,
    })))
}
