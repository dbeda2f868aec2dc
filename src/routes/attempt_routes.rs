use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{
    AttemptView, OwnAttemptView, ReportViolationPayload, StartAttemptPayload,
    StartAttemptResponse, SubmitAttemptPayload, ViolationAck,
};
use crate::error::Result;
use crate::middleware::auth::{Claims, Permission};
use crate::services::attempt_service::ClientMeta;
use crate::AppState;

fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string());
    let user_agent = headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    ClientMeta { ip, user_agent }
}

#[utoipa::path(
    post,
    path = "/api/attempts/start",
    request_body = StartAttemptPayload,
    responses(
        (status = 201, description = "Attempt created; token and question list returned"),
        (status = 200, description = "Live attempt resumed"),
        (status = 403, description = "Not assigned, outside the window, or already completed"),
    ),
)]
#[axum::debug_handler]
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestTake)?;

    let started = state
        .attempt_service
        .start_attempt(payload.assignment_id, claims.principal_id()?, &claims.roles)
        .await?;

    let status = if started.resumed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    let body = StartAttemptResponse::build(&started.attempt, &started.test, started.resumed);
    Ok((status, Json(body)))
}

pub async fn my_attempts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestTake)?;

    let attempts = state
        .attempt_service
        .list_own_attempts(claims.principal_id()?)
        .await?;
    let items: Vec<OwnAttemptView> = attempts
        .into_iter()
        .map(|own| OwnAttemptView {
            id: own.attempt.id,
            test_id: own.attempt.test_id,
            test_title: own.test_title,
            status: own.attempt.status,
            started_at: own.attempt.started_at,
            expires_at: own.attempt.expires_at,
            submitted_at: own.attempt.submitted_at,
            score: own.attempt.score,
            max_score: own.attempt.max_score,
            passed: own
                .attempt
                .status
                .is_terminal()
                .then(|| own.attempt.score >= own.passing_score),
        })
        .collect();
    Ok(Json(items))
}

pub async fn get_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestTake)?;

    let (attempt, test) = state
        .attempt_service
        .get_own_attempt(id, claims.principal_id()?)
        .await?;
    Ok(Json(AttemptView::build(&attempt, test.passing_score)))
}

#[utoipa::path(
    post,
    path = "/api/attempts/{id}/submit",
    params(("id" = Uuid, Path, description = "Attempt ID")),
    request_body = SubmitAttemptPayload,
    responses(
        (status = 200, description = "Attempt graded and closed"),
        (status = 403, description = "Wrong owner or invalid attempt token"),
        (status = 409, description = "Attempt already submitted"),
    ),
)]
#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<SubmitAttemptPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestTake)?;
    payload.validate()?;

    let attempt = state
        .attempt_service
        .submit_attempt(id, claims.principal_id()?, payload, client_meta(&headers))
        .await?;
    let test = state.test_service.get_test(attempt.test_id).await?;
    Ok(Json(AttemptView::build(&attempt, test.passing_score)))
}

#[axum::debug_handler]
pub async fn report_violation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(payload): Json<ReportViolationPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestTake)?;
    payload.validate()?;

    let outcome = state
        .attempt_service
        .report_violation(id, claims.principal_id()?, payload, client_meta(&headers))
        .await?;
    Ok(Json(ViolationAck {
        attempt_id: outcome.attempt.id,
        status: outcome.attempt.status,
        violations: outcome.attempt.violation_count(),
        terminated: outcome.terminated,
    }))
}
