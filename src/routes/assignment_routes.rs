use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;

use crate::dto::assignment_dto::{
    CreateAssignmentPayload, EligibleTestView, ListAssignmentsQuery, UpdateAssignmentPayload,
};
use crate::error::{Error, Result};
use crate::middleware::auth::{Claims, Permission};
use crate::AppState;

#[axum::debug_handler]
pub async fn create_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateAssignmentPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestAssign)?;

    let assignment = state
        .assignment_service
        .create_assignment(payload, claims.principal_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn get_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestAssign)?;
    let assignment = state.assignment_service.get_assignment(id).await?;
    Ok(Json(assignment))
}

#[axum::debug_handler]
pub async fn update_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssignmentPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestAssign)?;
    let assignment = state
        .assignment_service
        .update_assignment(id, payload)
        .await?;
    Ok(Json(assignment))
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListAssignmentsQuery>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestAssign)?;
    let assignments = state
        .assignment_service
        .list_assignments(query.test_id)
        .await?;
    Ok(Json(assignments))
}

pub async fn delete_assignment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestAssign)?;

    let deleted = state.assignment_service.delete_assignment(id).await?;
    if !deleted {
        return Err(Error::NotFound("Assignment not found".to_string()));
    }
    state
        .audit_service
        .log(
            Some(claims.principal_id()?),
            "assignment.deleted",
            "assignment",
            id,
            None,
            None,
            None,
        )
        .await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

/// Everything the caller could start an attempt on right now.
pub async fn list_eligible(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestTake)?;

    let pairs = state
        .assignment_service
        .available_tests(claims.principal_id()?, &claims.roles)
        .await?;
    let items: Vec<EligibleTestView> = pairs
        .iter()
        .map(|(assignment, test)| EligibleTestView::from_pair(assignment, test))
        .collect();
    Ok(Json(items))
}
