use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::test_dto::{CreateTestPayload, ListTestsQuery, UpdateTestPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::{Claims, Permission};
use crate::services::test_service::TestFilter;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTestPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    payload.validate()?;

    let test = state
        .test_service
        .create_test(payload, claims.principal_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(test)))
}

pub async fn get_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    let test = state.test_service.get_test(id).await?;
    Ok(Json(test))
}

#[axum::debug_handler]
pub async fn update_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTestPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    payload.validate()?;

    let test = state.test_service.update_test(id, payload).await?;
    Ok(Json(test))
}

pub async fn list_tests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListTestsQuery>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let filter = TestFilter {
        is_active: query.is_active,
        created_by: query.created_by,
        search: query.search,
    };
    let result = state.test_service.list_tests(page, per_page, filter).await?;
    Ok(Json(result))
}

pub async fn delete_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;

    let deleted = state.test_service.delete_test(id).await?;
    if !deleted {
        return Err(Error::NotFound("Test not found".to_string()));
    }
    state
        .audit_service
        .log(
            Some(claims.principal_id()?),
            "test.deleted",
            "test",
            id,
            None,
            None,
            None,
        )
        .await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}
