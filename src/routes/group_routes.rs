use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::group_dto::{CreateGroupPayload, MemberPayload, UpdateGroupPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::{Claims, Permission};
use crate::AppState;

#[axum::debug_handler]
pub async fn create_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateGroupPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageGroups)?;
    payload.validate()?;

    let group = state
        .group_service
        .create_group(payload, claims.principal_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn get_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageGroups)?;
    let group = state.group_service.get_group(id).await?;
    Ok(Json(group))
}

#[axum::debug_handler]
pub async fn update_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateGroupPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageGroups)?;
    payload.validate()?;

    let group = state.group_service.update_group(id, payload).await?;
    Ok(Json(group))
}

pub async fn list_groups(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageGroups)?;
    let groups = state.group_service.list_groups().await?;
    Ok(Json(groups))
}

pub async fn delete_group(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageGroups)?;

    let deleted = state.group_service.delete_group(id).await?;
    if !deleted {
        return Err(Error::NotFound("Group not found".to_string()));
    }
    state
        .audit_service
        .log(
            Some(claims.principal_id()?),
            "group.deleted",
            "eligibility_group",
            id,
            None,
            None,
            None,
        )
        .await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}

#[axum::debug_handler]
pub async fn add_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<MemberPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageGroups)?;
    let group = state.group_service.add_member(id, payload.user_id).await?;
    Ok(Json(group))
}

pub async fn remove_member(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::ManageGroups)?;
    let group = state.group_service.remove_member(id, user_id).await?;
    Ok(Json(group))
}
