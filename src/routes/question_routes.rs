use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::dto::question_dto::{CreateQuestionPayload, ListQuestionsQuery, UpdateQuestionPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::{Claims, Permission};
use crate::services::question_service::QuestionFilter;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    payload.validate()?;

    let question = state
        .question_service
        .create_question(payload, claims.principal_id()?)
        .await?;
    Ok((StatusCode::CREATED, Json(question)))
}

pub async fn get_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    let question = state.question_service.get_question(id).await?;
    Ok(Json(question))
}

#[axum::debug_handler]
pub async fn update_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuestionPayload>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    payload.validate()?;

    let question = state.question_service.update_question(id, payload).await?;
    Ok(Json(question))
}

pub async fn list_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ListQuestionsQuery>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);

    let filter = QuestionFilter {
        kind: query.kind,
        difficulty: query.difficulty,
        tag: query.tag,
        search: query.search,
    };
    let result = state
        .question_service
        .list_questions(page, per_page, filter)
        .await?;
    Ok(Json(result))
}

pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestCreate)?;

    let deleted = state.question_service.delete_question(id).await?;
    if !deleted {
        return Err(Error::NotFound("Question not found".to_string()));
    }
    state
        .audit_service
        .log(
            Some(claims.principal_id()?),
            "question.deleted",
            "question",
            id,
            None,
            None,
            None,
        )
        .await?;
    Ok(Json(json!({ "status": "deleted", "id": id })))
}
