use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::middleware::auth::{Claims, Permission};
use crate::AppState;

const AUDITED_ENTITIES: [&str; 5] = [
    "question",
    "test",
    "eligibility_group",
    "assignment",
    "test_attempt",
];

/// Audit trail for one entity, newest first.
pub async fn entity_audit_trail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((entity_type, entity_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse> {
    claims.require(Permission::TestReport)?;
    if !AUDITED_ENTITIES.contains(&entity_type.as_str()) {
        return Err(Error::BadRequest(format!(
            "Unknown audited entity type: {}",
            entity_type
        )));
    }

    let entries = state
        .audit_service
        .list_for_entity(&entity_type, entity_id)
        .await?;
    Ok(Json(entries))
}
