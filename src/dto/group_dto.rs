use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupPayload {
    #[validate(length(min = 1, max = 255, message = "Group name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    pub members: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateGroupPayload {
    #[validate(length(min = 1, max = 255, message = "Group name must be 1-255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub members: Option<Vec<Uuid>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct MemberPayload {
    pub user_id: Uuid,
}
