use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::group_dto::{CreateGroupPayload, UpdateGroupPayload};
use crate::error::{is_unique_violation, Error, Result};
use crate::models::group::EligibilityGroup;

#[derive(Clone)]
pub struct GroupService {
    pool: PgPool,
}

impl GroupService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_group(
        &self,
        payload: CreateGroupPayload,
        created_by: Uuid,
    ) -> Result<EligibilityGroup> {
        let result = sqlx::query_as::<_, EligibilityGroup>(
            r#"
            INSERT INTO eligibility_groups (name, description, members, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(payload.name.clone())
        .bind(payload.description)
        .bind(dedupe(payload.members.unwrap_or_default()))
        .bind(created_by)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(group) => Ok(group),
            Err(e) if is_unique_violation(&e) => Err(Error::Conflict(format!(
                "Group '{}' already exists",
                payload.name
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_group(&self, group_id: Uuid) -> Result<EligibilityGroup> {
        let group = sqlx::query_as::<_, EligibilityGroup>(
            r#"SELECT * FROM eligibility_groups WHERE id = $1"#,
        )
        .bind(group_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    pub async fn update_group(
        &self,
        group_id: Uuid,
        payload: UpdateGroupPayload,
    ) -> Result<EligibilityGroup> {
        let result = sqlx::query_as::<_, EligibilityGroup>(
            r#"
            UPDATE eligibility_groups
            SET name = COALESCE($1, name),
                description = COALESCE($2, description),
                members = COALESCE($3, members),
                is_active = COALESCE($4, is_active),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(payload.name)
        .bind(payload.description)
        .bind(payload.members.map(dedupe))
        .bind(payload.is_active)
        .bind(group_id)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(group) => Ok(group),
            Err(e) if is_unique_violation(&e) => {
                Err(Error::Conflict("Group name already taken".to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn list_groups(&self) -> Result<Vec<EligibilityGroup>> {
        let groups = sqlx::query_as::<_, EligibilityGroup>(
            r#"SELECT * FROM eligibility_groups ORDER BY name"#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    pub async fn delete_group(&self, group_id: Uuid) -> Result<bool> {
        let result = sqlx::query(r#"DELETE FROM eligibility_groups WHERE id = $1"#)
            .bind(group_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Idempotent: adding a member twice leaves a single entry.
    pub async fn add_member(&self, group_id: Uuid, user_id: Uuid) -> Result<EligibilityGroup> {
        let group = sqlx::query_as::<_, EligibilityGroup>(
            r#"
            UPDATE eligibility_groups
            SET members = (
                    SELECT ARRAY(SELECT DISTINCT m FROM unnest(members || $2) AS m)
                ),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    pub async fn remove_member(&self, group_id: Uuid, user_id: Uuid) -> Result<EligibilityGroup> {
        let group = sqlx::query_as::<_, EligibilityGroup>(
            r#"
            UPDATE eligibility_groups
            SET members = array_remove(members, $2),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(group_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(group)
    }

    /// Groups referenced by an assignment's group channel, active ones only.
    pub async fn load_active_groups(&self, ids: &[Uuid]) -> Result<Vec<EligibilityGroup>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let groups = sqlx::query_as::<_, EligibilityGroup>(
            r#"SELECT * FROM eligibility_groups WHERE id = ANY($1) AND is_active = TRUE"#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }
}

fn dedupe(mut members: Vec<Uuid>) -> Vec<Uuid> {
    members.sort();
    members.dedup();
    members
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_collapses_repeats() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let out = dedupe(vec![a, b, a, a, b]);
        assert_eq!(out.len(), 2);
        assert!(out.contains(&a) && out.contains(&b));
    }

    #[test]
    fn dedupe_keeps_empty_empty() {
        assert!(dedupe(vec![]).is_empty());
    }
}
