use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::parent::{Parent, UpdateParentRequest};

pub struct ParentService;

impl ParentService {
    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<Parent>, ApiError> {
        let parent = sqlx::query_as::<_, Parent>("SELECT * FROM parents WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(parent)
    }

    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateParentRequest,
    ) -> Result<Parent, ApiError> {
        if let Some(name) = &req.display_name {
            if name.trim().is_empty() {
                return Err(ApiError::Validation("display name must not be empty".into()));
            }
        }
        let parent = sqlx::query_as::<_, Parent>(
            "UPDATE parents
             SET display_name = COALESCE($1, display_name),
                 photo_url    = COALESCE($2, photo_url),
                 updated_at   = NOW()
             WHERE id = $3
             RETURNING *",
        )
        .bind(req.display_name.as_deref().map(str::trim))
        .bind(&req.photo_url)
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(parent)
    }

    pub async fn set_phone_verified(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE parents SET phone_verified = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn set_onboarding_completed(pool: &PgPool, id: Uuid) -> Result<(), ApiError> {
        sqlx::query(
            "UPDATE parents SET onboarding_completed = TRUE, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn set_premium(pool: &PgPool, id: Uuid, active: bool) -> Result<Parent, ApiError> {
        let parent = sqlx::query_as::<_, Parent>(
            "UPDATE parents SET is_premium = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
        )
        .bind(active)
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(parent)
    }
}
