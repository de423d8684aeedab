use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::child::{ChildProfile, UpdateChildRequest};
use crate::models::link_request::is_valid_hhmm;

pub struct ChildService;

impl ChildService {
    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Option<ChildProfile>, ApiError> {
        let child = sqlx::query_as::<_, ChildProfile>("SELECT * FROM children WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(child)
    }

    /// Partial update of a child profile by its own parent. The family code
    /// is immutable and deliberately absent here.
    pub async fn update(
        pool: &PgPool,
        parent_id: Uuid,
        id: Uuid,
        req: &UpdateChildRequest,
    ) -> Result<ChildProfile, ApiError> {
        if let Some(nickname) = &req.nickname {
            if nickname.trim().is_empty() {
                return Err(ApiError::Validation("nickname must not be empty".into()));
            }
        }
        if let Some(age) = req.age {
            if !(1..=19).contains(&age) {
                return Err(ApiError::Validation("age must be between 1 and 19".into()));
            }
        }
        for time in [&req.usage_start_time, &req.usage_end_time].into_iter().flatten() {
            if !is_valid_hhmm(time) {
                return Err(ApiError::Validation("usage times must be HH:MM".into()));
            }
        }
        if let Some(cap) = req.daily_max_completion {
            if cap < 1 {
                return Err(ApiError::Validation(
                    "daily max completion must be at least 1".into(),
                ));
            }
        }

        let existing = Self::get(pool, id).await?.ok_or(ApiError::ChildNotFound)?;
        if existing.parent_id != parent_id {
            return Err(ApiError::Forbidden);
        }

        let child = sqlx::query_as::<_, ChildProfile>(
            "UPDATE children
             SET nickname             = COALESCE($1, nickname),
                 avatar               = COALESCE($2, avatar),
                 age                  = COALESCE($3, age),
                 reward_enabled       = COALESCE($4, reward_enabled),
                 base_coin_reward     = COALESCE($5, base_coin_reward),
                 approval_mode        = COALESCE($6, approval_mode),
                 usage_start_time     = COALESCE($7, usage_start_time),
                 usage_end_time       = COALESCE($8, usage_end_time),
                 daily_max_completion = COALESCE($9, daily_max_completion),
                 push_agreed          = COALESCE($10, push_agreed),
                 recovery_email       = COALESCE($11, recovery_email),
                 updated_at           = NOW()
             WHERE id = $12
             RETURNING *",
        )
        .bind(req.nickname.as_deref().map(str::trim))
        .bind(&req.avatar)
        .bind(req.age)
        .bind(req.reward_enabled)
        .bind(req.base_coin_reward)
        .bind(req.approval_mode.map(|m| m.to_string()))
        .bind(&req.usage_start_time)
        .bind(&req.usage_end_time)
        .bind(req.daily_max_completion)
        .bind(req.push_agreed)
        .bind(&req.recovery_email)
        .bind(id)
        .fetch_one(pool)
        .await?;
        Ok(child)
    }

    /// Redis channel carrying live updates for one child profile.
    pub fn profile_channel(child_id: Uuid) -> String {
        format!("child_profile:{child_id}")
    }

    /// Fan a profile update out to open watch sockets. Best-effort: a dead
    /// Redis must not fail the write that already happened.
    pub async fn publish_profile(
        redis: &mut redis::aio::MultiplexedConnection,
        child: &ChildProfile,
    ) {
        let payload = match serde_json::to_string(child) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("could not serialize child profile for publish: {e}");
                return;
            }
        };
        let result: Result<(), redis::RedisError> = redis::cmd("PUBLISH")
            .arg(Self::profile_channel(child.id))
            .arg(payload)
            .query_async(redis)
            .await;
        if let Err(e) = result {
            tracing::warn!("profile publish failed for child {}: {e}", child.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_channel_is_per_child() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_ne!(
            ChildService::profile_channel(a),
            ChildService::profile_channel(b)
        );
        assert!(ChildService::profile_channel(a).starts_with("child_profile:"));
    }
}
