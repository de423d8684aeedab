use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::child::ChildProfile;
use crate::models::link_request::{
    CreateLinkRequestRequest, LinkRequest, LinkRequestStatus, ParentApprovalPayload,
    DEFAULT_REJECTION_REASON,
};
use crate::services::devices::DevicePreferenceService;
use crate::services::family::FamilyService;

pub struct LinkRequestService;

impl LinkRequestService {
    /// Child-side entry point: validates the family code, writes a pending
    /// request, and (when the device identifies itself) records the request
    /// id as that device's active-request pointer.
    pub async fn create(
        pool: &PgPool,
        req: &CreateLinkRequestRequest,
    ) -> Result<LinkRequest, ApiError> {
        let code = FamilyService::normalize_code(&req.family_code);

        let group_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE invite_code = $1)")
                .bind(&code)
                .fetch_one(pool)
                .await?;
        if !group_exists {
            return Err(ApiError::InvalidFamilyCode);
        }

        let nickname = req.child_nickname.trim();
        if nickname.is_empty() {
            return Err(ApiError::Validation("nickname must not be empty".into()));
        }
        if req.child_avatar.trim().is_empty() {
            return Err(ApiError::Validation("avatar must not be empty".into()));
        }

        let request = sqlx::query_as::<_, LinkRequest>(
            "INSERT INTO link_requests (family_code, child_nickname, child_avatar, child_age)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(&code)
        .bind(nickname)
        .bind(&req.child_avatar)
        .bind(req.child_age)
        .fetch_one(pool)
        .await?;

        if let Some(device_id) = &req.device_id {
            DevicePreferenceService::set_active_request(pool, device_id, request.id).await?;
        }

        tracing::info!("link request {} created for family {code}", request.id);
        Ok(request)
    }

    /// Point lookup. `None` means the request was lost/deleted — callers
    /// treat their local pointer as stale and prompt re-creation.
    pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<LinkRequest>, ApiError> {
        let request = sqlx::query_as::<_, LinkRequest>("SELECT * FROM link_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(request)
    }

    /// Pending requests for the calling parent's family code, most recent
    /// first. Empty when the parent has no group yet.
    pub async fn list_pending_for_parent(
        pool: &PgPool,
        parent_id: Uuid,
    ) -> Result<Vec<LinkRequest>, ApiError> {
        let code: Option<String> =
            sqlx::query_scalar("SELECT group_code FROM parents WHERE id = $1")
                .bind(parent_id)
                .fetch_optional(pool)
                .await?
                .flatten();
        let Some(code) = code else {
            return Ok(Vec::new());
        };

        let requests = sqlx::query_as::<_, LinkRequest>(
            "SELECT * FROM link_requests
             WHERE family_code = $1 AND status = 'pending'
             ORDER BY created_at DESC",
        )
        .bind(&code)
        .fetch_all(pool)
        .await?;
        Ok(requests)
    }

    /// The approval workflow: the only multi-entity mutation in the system.
    /// All three writes (child profile, roster append, request resolution)
    /// happen in one transaction; the request row is locked so two racing
    /// approvals cannot both pass the pending check.
    pub async fn approve(
        pool: &PgPool,
        parent_id: Uuid,
        request_id: Uuid,
        payload: &ParentApprovalPayload,
    ) -> Result<ChildProfile, ApiError> {
        payload.validate().map_err(ApiError::Validation)?;

        let mut tx = pool.begin().await?;
        let request =
            Self::lock_pending(&mut tx, parent_id, request_id, LinkRequestStatus::Approved).await?;

        let child_id = Uuid::new_v4();
        let child = sqlx::query_as::<_, ChildProfile>(
            "INSERT INTO children
                 (id, family_code, parent_id, nickname, avatar, age,
                  reward_enabled, base_coin_reward, approval_mode,
                  usage_start_time, usage_end_time, daily_max_completion,
                  push_agreed, recovery_email)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING *",
        )
        .bind(child_id)
        .bind(&request.family_code)
        .bind(parent_id)
        .bind(payload.confirmed_nickname.trim())
        .bind(&request.child_avatar)
        .bind(payload.confirmed_age)
        .bind(payload.reward_enabled)
        .bind(payload.base_coin_reward)
        .bind(payload.approval_mode.to_string())
        .bind(&payload.usage_start_time)
        .bind(&payload.usage_end_time)
        .bind(payload.daily_max_completion)
        .bind(payload.push_agreed)
        .bind(payload.recovery_email.as_deref().unwrap_or(""))
        .fetch_one(&mut *tx)
        .await?;

        // Roster append — safe to retry, the junction pk absorbs duplicates.
        sqlx::query(
            "INSERT INTO group_children (family_code, child_id) VALUES ($1, $2)
             ON CONFLICT DO NOTHING",
        )
        .bind(&request.family_code)
        .bind(child_id)
        .execute(&mut *tx)
        .await?;

        let snapshot =
            serde_json::to_value(payload).map_err(|e| ApiError::Internal(e.into()))?;
        let resolved = sqlx::query(
            "UPDATE link_requests
             SET status = 'approved', parent_id = $1, child_id = $2,
                 parent_approval = $3, updated_at = NOW()
             WHERE id = $4 AND status = 'pending'",
        )
        .bind(parent_id)
        .bind(child_id)
        .bind(&snapshot)
        .bind(request_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if resolved != 1 {
            return Err(ApiError::RequestNotPending);
        }

        tx.commit().await?;
        tracing::info!(
            "link request {request_id} approved by {parent_id}, child {child_id} created"
        );
        Ok(child)
    }

    /// Rejection resolves the request and nothing else — no child profile,
    /// no roster change.
    pub async fn reject(
        pool: &PgPool,
        parent_id: Uuid,
        request_id: Uuid,
        reason: Option<String>,
    ) -> Result<LinkRequest, ApiError> {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

        let mut tx = pool.begin().await?;
        Self::lock_pending(&mut tx, parent_id, request_id, LinkRequestStatus::Rejected).await?;

        let request = sqlx::query_as::<_, LinkRequest>(
            "UPDATE link_requests
             SET status = 'rejected', parent_id = $1, rejection_reason = $2, updated_at = NOW()
             WHERE id = $3 AND status = 'pending'
             RETURNING *",
        )
        .bind(parent_id)
        .bind(&reason)
        .bind(request_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("link request {request_id} rejected by {parent_id}");
        Ok(request)
    }

    /// Shared precondition check for approve/reject: the request must exist,
    /// be pending (row-locked for the rest of the transaction), and belong to
    /// the resolving parent's own family code.
    async fn lock_pending(
        tx: &mut Transaction<'_, Postgres>,
        parent_id: Uuid,
        request_id: Uuid,
        next: LinkRequestStatus,
    ) -> Result<LinkRequest, ApiError> {
        let request = sqlx::query_as::<_, LinkRequest>(
            "SELECT * FROM link_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(request_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(ApiError::RequestNotFound)?;

        let status: LinkRequestStatus = request.status.parse().map_err(ApiError::Internal)?;
        if !status.can_transition_to(next) {
            return Err(ApiError::RequestNotPending);
        }

        let caller_code: Option<String> =
            sqlx::query_scalar("SELECT group_code FROM parents WHERE id = $1")
                .bind(parent_id)
                .fetch_optional(&mut **tx)
                .await?
                .flatten();
        if caller_code.as_deref() != Some(request.family_code.as_str()) {
            return Err(ApiError::Forbidden);
        }

        Ok(request)
    }
}
