use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::link_request::ApprovalMode;

/// A child profile, created exactly once per approved link request.
/// The family code is immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChildProfile {
    pub id: Uuid,
    pub family_code: String,
    pub parent_id: Uuid,
    pub nickname: String,
    pub avatar: String,
    pub age: Option<i32>,
    pub reward_enabled: bool,
    pub base_coin_reward: i32,
    /// "manual" | "auto" — kept as TEXT in the row, parsed where it matters.
    pub approval_mode: String,
    pub usage_start_time: String,
    pub usage_end_time: String,
    pub daily_max_completion: i32,
    pub push_agreed: bool,
    pub recovery_email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChildRequest {
    pub nickname: Option<String>,
    pub avatar: Option<String>,
    pub age: Option<i32>,
    pub reward_enabled: Option<bool>,
    pub base_coin_reward: Option<i32>,
    pub approval_mode: Option<ApprovalMode>,
    pub usage_start_time: Option<String>,
    pub usage_end_time: Option<String>,
    pub daily_max_completion: Option<i32>,
    pub push_agreed: Option<bool>,
    pub recovery_email: Option<String>,
}

/// Coarse indicator of where a watcher snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Synced,
    Offline,
    Error,
}

/// One event on the child-profile watch stream.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileEvent {
    pub sync_state: SyncState,
    pub profile: Option<ChildProfile>,
}
