use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Theme ids a family may select. The first entry is the free default.
pub const ALLOWED_THEMES: &[&str] = &[
    "ant_and_grasshopper",
    "tortoise_and_hare",
    "dolphin_and_fish",
];

pub const DEFAULT_THEME: &str = "ant_and_grasshopper";

/// A family group. The invite code doubles as the primary key — it is what a
/// child types in to request pairing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FamilyGroup {
    pub invite_code: String,
    pub owner_id: Uuid,
    pub selected_theme: String,
    pub allow_auto_approval: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateFamilySettingsRequest {
    pub selected_theme: Option<String>,
    pub allow_auto_approval: Option<bool>,
}
