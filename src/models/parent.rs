use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// DB row struct for a parent account.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Parent {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    /// Family code of the group this parent owns; nullable until onboarding,
    /// and allowed to dangle (healed by get_or_create_family_code).
    pub group_code: Option<String>,
    pub is_premium: bool,
    pub phone_verified: bool,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ParentProfile {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub group_code: Option<String>,
    pub is_premium: bool,
    pub phone_verified: bool,
    pub onboarding_completed: bool,
}

impl From<Parent> for ParentProfile {
    fn from(p: Parent) -> Self {
        Self {
            id: p.id,
            email: p.email,
            display_name: p.display_name,
            photo_url: p.photo_url,
            group_code: p.group_code,
            is_premium: p.is_premium,
            phone_verified: p.phone_verified,
            onboarding_completed: p.onboarding_completed,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateParentRequest {
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetPremiumRequest {
    pub active: bool,
}
