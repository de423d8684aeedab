use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::child::ChildProfile;
use crate::models::group::{FamilyGroup, UpdateFamilySettingsRequest, ALLOWED_THEMES};
use crate::services::metrics::FAMILIES_CREATED_COUNTER;

const CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 6;

/// 36^6 codes make collisions rare; the cap turns "space exhausted" into an
/// error instead of an infinite loop.
const MAX_CODE_ATTEMPTS: u32 = 32;

pub struct FamilyService;

impl FamilyService {
    /// Random 6-character alphanumeric invite code.
    pub fn generate_invite_code() -> String {
        let mut rng = rand::thread_rng();
        (0..CODE_LEN)
            .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
            .collect()
    }

    /// Codes are compared in normalized form everywhere: trimmed, uppercased.
    pub fn normalize_code(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    pub async fn is_code_unique(pool: &PgPool, code: &str) -> Result<bool, ApiError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE invite_code = $1)")
                .bind(code)
                .fetch_one(pool)
                .await?;
        Ok(!exists)
    }

    pub async fn get_group(pool: &PgPool, code: &str) -> Result<Option<FamilyGroup>, ApiError> {
        let group = sqlx::query_as::<_, FamilyGroup>("SELECT * FROM groups WHERE invite_code = $1")
            .bind(code)
            .fetch_optional(pool)
            .await?;
        Ok(group)
    }

    /// Creates a new group with a fresh unique code and links it back to the
    /// owner's profile. The insert itself is the uniqueness check
    /// (ON CONFLICT DO NOTHING), so two concurrent creations cannot both
    /// claim the same code.
    pub async fn create_family_group(pool: &PgPool, owner_id: Uuid) -> Result<String, ApiError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = Self::generate_invite_code();
            let inserted = sqlx::query(
                "INSERT INTO groups (invite_code, owner_id) VALUES ($1, $2)
                 ON CONFLICT (invite_code) DO NOTHING",
            )
            .bind(&code)
            .bind(owner_id)
            .execute(pool)
            .await?
            .rows_affected();

            if inserted == 1 {
                sqlx::query("UPDATE parents SET group_code = $1, updated_at = NOW() WHERE id = $2")
                    .bind(&code)
                    .bind(owner_id)
                    .execute(pool)
                    .await?;
                FAMILIES_CREATED_COUNTER.inc();
                tracing::info!("created family group {code} for parent {owner_id}");
                return Ok(code);
            }
            tracing::warn!("invite code collision on {code}, regenerating");
        }
        Err(ApiError::Internal(anyhow::anyhow!(
            "could not mint a unique invite code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Returns the parent's existing family code if its backing group still
    /// exists; otherwise creates a new group. Self-healing against a dangling
    /// `parents.group_code`.
    pub async fn get_or_create_family_code(
        pool: &PgPool,
        owner_id: Uuid,
    ) -> Result<String, ApiError> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT group_code FROM parents WHERE id = $1")
                .bind(owner_id)
                .fetch_optional(pool)
                .await?
                .flatten();

        if let Some(code) = existing {
            let backing_exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM groups WHERE invite_code = $1)")
                    .bind(&code)
                    .fetch_one(pool)
                    .await?;
            if backing_exists {
                return Ok(code);
            }
            tracing::warn!("parent {owner_id} had dangling family code {code}, re-creating group");
        }

        Self::create_family_group(pool, owner_id).await
    }

    /// The group's roster, via the explicit junction table.
    pub async fn roster(pool: &PgPool, code: &str) -> Result<Vec<ChildProfile>, ApiError> {
        let children = sqlx::query_as::<_, ChildProfile>(
            "SELECT c.* FROM children c
             JOIN group_children gc ON gc.child_id = c.id
             WHERE gc.family_code = $1
             ORDER BY gc.added_at",
        )
        .bind(code)
        .fetch_all(pool)
        .await?;
        Ok(children)
    }

    pub async fn update_settings(
        pool: &PgPool,
        code: &str,
        req: &UpdateFamilySettingsRequest,
    ) -> Result<FamilyGroup, ApiError> {
        if let Some(theme) = &req.selected_theme {
            if !ALLOWED_THEMES.contains(&theme.as_str()) {
                return Err(ApiError::Validation(format!("unknown theme: {theme}")));
            }
        }
        let group = sqlx::query_as::<_, FamilyGroup>(
            "UPDATE groups
             SET selected_theme      = COALESCE($1, selected_theme),
                 allow_auto_approval = COALESCE($2, allow_auto_approval),
                 updated_at          = NOW()
             WHERE invite_code = $3
             RETURNING *",
        )
        .bind(&req.selected_theme)
        .bind(req.allow_auto_approval)
        .bind(code)
        .fetch_one(pool)
        .await?;
        Ok(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_six_chars_from_the_charset() {
        for _ in 0..200 {
            let code = FamilyService::generate_invite_code();
            assert_eq!(code.len(), 6);
            assert!(code
                .bytes()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        }
    }

    #[test]
    fn generated_codes_vary() {
        let samples: Vec<String> = (0..50).map(|_| FamilyService::generate_invite_code()).collect();
        // With 36^6 possibilities, 50 identical draws means the generator is broken.
        assert!(samples.iter().any(|s| s != &samples[0]));
    }

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(FamilyService::normalize_code("  a1b2c3 "), "A1B2C3");
        assert_eq!(FamilyService::normalize_code("A1B2C3"), "A1B2C3");
    }
}
