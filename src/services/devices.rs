use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::device::{
    DevicePreferences, ACTIVE_LINK_REQUEST_ID, AUTO_LOGIN_ENABLED, CHILD_AUTO_LOGIN_ENABLED,
    CHILD_SESSION_ID, PARENT_SELECTED_THEME, PREMIUM_SUBSCRIPTION_ACTIVE,
};
use crate::models::group::{ALLOWED_THEMES, DEFAULT_THEME};
use crate::models::link_request::LinkRequest;
use crate::services::link_requests::LinkRequestService;

const KNOWN_KEYS: &[&str] = &[
    AUTO_LOGIN_ENABLED,
    CHILD_AUTO_LOGIN_ENABLED,
    CHILD_SESSION_ID,
    PREMIUM_SUBSCRIPTION_ACTIVE,
    PARENT_SELECTED_THEME,
    ACTIVE_LINK_REQUEST_ID,
];

pub struct DevicePreferenceService;

impl DevicePreferenceService {
    /// Default returned when a key was never set. Auto-login defaults to
    /// enabled; premium to inactive; theme to the free base theme.
    pub fn default_for(key: &str) -> Option<&'static str> {
        match key {
            AUTO_LOGIN_ENABLED | CHILD_AUTO_LOGIN_ENABLED => Some("true"),
            PREMIUM_SUBSCRIPTION_ACTIVE => Some("false"),
            PARENT_SELECTED_THEME => Some(DEFAULT_THEME),
            _ => None,
        }
    }

    /// Per-key value validation: flags must be "true"/"false", the theme must
    /// be a known id, session/request pointers must be UUIDs.
    pub fn validate_value(key: &str, value: &str) -> Result<(), String> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(format!("unknown preference key: {key}"));
        }
        match key {
            AUTO_LOGIN_ENABLED | CHILD_AUTO_LOGIN_ENABLED | PREMIUM_SUBSCRIPTION_ACTIVE => {
                if value != "true" && value != "false" {
                    return Err(format!("{key} must be \"true\" or \"false\""));
                }
            }
            PARENT_SELECTED_THEME => {
                if !ALLOWED_THEMES.contains(&value) {
                    return Err(format!("unknown theme: {value}"));
                }
            }
            CHILD_SESSION_ID | ACTIVE_LINK_REQUEST_ID => {
                if value.parse::<Uuid>().is_err() {
                    return Err(format!("{key} must be a UUID"));
                }
            }
            _ => {}
        }
        Ok(())
    }

    pub async fn get(
        pool: &PgPool,
        device_id: &str,
        key: &str,
    ) -> Result<Option<String>, ApiError> {
        let value: Option<String> = sqlx::query_scalar(
            "SELECT pref_value FROM device_preferences WHERE device_id = $1 AND pref_key = $2",
        )
        .bind(device_id)
        .bind(key)
        .fetch_optional(pool)
        .await?;
        Ok(value)
    }

    pub async fn set(
        pool: &PgPool,
        device_id: &str,
        key: &str,
        value: &str,
    ) -> Result<(), ApiError> {
        Self::validate_value(key, value).map_err(ApiError::Validation)?;
        sqlx::query(
            "INSERT INTO device_preferences (device_id, pref_key, pref_value)
             VALUES ($1, $2, $3)
             ON CONFLICT (device_id, pref_key)
             DO UPDATE SET pref_value = EXCLUDED.pref_value, updated_at = NOW()",
        )
        .bind(device_id)
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn remove(pool: &PgPool, device_id: &str, key: &str) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM device_preferences WHERE device_id = $1 AND pref_key = $2")
            .bind(device_id)
            .bind(key)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// All preferences of a device with defaults filled in for unset keys.
    pub async fn get_all(pool: &PgPool, device_id: &str) -> Result<DevicePreferences, ApiError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT pref_key, pref_value FROM device_preferences WHERE device_id = $1",
        )
        .bind(device_id)
        .fetch_all(pool)
        .await?;
        let map: HashMap<String, String> = rows.into_iter().collect();

        let flag = |key: &str| -> bool {
            map.get(key)
                .map(|v| v == "true")
                .unwrap_or_else(|| Self::default_for(key) == Some("true"))
        };

        Ok(DevicePreferences {
            auto_login_enabled: flag(AUTO_LOGIN_ENABLED),
            child_auto_login_enabled: flag(CHILD_AUTO_LOGIN_ENABLED),
            premium_subscription_active: flag(PREMIUM_SUBSCRIPTION_ACTIVE),
            parent_selected_theme: map
                .get(PARENT_SELECTED_THEME)
                .cloned()
                .unwrap_or_else(|| DEFAULT_THEME.to_string()),
            child_session_id: map.get(CHILD_SESSION_ID).cloned(),
            active_link_request_id: map.get(ACTIVE_LINK_REQUEST_ID).cloned(),
        })
    }

    /// Single-slot active-request pointer: at most one outstanding link
    /// request per device.
    pub async fn set_active_request(
        pool: &PgPool,
        device_id: &str,
        request_id: Uuid,
    ) -> Result<(), ApiError> {
        Self::set(pool, device_id, ACTIVE_LINK_REQUEST_ID, &request_id.to_string()).await
    }

    pub async fn clear_active_request(pool: &PgPool, device_id: &str) -> Result<(), ApiError> {
        Self::remove(pool, device_id, ACTIVE_LINK_REQUEST_ID).await
    }

    /// Resolves the device's pointer to the request itself. A pointer whose
    /// backing request has vanished is cleared and reported as stale so the
    /// client can prompt re-creation.
    pub async fn resolve_active_request(
        pool: &PgPool,
        device_id: &str,
    ) -> Result<LinkRequest, ApiError> {
        let raw = Self::get(pool, device_id, ACTIVE_LINK_REQUEST_ID)
            .await?
            .ok_or(ApiError::NoActiveRequest)?;

        let request_id: Uuid = match raw.parse() {
            Ok(id) => id,
            Err(_) => {
                Self::clear_active_request(pool, device_id).await?;
                return Err(ApiError::StaleRequestPointer);
            }
        };

        match LinkRequestService::get_by_id(pool, request_id).await? {
            Some(request) => Ok(request),
            None => {
                Self::clear_active_request(pool, device_id).await?;
                Err(ApiError::StaleRequestPointer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_client_contract() {
        assert_eq!(DevicePreferenceService::default_for(AUTO_LOGIN_ENABLED), Some("true"));
        assert_eq!(
            DevicePreferenceService::default_for(CHILD_AUTO_LOGIN_ENABLED),
            Some("true")
        );
        assert_eq!(
            DevicePreferenceService::default_for(PREMIUM_SUBSCRIPTION_ACTIVE),
            Some("false")
        );
        assert_eq!(
            DevicePreferenceService::default_for(PARENT_SELECTED_THEME),
            Some("ant_and_grasshopper")
        );
        assert_eq!(DevicePreferenceService::default_for(CHILD_SESSION_ID), None);
    }

    #[test]
    fn unknown_keys_rejected() {
        assert!(DevicePreferenceService::validate_value("favorite_color", "blue").is_err());
    }

    #[test]
    fn flags_must_be_boolean_strings() {
        assert!(DevicePreferenceService::validate_value(AUTO_LOGIN_ENABLED, "true").is_ok());
        assert!(DevicePreferenceService::validate_value(AUTO_LOGIN_ENABLED, "yes").is_err());
        assert!(
            DevicePreferenceService::validate_value(PREMIUM_SUBSCRIPTION_ACTIVE, "false").is_ok()
        );
    }

    #[test]
    fn theme_must_be_known() {
        assert!(
            DevicePreferenceService::validate_value(PARENT_SELECTED_THEME, "tortoise_and_hare")
                .is_ok()
        );
        assert!(
            DevicePreferenceService::validate_value(PARENT_SELECTED_THEME, "space_theme").is_err()
        );
    }

    #[test]
    fn session_pointers_must_be_uuids() {
        let id = Uuid::new_v4().to_string();
        assert!(DevicePreferenceService::validate_value(CHILD_SESSION_ID, &id).is_ok());
        assert!(DevicePreferenceService::validate_value(CHILD_SESSION_ID, "child_123").is_err());
    }
}
