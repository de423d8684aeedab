use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    models::device::{DevicePreferences, SetPreferenceRequest},
    models::link_request::LinkRequest,
    services::devices::DevicePreferenceService,
    AppState,
};

/// Device ids come from the client installation; constrain them so junk
/// cannot pile up in the preferences table.
fn validate_device_id(s: &str) -> Result<(), ApiError> {
    let len = s.len();
    let ok = len >= 8
        && len <= 128
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ApiError::Validation("invalid device id".into()))
    }
}

/// GET /devices/{device_id}/preferences — all keys, defaults filled in.
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<DevicePreferences>, ApiError> {
    validate_device_id(&device_id)?;
    let prefs = DevicePreferenceService::get_all(&state.db, &device_id).await?;
    Ok(Json(prefs))
}

/// PUT /devices/{device_id}/preferences/{key}
pub async fn set_preference(
    State(state): State<AppState>,
    Path((device_id, key)): Path<(String, String)>,
    Json(body): Json<SetPreferenceRequest>,
) -> Result<Json<Value>, ApiError> {
    validate_device_id(&device_id)?;
    DevicePreferenceService::set(&state.db, &device_id, &key, &body.value).await?;
    Ok(Json(json!({ "saved": true })))
}

/// GET /devices/{device_id}/active-link-request — resolves the single-slot
/// pointer. A pointer whose request has vanished is cleared and reported as
/// stale so the client prompts re-creation.
pub async fn get_active_request(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<Json<LinkRequest>, ApiError> {
    validate_device_id(&device_id)?;
    let request = DevicePreferenceService::resolve_active_request(&state.db, &device_id).await?;
    Ok(Json(request))
}

/// DELETE /devices/{device_id}/active-link-request
pub async fn clear_active_request(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    validate_device_id(&device_id)?;
    DevicePreferenceService::clear_active_request(&state.db, &device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_bounds() {
        assert!(validate_device_id("device-12345678").is_ok());
        assert!(validate_device_id("abc").is_err());
        assert!(validate_device_id("has spaces here").is_err());
        assert!(validate_device_id(&"x".repeat(200)).is_err());
    }
}
