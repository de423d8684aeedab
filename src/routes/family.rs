use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    middleware::rate_limit::{check_rate_limit, real_ip},
    models::auth::AuthenticatedParent,
    models::group::UpdateFamilySettingsRequest,
    services::family::FamilyService,
    AppState,
};

/// GET /family/code — the parent's invite code, minted on first call.
pub async fn get_code(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
) -> Result<Json<Value>, ApiError> {
    let code = FamilyService::get_or_create_family_code(&state.db, parent.parent_id).await?;
    Ok(Json(json!({ "invite_code": code })))
}

#[derive(Deserialize)]
pub struct CheckCodeQuery {
    pub code: String,
}

/// GET /family/code/check?code= — child-side pre-check before submitting a
/// link request. Unauthenticated, so rate-limited per IP.
pub async fn check_code(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CheckCodeQuery>,
) -> Result<Json<Value>, ApiError> {
    {
        let ip = real_ip(&headers);
        let mut redis = state.redis.clone();
        check_rate_limit(&mut redis, &format!("rate:code-check:ip:{ip}"), 30, 60).await?;
    }

    let code = FamilyService::normalize_code(&params.code);
    let valid = !FamilyService::is_code_unique(&state.db, &code).await?;
    Ok(Json(json!({ "valid": valid })))
}

/// GET /family/group — settings plus roster. `group` is null until the
/// parent has minted a code.
pub async fn get_group(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
) -> Result<Json<Value>, ApiError> {
    let code: Option<String> = sqlx::query_scalar("SELECT group_code FROM parents WHERE id = $1")
        .bind(parent.parent_id)
        .fetch_optional(&state.db)
        .await?
        .flatten();

    let Some(code) = code else {
        return Ok(Json(json!({ "group": null, "children": [] })));
    };

    let group = FamilyService::get_group(&state.db, &code).await?;
    let children = match &group {
        Some(g) => FamilyService::roster(&state.db, &g.invite_code).await?,
        None => Vec::new(),
    };
    Ok(Json(json!({ "group": group, "children": children })))
}

/// PUT /family/settings — theme and auto-approval toggles. Creates the group
/// first if the parent somehow has none (same self-healing as /family/code).
pub async fn update_settings(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
    Json(body): Json<UpdateFamilySettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    let code = FamilyService::get_or_create_family_code(&state.db, parent.parent_id).await?;
    let group = FamilyService::update_settings(&state.db, &code, &body).await?;
    Ok(Json(json!({ "group": group })))
}
