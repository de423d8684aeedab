use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    error::ApiError,
    models::auth::AuthenticatedParent,
    models::parent::{ParentProfile, SetPremiumRequest, UpdateParentRequest},
    services::parents::ParentService,
    AppState,
};

pub async fn update_me(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
    Json(body): Json<UpdateParentRequest>,
) -> Result<Json<ParentProfile>, ApiError> {
    let updated = ParentService::update(&state.db, parent.parent_id, &body).await?;
    Ok(Json(updated.into()))
}

pub async fn verify_phone(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
) -> Result<Json<Value>, ApiError> {
    ParentService::set_phone_verified(&state.db, parent.parent_id).await?;
    Ok(Json(json!({ "phone_verified": true })))
}

pub async fn complete_onboarding(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
) -> Result<Json<Value>, ApiError> {
    ParentService::set_onboarding_completed(&state.db, parent.parent_id).await?;
    Ok(Json(json!({ "onboarding_completed": true })))
}

pub async fn set_premium(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
    Json(body): Json<SetPremiumRequest>,
) -> Result<Json<ParentProfile>, ApiError> {
    let updated = ParentService::set_premium(&state.db, parent.parent_id, body.active).await?;
    Ok(Json(updated.into()))
}
