use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    models::auth::AuthenticatedParent,
    models::child::{ChildProfile, UpdateChildRequest},
    services::children::ChildService,
    AppState,
};

/// GET /children/{id} — also serves as the child-session validity check:
/// a 404 here means the cached session id is stale.
pub async fn get_child(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChildProfile>, ApiError> {
    let child = ChildService::get(&state.db, id)
        .await?
        .ok_or(ApiError::ChildNotFound)?;
    Ok(Json(child))
}

/// PUT /children/{id} — parent edits the profile or approval settings.
/// The updated profile is fanned out to any open watch sockets.
pub async fn update_child(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChildRequest>,
) -> Result<Json<ChildProfile>, ApiError> {
    let child = ChildService::update(&state.db, parent.parent_id, id, &body).await?;

    let mut redis = state.redis.clone();
    ChildService::publish_profile(&mut redis, &child).await;

    Ok(Json(child))
}
