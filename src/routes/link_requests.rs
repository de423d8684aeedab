use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::{
    error::ApiError,
    middleware::rate_limit::{check_rate_limit, real_ip},
    models::auth::AuthenticatedParent,
    models::child::ChildProfile,
    models::link_request::{
        CreateLinkRequestRequest, LinkRequest, ParentApprovalPayload, RejectLinkRequestRequest,
    },
    services::link_requests::LinkRequestService,
    services::metrics::LINK_REQUESTS_COUNTER,
    AppState,
};

/// POST /link-requests — child-side, unauthenticated, so rate-limited per IP.
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateLinkRequestRequest>,
) -> Result<(StatusCode, Json<LinkRequest>), ApiError> {
    {
        let ip = real_ip(&headers);
        let mut redis = state.redis.clone();
        check_rate_limit(&mut redis, &format!("rate:link-request:ip:{ip}"), 10, 3600).await?;
    }

    let request = LinkRequestService::create(&state.db, &body).await?;
    LINK_REQUESTS_COUNTER.with_label_values(&["created"]).inc();
    Ok((StatusCode::CREATED, Json(request)))
}

/// GET /link-requests/{id} — the child client polls this until resolution.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LinkRequest>, ApiError> {
    let request = LinkRequestService::get_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::RequestNotFound)?;
    Ok(Json(request))
}

/// GET /link-requests/pending — pending requests for the caller's family code.
pub async fn list_pending(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
) -> Result<Json<Vec<LinkRequest>>, ApiError> {
    let requests =
        LinkRequestService::list_pending_for_parent(&state.db, parent.parent_id).await?;
    Ok(Json(requests))
}

/// POST /link-requests/{id}/approve — runs the approval workflow and returns
/// the newly created child profile.
pub async fn approve(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
    Path(id): Path<Uuid>,
    Json(payload): Json<ParentApprovalPayload>,
) -> Result<(StatusCode, Json<ChildProfile>), ApiError> {
    let child = LinkRequestService::approve(&state.db, parent.parent_id, id, &payload).await?;
    LINK_REQUESTS_COUNTER.with_label_values(&["approved"]).inc();
    Ok((StatusCode::CREATED, Json(child)))
}

/// POST /link-requests/{id}/reject
pub async fn reject(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
    Path(id): Path<Uuid>,
    Json(body): Json<RejectLinkRequestRequest>,
) -> Result<Json<LinkRequest>, ApiError> {
    let request =
        LinkRequestService::reject(&state.db, parent.parent_id, id, body.reason).await?;
    LINK_REQUESTS_COUNTER.with_label_values(&["rejected"]).inc();
    Ok(Json(request))
}
