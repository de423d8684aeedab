use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    error::ApiError,
    middleware::rate_limit::{check_rate_limit, real_ip},
    models::auth::{
        AuthenticatedParent, LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequest,
    },
    models::parent::ParentProfile,
    services::auth::AuthService,
    services::metrics::{LOGINS_COUNTER, REGISTRATIONS_COUNTER},
    services::parents::ParentService,
    AppState,
};

pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    // 5 account creations per hour per IP
    let ip = real_ip(&headers);
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:register:ip:{ip}"), 5, 3600).await?;

    let response = AuthService::register(&state.db, &state.config, &body).await?;
    REGISTRATIONS_COUNTER.inc();
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    match AuthService::login(&state.db, &state.config, &body.email, &body.password).await {
        Ok(response) => {
            LOGINS_COUNTER.with_label_values(&["success"]).inc();
            Ok(Json(response))
        }
        Err(e) => {
            LOGINS_COUNTER.with_label_values(&["failure"]).inc();
            Err(e)
        }
    }
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let response = AuthService::refresh(&state.db, &state.config, &body.refresh_token).await?;
    Ok(Json(response))
}

pub async fn logout(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenRequest>,
) -> Result<StatusCode, ApiError> {
    AuthService::logout(&state.db, &state.config, &body.refresh_token).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn me(
    State(state): State<AppState>,
    parent: AuthenticatedParent,
) -> Result<Json<ParentProfile>, ApiError> {
    let profile = ParentService::get(&state.db, parent.parent_id)
        .await?
        .ok_or(ApiError::NotAuthenticated)?;
    Ok(Json(profile.into()))
}
