use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Error taxonomy of the pairing workflow. Each variant maps to a stable
/// string code that clients translate for the user.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No group matches the family code the child entered.
    #[error("invalid-family-code")]
    InvalidFamilyCode,

    /// Approval/rejection attempted on a request that no longer exists.
    #[error("request-not-found")]
    RequestNotFound,

    /// Approval/rejection attempted on an already-resolved request.
    #[error("request-not-pending")]
    RequestNotPending,

    #[error("not-authenticated")]
    NotAuthenticated,

    /// The resolving parent does not own the request's family code.
    #[error("forbidden")]
    Forbidden,

    #[error("invalid-credentials")]
    InvalidCredentials,

    #[error("email-taken")]
    EmailTaken,

    #[error("child-not-found")]
    ChildNotFound,

    /// Device has no active link request pointer.
    #[error("no-active-request")]
    NoActiveRequest,

    /// Device pointer references a request that was lost/deleted.
    #[error("stale-request-pointer")]
    StaleRequestPointer,

    #[error("too-many-requests")]
    RateLimited,

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidFamilyCode
            | ApiError::RequestNotFound
            | ApiError::ChildNotFound
            | ApiError::NoActiveRequest
            | ApiError::StaleRequestPointer => StatusCode::NOT_FOUND,
            ApiError::RequestNotPending | ApiError::EmailTaken => StatusCode::CONFLICT,
            ApiError::NotAuthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Database(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code for the client.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidFamilyCode => "invalid-family-code",
            ApiError::RequestNotFound => "request-not-found",
            ApiError::RequestNotPending => "request-not-pending",
            ApiError::NotAuthenticated => "not-authenticated",
            ApiError::Forbidden => "forbidden",
            ApiError::InvalidCredentials => "invalid-credentials",
            ApiError::EmailTaken => "email-taken",
            ApiError::ChildNotFound => "child-not-found",
            ApiError::NoActiveRequest => "no-active-request",
            ApiError::StaleRequestPointer => "stale-request-pointer",
            ApiError::RateLimited => "too-many-requests",
            ApiError::Validation(_) => "validation",
            ApiError::Database(_) | ApiError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
        }
        let body = match &self {
            ApiError::Validation(msg) => json!({ "error": self.code(), "message": msg }),
            _ => json!({ "error": self.code() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_errors_map_to_stable_codes() {
        assert_eq!(ApiError::InvalidFamilyCode.code(), "invalid-family-code");
        assert_eq!(ApiError::RequestNotPending.code(), "request-not-pending");
        assert_eq!(ApiError::NotAuthenticated.code(), "not-authenticated");
    }

    #[test]
    fn status_codes() {
        assert_eq!(ApiError::InvalidFamilyCode.status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::RequestNotPending.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::NotAuthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ApiError::Internal(anyhow::anyhow!("secret detail"));
        assert_eq!(err.code(), "internal");
    }
}
