use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    let mut redis = state.redis.clone();
    let redis_ok: bool = redis::cmd("PING")
        .query_async::<String>(&mut redis)
        .await
        .map(|pong| pong == "PONG")
        .unwrap_or(false);

    let status = if db_ok && redis_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if db_ok && redis_ok { "ok" } else { "error" },
            "db": if db_ok { "connected" } else { "unreachable" },
            "redis": if redis_ok { "connected" } else { "unreachable" },
        })),
    )
}
