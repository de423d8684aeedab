use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use antbox_api::config::Config;
use antbox_api::db;
use antbox_api::middleware::auth::JwtSecret;
use antbox_api::routes;
use antbox_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let state = AppState {
        db: pool,
        redis: redis_conn,
        redis_client: redis_client.clone(),
        config: config.clone(),
    };

    // The clients are mobile apps, not browsers; CORS stays permissive.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(Any);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/refresh", post(routes::auth::refresh_token))
        .route("/auth/logout", post(routes::auth::logout))
        .route("/auth/me", get(routes::auth::me))
        // Parent profile
        .route("/parents/me", put(routes::parents::update_me))
        .route("/parents/me/verify-phone", post(routes::parents::verify_phone))
        .route("/parents/me/complete-onboarding", post(routes::parents::complete_onboarding))
        .route("/parents/me/premium", put(routes::parents::set_premium))
        // Family directory
        .route("/family/code", get(routes::family::get_code))
        .route("/family/code/check", get(routes::family::check_code))
        .route("/family/group", get(routes::family::get_group))
        .route("/family/settings", put(routes::family::update_settings))
        // Link requests (pairing workflow)
        .route("/link-requests", post(routes::link_requests::create))
        .route("/link-requests/pending", get(routes::link_requests::list_pending))
        .route("/link-requests/{id}", get(routes::link_requests::get_by_id))
        .route("/link-requests/{id}/approve", post(routes::link_requests::approve))
        .route("/link-requests/{id}/reject", post(routes::link_requests::reject))
        // Children
        .route("/children/{id}", get(routes::children::get_child).put(routes::children::update_child))
        .route("/children/{id}/watch", get(routes::websocket::watch_child))
        // Device preferences
        .route("/devices/{device_id}/preferences", get(routes::devices::get_preferences))
        .route("/devices/{device_id}/preferences/{key}", put(routes::devices::set_preference))
        .route(
            "/devices/{device_id}/active-link-request",
            get(routes::devices::get_active_request).delete(routes::devices::clear_active_request),
        )
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("antbox API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
