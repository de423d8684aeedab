use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::ApiError;
use crate::middleware::auth::generate_access_token;
use crate::models::auth::{LoginResponse, RefreshClaims, RegisterRequest};
use crate::models::parent::Parent;

pub struct AuthService;

impl AuthService {
    /// Creates the parent account and signs it in — registration returns a
    /// token pair directly, the way the mobile client expects.
    pub async fn register(
        pool: &PgPool,
        config: &Config,
        req: &RegisterRequest,
    ) -> Result<LoginResponse, ApiError> {
        if !req.email.contains('@') {
            return Err(ApiError::Validation("invalid email address".into()));
        }
        if req.password.len() < 8 {
            return Err(ApiError::Validation(
                "password must be at least 8 characters".into(),
            ));
        }
        if req.display_name.trim().is_empty() {
            return Err(ApiError::Validation("display name is required".into()));
        }

        let password_hash =
            bcrypt::hash(&req.password, 12).map_err(|e| ApiError::Internal(e.into()))?;

        let parent = sqlx::query_as::<_, Parent>(
            "INSERT INTO parents (email, password_hash, display_name, photo_url)
             VALUES ($1, $2, $3, $4)
             RETURNING *",
        )
        .bind(req.email.trim().to_lowercase())
        .bind(&password_hash)
        .bind(req.display_name.trim())
        .bind(req.photo_url.as_deref().filter(|s| !s.trim().is_empty()))
        .fetch_one(pool)
        .await
        .map_err(|e| {
            let msg = e.to_string();
            if msg.contains("unique") || msg.contains("duplicate") {
                ApiError::EmailTaken
            } else {
                ApiError::Database(e)
            }
        })?;

        tracing::info!("parent account created: {}", parent.id);
        Self::issue_token_pair(pool, config, parent).await
    }

    pub async fn login(
        pool: &PgPool,
        config: &Config,
        email: &str,
        password: &str,
    ) -> Result<LoginResponse, ApiError> {
        let parent = sqlx::query_as::<_, Parent>("SELECT * FROM parents WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(pool)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        let valid = bcrypt::verify(password, &parent.password_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;
        if !valid {
            return Err(ApiError::InvalidCredentials);
        }

        // Touch the profile so "last seen" style queries stay meaningful.
        sqlx::query("UPDATE parents SET updated_at = NOW() WHERE id = $1")
            .bind(parent.id)
            .execute(pool)
            .await?;

        Self::issue_token_pair(pool, config, parent).await
    }

    /// Rotate refresh token: revoke old, issue new pair.
    pub async fn refresh(
        pool: &PgPool,
        config: &Config,
        refresh_token_str: &str,
    ) -> Result<LoginResponse, ApiError> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let key = DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes());
        let data = decode::<RefreshClaims>(
            refresh_token_str,
            &key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| ApiError::NotAuthenticated)?;
        let jti: Uuid = data.claims.jti.parse().map_err(|_| ApiError::NotAuthenticated)?;
        let parent_id: Uuid = data.claims.sub.parse().map_err(|_| ApiError::NotAuthenticated)?;

        let stored: Option<(String, chrono::DateTime<Utc>)> = sqlx::query_as(
            "SELECT token_hash, expires_at FROM refresh_tokens
             WHERE id = $1 AND parent_id = $2 AND revoked = FALSE",
        )
        .bind(jti)
        .bind(parent_id)
        .fetch_optional(pool)
        .await?;
        let (token_hash, expires_at) = stored.ok_or(ApiError::NotAuthenticated)?;

        if expires_at < Utc::now() {
            return Err(ApiError::NotAuthenticated);
        }
        if !bcrypt::verify(refresh_token_str, &token_hash).unwrap_or(false) {
            return Err(ApiError::NotAuthenticated);
        }

        sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
            .bind(jti)
            .execute(pool)
            .await?;

        let parent = sqlx::query_as::<_, Parent>("SELECT * FROM parents WHERE id = $1")
            .bind(parent_id)
            .fetch_one(pool)
            .await?;

        Self::issue_token_pair(pool, config, parent).await
    }

    /// Revoke a refresh token (logout). Best-effort: an undecodable token is
    /// already useless, so this never fails the caller.
    pub async fn logout(
        pool: &PgPool,
        config: &Config,
        refresh_token_str: &str,
    ) -> Result<(), ApiError> {
        use jsonwebtoken::{decode, DecodingKey, Validation};

        let key = DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes());
        if let Ok(data) =
            decode::<RefreshClaims>(refresh_token_str, &key, &Validation::new(Algorithm::HS256))
        {
            if let Ok(jti) = data.claims.jti.parse::<Uuid>() {
                sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = $1")
                    .bind(jti)
                    .execute(pool)
                    .await?;
            }
        }
        Ok(())
    }

    async fn issue_token_pair(
        pool: &PgPool,
        config: &Config,
        parent: Parent,
    ) -> Result<LoginResponse, ApiError> {
        let access_token =
            generate_access_token(parent.id, &config.jwt_secret, config.jwt_expiry_seconds)?;
        let (refresh_token, jti) = Self::generate_refresh_token(
            parent.id,
            &config.jwt_refresh_secret,
            config.jwt_refresh_expiry_days,
        )?;

        let hash = bcrypt::hash(&refresh_token, 8).map_err(|e| ApiError::Internal(e.into()))?;
        let expires_at =
            Utc::now() + chrono::Duration::days(config.jwt_refresh_expiry_days as i64);
        sqlx::query(
            "INSERT INTO refresh_tokens (id, parent_id, token_hash, expires_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(jti)
        .bind(parent.id)
        .bind(hash)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(LoginResponse {
            access_token,
            refresh_token,
            parent: parent.into(),
        })
    }

    fn generate_refresh_token(
        parent_id: Uuid,
        secret: &str,
        ttl_days: u64,
    ) -> anyhow::Result<(String, Uuid)> {
        let now = Utc::now().timestamp() as usize;
        let jti = Uuid::new_v4();
        let claims = RefreshClaims {
            sub: parent_id.to_string(),
            jti: jti.to_string(),
            iat: now,
            exp: now + (ttl_days * 86400) as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;
        Ok((token, jti))
    }
}
