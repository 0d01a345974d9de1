//! API key authentication extractor.
//!
//! Extracts and verifies API keys from:
//! - `Authorization: Bearer <key>` header
//! - `X-API-Key: <key>` header
//!
//! Keys are SHA-256 hashed and compared against the `api_keys` table. Each
//! key is bound to a user id, which becomes the identity of the request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use sqlx::Row;

use spendscope_infra::sqlite::pool::DatabasePool;
use spendscope_types::user::UserId;

use crate::http::error::AppError;
use crate::state::AppState;

/// Prefix of generated keys, so they are recognizable in config files.
pub const API_KEY_PREFIX: &str = "ssk_";

/// The user a request acts for. Extracting this validates the API key.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub UserId);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let api_key = extract_api_key(parts)?;
        let key_hash = hash_api_key(&api_key);

        let row = sqlx::query("SELECT id, user_id FROM api_keys WHERE key_hash = ?")
            .bind(&key_hash)
            .fetch_optional(&state.db_pool.reader)
            .await
            .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;

        let Some(row) = row else {
            return Err(AppError::Unauthorized(
                "Invalid API key. Provide a valid key via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
            ));
        };

        let id: String = row
            .try_get("id")
            .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;
        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| AppError::Internal(format!("Database error: {e}")))?;
        let user_id: UserId = user_id
            .parse()
            .map_err(|e| AppError::Internal(format!("Corrupt api key owner: {e}")))?;

        // Best effort; a failed timestamp update does not fail the request.
        let now = chrono::Utc::now().to_rfc3339();
        if let Err(e) = sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(&now)
            .bind(&id)
            .execute(&state.db_pool.writer)
            .await
        {
            tracing::debug!(error = %e, "Failed to update api key last_used_at");
        }

        Ok(Authenticated(user_id))
    }
}

/// Extract the API key from request headers.
fn extract_api_key(parts: &Parts) -> Result<String, AppError> {
    if let Some(auth) = parts.headers.get("authorization") {
        let auth_str = auth.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid Authorization header encoding".to_string())
        })?;
        if let Some(key) = auth_str.strip_prefix("Bearer ") {
            return Ok(key.trim().to_string());
        }
    }

    if let Some(key) = parts.headers.get("x-api-key") {
        let key_str = key.to_str().map_err(|_| {
            AppError::Unauthorized("Invalid X-API-Key header encoding".to_string())
        })?;
        return Ok(key_str.trim().to_string());
    }

    Err(AppError::Unauthorized(
        "Missing API key. Provide via 'Authorization: Bearer <key>' or 'X-API-Key: <key>' header.".to_string(),
    ))
}

/// Compute SHA-256 hash of an API key (lowercase hex).
pub fn hash_api_key(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    format!("{:x}", digest)
}

/// Generate a key for `user_id`, store its hash, and return the plaintext.
pub async fn create_api_key(
    pool: &DatabasePool,
    user_id: &UserId,
    name: &str,
) -> anyhow::Result<String> {
    let mut key_bytes = [0u8; 32];
    OsRng.fill_bytes(&mut key_bytes);
    let plaintext_key = format!(
        "{API_KEY_PREFIX}{}",
        key_bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
    );

    sqlx::query(
        "INSERT INTO api_keys (id, key_hash, user_id, name, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::now_v7().to_string())
    .bind(hash_api_key(&plaintext_key))
    .bind(user_id.to_string())
    .bind(name)
    .bind(chrono::Utc::now().to_rfc3339())
    .execute(&pool.writer)
    .await?;

    Ok(plaintext_key)
}

/// Make sure the local user has an API key.
///
/// Returns the plaintext key when one was just created; `None` means a key
/// already existed (its plaintext is only ever shown once).
pub async fn ensure_api_key(state: &AppState) -> anyhow::Result<Option<String>> {
    let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM api_keys WHERE user_id = ? LIMIT 1")
        .bind(state.user_id.to_string())
        .fetch_optional(&state.db_pool.reader)
        .await?;

    if existing.is_some() {
        return Ok(None);
    }

    let key = create_api_key(&state.db_pool, &state.user_id, "default").await?;
    Ok(Some(key))
}
