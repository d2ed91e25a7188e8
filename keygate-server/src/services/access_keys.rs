//! Access-key lifecycle: mint, validate, slide, revoke.
//!
//! A bearer is `keyID.secret`. The key ID and the secret are generated
//! independently so a listing of stored keys can never leak verifiable
//! secret material, and only the SHA-256 checksum of the secret is persisted.

use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use sqlx::SqliteConnection;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::db;
use crate::models::AccessKey;
use crate::services::ServiceError;

const KEY_ID_LENGTH: usize = 10;
const SECRET_LENGTH: usize = 24;

fn random_string(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

fn secret_checksum(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Mint a new access key.
///
/// Fills in the key's random material and persists it; returns the bearer,
/// which is the only place the raw secret ever exists.
pub async fn issue_access_key(
    conn: &mut SqliteConnection,
    key: &mut AccessKey,
) -> Result<String, ServiceError> {
    let now = Utc::now();

    key.id = Uuid::new_v4();
    key.key_id = random_string(KEY_ID_LENGTH);
    let secret = random_string(SECRET_LENGTH);
    key.secret_checksum = secret_checksum(&secret);
    key.created_at = now;
    key.extension_deadline = (now + key.extension()).min(key.expires_at);

    db::access_keys::create_access_key(conn, key).await?;

    tracing::info!(
        key = %key.id,
        identity = %key.issued_for,
        expires_at = %key.expires_at,
        "access key issued"
    );

    Ok(format!("{}.{}", key.key_id, secret))
}

fn split_bearer(bearer: &str) -> Result<(&str, &str), ServiceError> {
    match bearer.split_once('.') {
        Some((key_id, secret)) if key_id.len() == KEY_ID_LENGTH && !secret.is_empty() => {
            Ok((key_id, secret))
        }
        _ => Err(ServiceError::InvalidCredentials),
    }
}

/// Validate a bearer and return the backing key.
///
/// Rejects unknown or mismatched secrets as `InvalidCredentials` and keys
/// past either their absolute expiry or their extension deadline as
/// `ExpiredOrRevoked`. Expiry is checked lazily here; stale rows are reaped
/// by an external housekeeper.
pub async fn validate_and_get_token(
    conn: &mut SqliteConnection,
    bearer: &str,
) -> Result<AccessKey, ServiceError> {
    let (key_id, secret) = split_bearer(bearer)?;

    let key = db::access_keys::find_access_key_by_key_id(conn, key_id)
        .await?
        .ok_or(ServiceError::ExpiredOrRevoked)?;

    let presented = secret_checksum(secret);
    let matches: bool = presented
        .as_bytes()
        .ct_eq(key.secret_checksum.as_bytes())
        .into();
    if !matches {
        return Err(ServiceError::InvalidCredentials);
    }

    let now = Utc::now();
    if key.is_expired(now) || key.past_extension_deadline(now) {
        return Err(ServiceError::ExpiredOrRevoked);
    }

    Ok(key)
}

/// Validate a bearer for session continuation, sliding the extension
/// deadline forward by the stored window, capped at the absolute expiry.
pub async fn validate_and_extend(
    conn: &mut SqliteConnection,
    bearer: &str,
) -> Result<AccessKey, ServiceError> {
    let mut key = validate_and_get_token(conn, bearer).await?;

    let before = key.extension_deadline;
    key.slide_extension(Utc::now());
    if key.extension_deadline != before {
        db::access_keys::update_extension_deadline(conn, key.id, key.extension_deadline).await?;
    }

    Ok(key)
}

/// Delete an access key. Idempotent: revoking an already-absent key is not
/// an error.
pub async fn revoke(conn: &mut SqliteConnection, id: Uuid) -> Result<(), ServiceError> {
    let removed = db::access_keys::delete_access_key(conn, id).await?;
    if removed > 0 {
        tracing::info!(key = %id, "access key revoked");
    }
    Ok(())
}

/// Build an unsaved key record with the given lifetime parameters.
pub fn new_key(
    issued_for: Uuid,
    provider_id: Uuid,
    name: String,
    expires_at: DateTime<Utc>,
    extension: Duration,
) -> AccessKey {
    let now = Utc::now();
    AccessKey {
        id: Uuid::new_v4(),
        name,
        issued_for,
        provider_id,
        expires_at,
        extension_seconds: extension.num_seconds(),
        extension_deadline: (now + extension).min(expires_at),
        scopes: String::new(),
        key_id: String::new(),
        secret_checksum: String::new(),
        created_at: now,
    }
}
