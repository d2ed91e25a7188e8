use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::{AccessKey, Pagination};

pub async fn create_access_key(
    conn: &mut SqliteConnection,
    key: &AccessKey,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO access_keys
            (id, name, issued_for, provider_id, expires_at, extension_seconds,
             extension_deadline, scopes, key_id, secret_checksum, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(key.id)
    .bind(&key.name)
    .bind(key.issued_for)
    .bind(key.provider_id)
    .bind(key.expires_at)
    .bind(key.extension_seconds)
    .bind(key.extension_deadline)
    .bind(&key.scopes)
    .bind(&key.key_id)
    .bind(&key.secret_checksum)
    .bind(key.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_access_key_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<AccessKey>, sqlx::Error> {
    sqlx::query_as::<_, AccessKey>("SELECT * FROM access_keys WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_access_key_by_key_id(
    conn: &mut SqliteConnection,
    key_id: &str,
) -> Result<Option<AccessKey>, sqlx::Error> {
    sqlx::query_as::<_, AccessKey>("SELECT * FROM access_keys WHERE key_id = $1")
        .bind(key_id)
        .fetch_optional(conn)
        .await
}

pub async fn list_access_keys(
    conn: &mut SqliteConnection,
    issued_for: Option<Uuid>,
    pagination: &Pagination,
) -> Result<Vec<AccessKey>, sqlx::Error> {
    match issued_for {
        Some(identity_id) => {
            sqlx::query_as::<_, AccessKey>(
                r#"
                SELECT * FROM access_keys WHERE issued_for = $1
                ORDER BY created_at DESC LIMIT $2 OFFSET $3
                "#,
            )
            .bind(identity_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(conn)
            .await
        }
        None => {
            sqlx::query_as::<_, AccessKey>(
                "SELECT * FROM access_keys ORDER BY created_at DESC LIMIT $1 OFFSET $2",
            )
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(conn)
            .await
        }
    }
}

pub async fn update_extension_deadline(
    conn: &mut SqliteConnection,
    id: Uuid,
    deadline: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE access_keys SET extension_deadline = $1 WHERE id = $2")
        .bind(deadline)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete a key by ID; returns the number of rows removed so callers can stay
/// idempotent about already-absent keys.
pub async fn delete_access_key(conn: &mut SqliteConnection, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM access_keys WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_access_keys_by_identity(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM access_keys WHERE issued_for = $1")
        .bind(identity_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_access_keys_by_provider(
    conn: &mut SqliteConnection,
    provider_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM access_keys WHERE provider_id = $1")
        .bind(provider_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
