use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::Credential;

pub async fn create_credential(
    conn: &mut SqliteConnection,
    credential: &Credential,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO credentials (id, identity_id, password_hash, one_time_password, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(credential.id)
    .bind(credential.identity_id)
    .bind(&credential.password_hash)
    .bind(credential.one_time_password)
    .bind(credential.created_at)
    .bind(credential.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_credential_by_identity(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
) -> Result<Option<Credential>, sqlx::Error> {
    sqlx::query_as::<_, Credential>("SELECT * FROM credentials WHERE identity_id = $1")
        .bind(identity_id)
        .fetch_optional(conn)
        .await
}

/// Replace the stored hash and clear or set the one-time flag.
pub async fn update_credential(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
    password_hash: &str,
    one_time_password: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE credentials
        SET password_hash = $1, one_time_password = $2, updated_at = $3
        WHERE identity_id = $4
        "#,
    )
    .bind(password_hash)
    .bind(one_time_password)
    .bind(Utc::now())
    .bind(identity_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_credential_by_identity(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM credentials WHERE identity_id = $1")
        .bind(identity_id)
        .execute(conn)
        .await?;
    Ok(())
}
