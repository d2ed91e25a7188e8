use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::ProviderUser;

pub async fn find_provider_user(
    conn: &mut SqliteConnection,
    provider_id: Uuid,
    identity_id: Uuid,
) -> Result<Option<ProviderUser>, sqlx::Error> {
    sqlx::query_as::<_, ProviderUser>(
        "SELECT * FROM provider_users WHERE provider_id = $1 AND identity_id = $2",
    )
    .bind(provider_id)
    .bind(identity_id)
    .fetch_optional(conn)
    .await
}

/// Insert or replace the snapshot row for (identity, provider).
pub async fn save_provider_user(
    conn: &mut SqliteConnection,
    pu: &ProviderUser,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO provider_users (identity_id, provider_id, email, groups, last_update)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (identity_id, provider_id)
        DO UPDATE SET email = $3, groups = $4, last_update = $5
        "#,
    )
    .bind(pu.identity_id)
    .bind(pu.provider_id)
    .bind(&pu.email)
    .bind(&pu.groups)
    .bind(pu.last_update)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_provider_users_by_identity(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM provider_users WHERE identity_id = $1")
        .bind(identity_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete_provider_users_by_provider(
    conn: &mut SqliteConnection,
    provider_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM provider_users WHERE provider_id = $1")
        .bind(provider_id)
        .execute(conn)
        .await?;
    Ok(())
}
