use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::{Identity, Pagination};

pub async fn create_identity(
    conn: &mut SqliteConnection,
    identity: &Identity,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO identities (id, organization_id, name, last_seen_at, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(identity.id)
    .bind(identity.organization_id)
    .bind(&identity.name)
    .bind(identity.last_seen_at)
    .bind(identity.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_identity_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<Identity>, sqlx::Error> {
    sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_identity_by_name(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
    name: &str,
) -> Result<Option<Identity>, sqlx::Error> {
    sqlx::query_as::<_, Identity>(
        "SELECT * FROM identities WHERE organization_id = $1 AND name = $2",
    )
    .bind(organization_id)
    .bind(name)
    .fetch_optional(conn)
    .await
}

pub async fn list_identities(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
    name: Option<&str>,
    pagination: &Pagination,
) -> Result<Vec<Identity>, sqlx::Error> {
    match name {
        Some(name) => {
            sqlx::query_as::<_, Identity>(
                r#"
                SELECT * FROM identities
                WHERE organization_id = $1 AND name = $2
                ORDER BY name LIMIT $3 OFFSET $4
                "#,
            )
            .bind(organization_id)
            .bind(name)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(conn)
            .await
        }
        None => {
            sqlx::query_as::<_, Identity>(
                r#"
                SELECT * FROM identities
                WHERE organization_id = $1
                ORDER BY name LIMIT $2 OFFSET $3
                "#,
            )
            .bind(organization_id)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(conn)
            .await
        }
    }
}

pub async fn update_last_seen(
    conn: &mut SqliteConnection,
    id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE identities SET last_seen_at = $1 WHERE id = $2")
        .bind(at)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Delete the identity row only. Cascading cleanup of grants, memberships,
/// and access keys is orchestrated by `services::access::delete_identity`.
pub async fn delete_identity_row(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM identities WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
