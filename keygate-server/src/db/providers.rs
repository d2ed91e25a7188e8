use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::{Pagination, Provider, ProviderKind};

pub async fn create_provider(
    conn: &mut SqliteConnection,
    provider: &Provider,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO providers (id, organization_id, name, kind, url, client_id, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(provider.id)
    .bind(provider.organization_id)
    .bind(&provider.name)
    .bind(&provider.kind)
    .bind(&provider.url)
    .bind(&provider.client_id)
    .bind(provider.created_at)
    .bind(provider.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_provider_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<Provider>, sqlx::Error> {
    sqlx::query_as::<_, Provider>("SELECT * FROM providers WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// The seeded built-in provider for an organization.
pub async fn find_internal_provider(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
) -> Result<Option<Provider>, sqlx::Error> {
    sqlx::query_as::<_, Provider>(
        "SELECT * FROM providers WHERE organization_id = $1 AND kind = $2",
    )
    .bind(organization_id)
    .bind(ProviderKind::Internal.as_str())
    .fetch_optional(conn)
    .await
}

pub async fn list_providers(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
    name: Option<&str>,
    pagination: &Pagination,
) -> Result<Vec<Provider>, sqlx::Error> {
    match name {
        Some(name) => {
            sqlx::query_as::<_, Provider>(
                r#"
                SELECT * FROM providers
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
            sqlx::query_as::<_, Provider>(
                r#"
                SELECT * FROM providers
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

pub async fn update_provider(
    conn: &mut SqliteConnection,
    provider: &Provider,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE providers
        SET name = $1, url = $2, client_id = $3, updated_at = $4
        WHERE id = $5
        "#,
    )
    .bind(&provider.name)
    .bind(&provider.url)
    .bind(&provider.client_id)
    .bind(provider.updated_at)
    .bind(provider.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_provider(conn: &mut SqliteConnection, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM providers WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
