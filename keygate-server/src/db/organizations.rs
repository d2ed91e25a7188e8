use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::Organization;

pub async fn create_organization(
    conn: &mut SqliteConnection,
    org: &Organization,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO organizations (id, name, domain, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(org.id)
    .bind(&org.name)
    .bind(&org.domain)
    .bind(org.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_organization_by_id(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
}

pub async fn find_organization_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<Organization>, sqlx::Error> {
    sqlx::query_as::<_, Organization>("SELECT * FROM organizations WHERE name = $1")
        .bind(name)
        .fetch_optional(conn)
        .await
}
