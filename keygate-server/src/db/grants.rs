use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::{Grant, Role};

pub async fn create_grant(conn: &mut SqliteConnection, grant: &Grant) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO grants (id, organization_id, subject, resource, role, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(grant.id)
    .bind(grant.organization_id)
    .bind(grant.subject)
    .bind(&grant.resource)
    .bind(&grant.role)
    .bind(grant.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn list_grants_by_subject(
    conn: &mut SqliteConnection,
    subject: Uuid,
) -> Result<Vec<Grant>, sqlx::Error> {
    sqlx::query_as::<_, Grant>("SELECT * FROM grants WHERE subject = $1")
        .bind(subject)
        .fetch_all(conn)
        .await
}

/// The subject's strongest role on a resource, if any grant binds one.
pub async fn find_role(
    conn: &mut SqliteConnection,
    subject: Uuid,
    resource: &str,
) -> Result<Option<Role>, sqlx::Error> {
    // 'admin' sorts before 'view', so the strongest grant wins
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT role FROM grants WHERE subject = $1 AND resource = $2 ORDER BY role LIMIT 1",
    )
    .bind(subject)
    .bind(resource)
    .fetch_optional(conn)
    .await?;
    Ok(row.and_then(|(role,)| Role::parse(&role)))
}

pub async fn delete_grants_by_subject(
    conn: &mut SqliteConnection,
    subject: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM grants WHERE subject = $1")
        .bind(subject)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
