use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::models::Group;

pub async fn create_group(conn: &mut SqliteConnection, group: &Group) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO groups (id, organization_id, name, created_by_provider, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(group.id)
    .bind(group.organization_id)
    .bind(&group.name)
    .bind(group.created_by_provider)
    .bind(group.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn find_group_by_name(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
    name: &str,
) -> Result<Option<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>("SELECT * FROM groups WHERE organization_id = $1 AND name = $2")
        .bind(organization_id)
        .bind(name)
        .fetch_optional(conn)
        .await
}

/// Groups an identity currently belongs to.
pub async fn list_groups_by_member(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
) -> Result<Vec<Group>, sqlx::Error> {
    sqlx::query_as::<_, Group>(
        r#"
        SELECT g.* FROM groups g
        JOIN identities_groups ig ON ig.group_id = g.id
        WHERE ig.identity_id = $1
        ORDER BY g.name
        "#,
    )
    .bind(identity_id)
    .fetch_all(conn)
    .await
}

pub async fn membership_exists(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
    group_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM identities_groups WHERE identity_id = $1 AND group_id = $2",
    )
    .bind(identity_id)
    .bind(group_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

pub async fn add_member(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
    group_id: Uuid,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO identities_groups (identity_id, group_id) VALUES ($1, $2)")
        .bind(identity_id)
        .bind(group_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Remove an identity's membership in the named group. The group row itself
/// is untouched so grants tied to the group identity are undisturbed.
pub async fn remove_member_by_group_name(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
    identity_id: Uuid,
    group_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        DELETE FROM identities_groups
        WHERE identity_id = $1
          AND group_id IN (SELECT id FROM groups WHERE organization_id = $2 AND name = $3)
        "#,
    )
    .bind(identity_id)
    .bind(organization_id)
    .bind(group_name)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete_memberships_by_identity(
    conn: &mut SqliteConnection,
    identity_id: Uuid,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM identities_groups WHERE identity_id = $1")
        .bind(identity_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}
