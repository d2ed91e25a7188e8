//! Group reconciliation tests: additive/subtractive diffs against the
//! provider-user snapshot, never wholesale rebuilds.

mod common;

use keygate_server::db;
use keygate_server::models::{Provider, ProviderKind, ProviderUser};
use keygate_server::services::groups::sync_groups;
use sqlx::SqliteConnection;
use uuid::Uuid;

const USERNAME: &str = "gohan@example.com";
const PASSWORD: &str = "password123";

async fn seed_provider(conn: &mut SqliteConnection, organization_id: Uuid) -> Provider {
    let provider = Provider::new(organization_id, "okta".to_string(), ProviderKind::Oidc);
    db::providers::create_provider(conn, &provider).await.unwrap();
    provider
}

async fn seed_provider_user(conn: &mut SqliteConnection, identity_id: Uuid, provider: &Provider) {
    let pu = ProviderUser::new(identity_id, provider.id, USERNAME.to_string());
    db::provider_users::save_provider_user(conn, &pu).await.unwrap();
}

async fn membership_count(conn: &mut SqliteConnection, identity_id: Uuid) -> i64 {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM identities_groups WHERE identity_id = $1")
            .bind(identity_id)
            .fetch_one(conn)
            .await
            .unwrap();
    count
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn sync_creates_groups_and_memberships() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, false).await;

    let mut tx = env.pool.begin().await.unwrap();
    let provider = seed_provider(&mut tx, env.organization.id).await;
    seed_provider_user(&mut tx, user.id, &provider).await;

    sync_groups(&mut tx, &user, &provider, &names(&["devs", "ops"]))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut conn = env.pool.acquire().await.unwrap();
    let groups = db::groups::list_groups_by_member(&mut conn, user.id)
        .await
        .unwrap();
    assert_eq!(groups.len(), 2);
    // auto-created groups are attributed to the syncing provider
    assert!(groups
        .iter()
        .all(|g| g.created_by_provider == Some(provider.id)));

    let snapshot = db::provider_users::find_provider_user(&mut conn, provider.id, user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(snapshot.group_names(), names(&["devs", "ops"]));
}

#[tokio::test]
async fn sync_is_idempotent() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, false).await;

    let mut tx = env.pool.begin().await.unwrap();
    let provider = seed_provider(&mut tx, env.organization.id).await;
    seed_provider_user(&mut tx, user.id, &provider).await;

    sync_groups(&mut tx, &user, &provider, &names(&["devs", "ops"]))
        .await
        .unwrap();
    sync_groups(&mut tx, &user, &provider, &names(&["devs", "ops"]))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut conn = env.pool.acquire().await.unwrap();
    assert_eq!(membership_count(&mut conn, user.id).await, 2);

    // no duplicate group rows either
    let (group_count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM groups WHERE organization_id = $1")
            .bind(env.organization.id)
            .fetch_one(&mut *conn)
            .await
            .unwrap();
    assert_eq!(group_count, 2);
}

#[tokio::test]
async fn sync_removes_only_the_dropped_group() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, false).await;

    let mut tx = env.pool.begin().await.unwrap();
    let provider = seed_provider(&mut tx, env.organization.id).await;
    seed_provider_user(&mut tx, user.id, &provider).await;

    sync_groups(&mut tx, &user, &provider, &names(&["devs", "ops", "sre"]))
        .await
        .unwrap();
    sync_groups(&mut tx, &user, &provider, &names(&["devs", "sre"]))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut conn = env.pool.acquire().await.unwrap();
    let groups = db::groups::list_groups_by_member(&mut conn, user.id)
        .await
        .unwrap();
    let member_of: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(member_of, vec!["devs", "sre"]);

    // the group row itself survives; only the membership went away
    assert!(db::groups::find_group_by_name(&mut conn, env.organization.id, "ops")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn sync_leaves_other_identities_memberships_untouched() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, false).await;
    let other = common::create_user(&env, "videl@example.com", PASSWORD, false).await;

    let mut tx = env.pool.begin().await.unwrap();
    let provider = seed_provider(&mut tx, env.organization.id).await;
    seed_provider_user(&mut tx, user.id, &provider).await;
    seed_provider_user(&mut tx, other.id, &provider).await;

    sync_groups(&mut tx, &user, &provider, &names(&["devs"])).await.unwrap();
    sync_groups(&mut tx, &other, &provider, &names(&["devs"])).await.unwrap();

    // dropping the group for one identity must not disturb the other
    sync_groups(&mut tx, &user, &provider, &names(&[])).await.unwrap();
    tx.commit().await.unwrap();

    let mut conn = env.pool.acquire().await.unwrap();
    assert_eq!(membership_count(&mut conn, user.id).await, 0);
    assert_eq!(membership_count(&mut conn, other.id).await, 1);
}

#[tokio::test]
async fn sync_tolerates_preexisting_join_rows() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, false).await;

    let mut tx = env.pool.begin().await.unwrap();
    let provider = seed_provider(&mut tx, env.organization.id).await;
    seed_provider_user(&mut tx, user.id, &provider).await;

    // membership added out of band, snapshot unaware of it
    let group = keygate_server::models::Group::new(
        env.organization.id,
        "devs".to_string(),
        None,
    );
    db::groups::create_group(&mut tx, &group).await.unwrap();
    db::groups::add_member(&mut tx, user.id, group.id).await.unwrap();

    // the pre-insert re-check keeps this from violating the uniqueness
    // constraint
    sync_groups(&mut tx, &user, &provider, &names(&["devs"]))
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let mut conn = env.pool.acquire().await.unwrap();
    assert_eq!(membership_count(&mut conn, user.id).await, 1);
}

#[tokio::test]
async fn sync_without_provider_record_fails() {
    let env = common::setup().await;
    let user = common::create_user(&env, USERNAME, PASSWORD, false).await;

    let mut tx = env.pool.begin().await.unwrap();
    let provider = seed_provider(&mut tx, env.organization.id).await;

    let result = sync_groups(&mut tx, &user, &provider, &names(&["devs"])).await;
    tx.rollback().await.unwrap();

    assert!(result.is_err());
}
