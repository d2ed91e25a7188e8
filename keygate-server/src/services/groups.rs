//! Federated group-membership reconciliation.
//!
//! Applies the set difference between a provider's last-known group snapshot
//! and the group list from a fresh login. Membership is adjusted row by row,
//! never rebuilt wholesale, so grants tied to group identity survive a sync.
//!
//! Not safe to run concurrently for the same (identity, provider) pair;
//! callers serialize it through the enclosing transaction.

use sqlx::SqliteConnection;

use crate::db;
use crate::models::{Group, Identity, Provider};
use crate::services::ServiceError;

/// Name-keyed set difference: `(removed, added)` going from `old` to `new`.
fn diff_group_names<'a>(old: &'a [String], new: &'a [String]) -> (Vec<&'a str>, Vec<&'a str>) {
    let removed = old
        .iter()
        .filter(|name| !new.contains(name))
        .map(String::as_str)
        .collect();
    let added = new
        .iter()
        .filter(|name| !old.contains(name))
        .map(String::as_str)
        .collect();
    (removed, added)
}

/// Reconcile the identity's group memberships against `new_group_names`.
///
/// A failure anywhere aborts the caller's transaction; no partial membership
/// state is ever committed.
pub async fn sync_groups(
    conn: &mut SqliteConnection,
    identity: &Identity,
    provider: &Provider,
    new_group_names: &[String],
) -> Result<(), ServiceError> {
    let mut provider_user = db::provider_users::find_provider_user(conn, provider.id, identity.id)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "identity {} has no record with provider {}",
                identity.id, provider.name
            ))
        })?;

    let old_group_names = provider_user.group_names();
    let (removed, added) = diff_group_names(&old_group_names, new_group_names);

    for name in &removed {
        db::groups::remove_member_by_group_name(conn, identity.organization_id, identity.id, name)
            .await?;
        tracing::debug!(identity = %identity.id, group = name, "membership removed");
    }

    for name in &added {
        let group = match db::groups::find_group_by_name(conn, identity.organization_id, name)
            .await?
        {
            Some(group) => group,
            None => {
                let group = Group::new(
                    identity.organization_id,
                    name.to_string(),
                    Some(provider.id),
                );
                db::groups::create_group(conn, &group).await?;
                group
            }
        };

        // re-check right before insert; a racing sync may have added the row
        // and the join table carries a uniqueness constraint
        if !db::groups::membership_exists(conn, identity.id, group.id).await? {
            db::groups::add_member(conn, identity.id, group.id).await?;
        }
        tracing::debug!(identity = %identity.id, group = name, "membership added");
    }

    provider_user.set_group_names(new_group_names);
    db::provider_users::save_provider_user(conn, &provider_user).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_diff_disjoint() {
        let old = names(&["a", "b"]);
        let new = names(&["c"]);
        let (removed, added) = diff_group_names(&old, &new);
        assert_eq!(removed, vec!["a", "b"]);
        assert_eq!(added, vec!["c"]);
    }

    #[test]
    fn test_diff_identical_is_noop() {
        let old = names(&["a", "b"]);
        let same = old.clone();
        let (removed, added) = diff_group_names(&old, &same);
        assert!(removed.is_empty());
        assert!(added.is_empty());
    }

    #[test]
    fn test_diff_single_removal_keeps_rest() {
        let old = names(&["a", "b", "c"]);
        let new = names(&["a", "c"]);
        let (removed, added) = diff_group_names(&old, &new);
        assert_eq!(removed, vec!["b"]);
        assert!(added.is_empty());
    }

    #[test]
    fn test_diff_from_empty() {
        let old = names(&[]);
        let new = names(&["a"]);
        let (removed, added) = diff_group_names(&old, &new);
        assert!(removed.is_empty());
        assert_eq!(added, vec!["a"]);
    }
}
