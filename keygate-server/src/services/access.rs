//! Authorization guard and the guarded administrative operations.
//!
//! The caller's `RequestContext` is resolved once by the routing layer and
//! threaded through every call as an immutable value; nothing here reads
//! process-wide state. The built-in provider rule is unconditional: no role
//! makes it mutable.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use uuid::Uuid;

use crate::db;
use crate::models::{AccessKey, Credential, Identity, Pagination, Provider, Role};
use crate::services::{access_keys, ServiceError};
use crate::utils::{generate_one_time_password, hash_password, Password};

const ONE_TIME_PASSWORD_LENGTH: usize = 12;

/// Immutable per-request principal/role carrier, populated by the routing
/// layer's authentication middleware.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity_id: Uuid,
    pub organization_id: Uuid,
    /// Role resolved from the caller's grants on the built-in resource.
    pub role: Option<Role>,
    /// Key backing this request; logout revokes it.
    pub access_key_id: Uuid,
}

/// Require the caller to hold `role`. Admin satisfies every requirement.
pub fn require_role(ctx: &RequestContext, role: Role) -> Result<(), ServiceError> {
    let allowed = match role {
        Role::Admin => ctx.role == Some(Role::Admin),
        Role::View => matches!(ctx.role, Some(Role::Admin) | Some(Role::View)),
    };
    if allowed {
        Ok(())
    } else {
        Err(ServiceError::Unauthorized(format!(
            "{} role required",
            role.as_str()
        )))
    }
}

/// The seeded built-in provider for the caller's organization.
pub async fn builtin_provider(
    conn: &mut SqliteConnection,
    organization_id: Uuid,
) -> Result<Provider, ServiceError> {
    db::providers::find_internal_provider(conn, organization_id)
        .await?
        .ok_or_else(|| {
            ServiceError::Internal(anyhow::anyhow!(
                "built-in provider missing for organization {}",
                organization_id
            ))
        })
}

// ==================== Providers ====================

pub async fn get_provider(
    conn: &mut SqliteConnection,
    id: Uuid,
) -> Result<Provider, ServiceError> {
    db::providers::find_provider_by_id(conn, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("provider {}", id)))
}

pub async fn list_providers(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    name: Option<&str>,
    pagination: &Pagination,
) -> Result<Vec<Provider>, ServiceError> {
    Ok(db::providers::list_providers(conn, ctx.organization_id, name, pagination).await?)
}

pub async fn create_provider(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    provider: &Provider,
) -> Result<(), ServiceError> {
    require_role(ctx, Role::Admin)?;
    db::providers::create_provider(conn, provider).await?;
    tracing::info!(provider = %provider.id, name = %provider.name, "provider created");
    Ok(())
}

/// Update a provider. The protection check and the role check are peers:
/// either failing is sufficient, neither can be skipped.
pub async fn save_provider(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    provider: &Provider,
) -> Result<(), ServiceError> {
    let builtin = builtin_provider(conn, ctx.organization_id).await?;
    if builtin.id == provider.id {
        tracing::warn!(caller = %ctx.identity_id, "refused mutation of the built-in provider");
        return Err(ServiceError::BadRequest(
            "the built-in provider cannot be modified".to_string(),
        ));
    }
    require_role(ctx, Role::Admin)?;

    db::providers::update_provider(conn, provider).await?;
    Ok(())
}

/// Delete a provider. The protection check runs before the role check so the
/// refusal is identical for every caller.
pub async fn delete_provider(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    id: Uuid,
) -> Result<(), ServiceError> {
    let builtin = builtin_provider(conn, ctx.organization_id).await?;
    if builtin.id == id {
        tracing::warn!(caller = %ctx.identity_id, "refused deletion of the built-in provider");
        return Err(ServiceError::BadRequest(
            "the built-in provider cannot be deleted".to_string(),
        ));
    }
    require_role(ctx, Role::Admin)?;

    // sessions and snapshots minted through the provider go with it
    db::access_keys::delete_access_keys_by_provider(conn, id).await?;
    db::provider_users::delete_provider_users_by_provider(conn, id).await?;
    db::providers::delete_provider(conn, id).await?;
    tracing::info!(provider = %id, "provider deleted");
    Ok(())
}

// ==================== Identities ====================

/// Create an identity, optionally with a generated one-time password whose
/// cleartext is returned exactly once.
pub async fn create_identity(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    name: String,
    set_one_time_password: bool,
) -> Result<(Identity, Option<String>), ServiceError> {
    require_role(ctx, Role::Admin)?;

    let identity = Identity::new(ctx.organization_id, name);
    db::identities::create_identity(conn, &identity).await?;

    let one_time_password = if set_one_time_password {
        let otp = generate_one_time_password(ONE_TIME_PASSWORD_LENGTH);
        let hash = hash_password_blocking(otp.clone()).await?;
        let credential = Credential::new(identity.id, hash, true);
        db::credentials::create_credential(conn, &credential).await?;
        Some(otp)
    } else {
        None
    };

    tracing::info!(identity = %identity.id, "identity created");
    Ok((identity, one_time_password))
}

pub async fn get_identity(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    id: Uuid,
) -> Result<Identity, ServiceError> {
    if id != ctx.identity_id {
        require_role(ctx, Role::Admin)?;
    }
    db::identities::find_identity_by_id(conn, id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("identity {}", id)))
}

pub async fn list_identities(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    name: Option<&str>,
    pagination: &Pagination,
) -> Result<Vec<Identity>, ServiceError> {
    require_role(ctx, Role::Admin)?;
    Ok(db::identities::list_identities(conn, ctx.organization_id, name, pagination).await?)
}

/// Change an identity's password, replacing the credential and clearing the
/// one-time flag.
pub async fn update_password(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    identity_id: Uuid,
    new_password: String,
) -> Result<(), ServiceError> {
    if identity_id != ctx.identity_id {
        require_role(ctx, Role::Admin)?;
    }

    let hash = hash_password_blocking(new_password).await?;

    let updated = db::credentials::update_credential(conn, identity_id, &hash, false).await?;
    if updated == 0 {
        let credential = Credential::new(identity_id, hash, false);
        db::credentials::create_credential(conn, &credential).await?;
    }

    tracing::info!(identity = %identity_id, "password updated");
    Ok(())
}

/// Delete an identity and everything hanging off it: grants where it is the
/// subject, group-membership rows, access keys, credential, provider-user
/// snapshots, then the identity row. Runs on one transaction so nothing is
/// ever left dangling.
pub async fn delete_identity(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    id: Uuid,
) -> Result<(), ServiceError> {
    require_role(ctx, Role::Admin)?;

    db::grants::delete_grants_by_subject(conn, id).await?;
    db::groups::delete_memberships_by_identity(conn, id).await?;
    db::access_keys::delete_access_keys_by_identity(conn, id).await?;
    db::credentials::delete_credential_by_identity(conn, id).await?;
    db::provider_users::delete_provider_users_by_identity(conn, id).await?;

    let removed = db::identities::delete_identity_row(conn, id).await?;
    if removed == 0 {
        return Err(ServiceError::NotFound(format!("identity {}", id)));
    }

    tracing::info!(identity = %id, "identity deleted");
    Ok(())
}

// ==================== Access keys ====================

/// Create a machine credential. Self-service is allowed for the caller's own
/// identity; issuing for anyone else requires the admin role.
pub async fn create_access_key(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    issued_for: Uuid,
    name: String,
    ttl: Duration,
    extension: Duration,
) -> Result<(AccessKey, String), ServiceError> {
    if issued_for != ctx.identity_id {
        require_role(ctx, Role::Admin)?;
    }

    db::identities::find_identity_by_id(conn, issued_for)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("identity {}", issued_for)))?;

    let provider = builtin_provider(conn, ctx.organization_id).await?;
    let expires_at: DateTime<Utc> = Utc::now() + ttl;

    let mut key = access_keys::new_key(issued_for, provider.id, name, expires_at, extension);
    let bearer = access_keys::issue_access_key(conn, &mut key).await?;

    Ok((key, bearer))
}

pub async fn list_access_keys(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    pagination: &Pagination,
) -> Result<Vec<AccessKey>, ServiceError> {
    match require_role(ctx, Role::Admin) {
        Ok(()) => Ok(db::access_keys::list_access_keys(conn, None, pagination).await?),
        // non-admins see their own keys only
        Err(_) => {
            Ok(db::access_keys::list_access_keys(conn, Some(ctx.identity_id), pagination).await?)
        }
    }
}

/// Revoke an access key. Owners may revoke their own keys; everything else
/// requires the admin role. Idempotent for admins: a key that is already
/// gone is not an error.
pub async fn delete_access_key(
    conn: &mut SqliteConnection,
    ctx: &RequestContext,
    id: Uuid,
) -> Result<(), ServiceError> {
    match db::access_keys::find_access_key_by_id(conn, id).await? {
        Some(key) if key.issued_for == ctx.identity_id => {}
        Some(_) => require_role(ctx, Role::Admin)?,
        None => {
            require_role(ctx, Role::Admin)?;
            return Ok(());
        }
    }

    access_keys::revoke(conn, id).await
}

async fn hash_password_blocking(password: String) -> Result<String, ServiceError> {
    let hash = tokio::task::spawn_blocking(move || hash_password(&Password::new(password)))
        .await
        .map_err(|e| ServiceError::Internal(anyhow::anyhow!("hashing task failed: {}", e)))?
        .map_err(ServiceError::Internal)?;
    Ok(hash.into_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(role: Option<Role>) -> RequestContext {
        RequestContext {
            identity_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            role,
            access_key_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_require_role_admin() {
        assert!(require_role(&ctx(Some(Role::Admin)), Role::Admin).is_ok());
        assert!(require_role(&ctx(Some(Role::View)), Role::Admin).is_err());
        assert!(require_role(&ctx(None), Role::Admin).is_err());
    }

    #[test]
    fn test_admin_satisfies_view() {
        assert!(require_role(&ctx(Some(Role::Admin)), Role::View).is_ok());
        assert!(require_role(&ctx(Some(Role::View)), Role::View).is_ok());
        assert!(require_role(&ctx(None), Role::View).is_err());
    }
}
