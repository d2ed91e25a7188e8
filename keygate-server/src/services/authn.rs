//! Authentication engine: the closed set of login methods and the login
//! orchestration that turns a verified principal into an access key.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use std::sync::OnceLock;
use uuid::Uuid;

use crate::db;
use crate::models::{
    AccessKey, Identity, Organization, Provider, ProviderUser, SCOPE_PASSWORD_RESET,
};
use crate::services::oidc::OidcClient;
use crate::services::{access_keys, groups, ServiceError};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

/// Restrictions attached to a freshly authenticated session.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthScope {
    /// Session may only be used to change the caller's password.
    pub password_reset_only: bool,
}

/// Output of a successful authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub identity: Identity,
    pub provider: Provider,
    pub session_expiry: DateTime<Utc>,
    pub scope: AuthScope,
}

/// The closed set of authentication methods.
///
/// Selected exhaustively at the request boundary from the inbound request
/// shape; deliberately not an open registry, the variant set is small and
/// security-sensitive.
#[derive(Debug)]
pub enum LoginMethod {
    PasswordCredential {
        name: String,
        password: String,
    },
    KeyExchange {
        bearer: String,
    },
    Oidc {
        provider_id: Uuid,
        redirect_url: String,
        code: String,
    },
}

/// Hash verified against when the identity or credential is unknown, so both
/// failure paths do comparable work.
fn dummy_password_hash() -> &'static PasswordHashString {
    static DUMMY: OnceLock<PasswordHashString> = OnceLock::new();
    DUMMY.get_or_init(|| {
        hash_password(&Password::new("unused-dummy-credential".to_string()))
            .expect("hashing a fixed password cannot fail")
    })
}

/// Argon2 verification is deliberately expensive; run it on the blocking
/// pool so it never stalls the async executor (no lock is held beyond the
/// ambient transaction).
async fn verify_password_blocking(password: String, hash: String) -> Result<(), ServiceError> {
    let outcome = tokio::task::spawn_blocking(move || {
        verify_password(&Password::new(password), &PasswordHashString::new(hash))
    })
    .await
    .map_err(|e| ServiceError::Internal(anyhow::anyhow!("verification task failed: {}", e)))?;

    outcome.map_err(|_| ServiceError::InvalidCredentials)
}

impl LoginMethod {
    /// Method name for audit and telemetry tagging.
    pub fn name(&self) -> &'static str {
        match self {
            LoginMethod::PasswordCredential { .. } => "credentials",
            LoginMethod::KeyExchange { .. } => "exchange",
            LoginMethod::Oidc { .. } => "oidc",
        }
    }

    /// Whether the authenticated principal still has to rotate a one-time
    /// password; consulted by the session layer after authentication.
    pub async fn requires_update(
        &self,
        conn: &mut SqliteConnection,
        organization: &Organization,
    ) -> Result<bool, ServiceError> {
        match self {
            LoginMethod::PasswordCredential { name, .. } => {
                let identity =
                    match db::identities::find_identity_by_name(conn, organization.id, name).await?
                    {
                        Some(identity) => identity,
                        None => return Ok(false),
                    };
                let credential =
                    db::credentials::find_credential_by_identity(conn, identity.id).await?;
                Ok(credential.map(|c| c.one_time_password).unwrap_or(false))
            }
            LoginMethod::KeyExchange { .. } | LoginMethod::Oidc { .. } => Ok(false),
        }
    }

    /// Verify the principal behind this method.
    ///
    /// Unknown names and wrong passwords fail identically with
    /// `InvalidCredentials`; upstream transport failures surface as
    /// `UpstreamUnavailable` and nothing else.
    pub async fn authenticate(
        &self,
        conn: &mut SqliteConnection,
        oidc_client: &dyn OidcClient,
        organization: &Organization,
        requested_expiry: DateTime<Utc>,
    ) -> Result<AuthenticatedIdentity, ServiceError> {
        match self {
            LoginMethod::PasswordCredential { name, password } => {
                authenticate_password(conn, organization, name, password, requested_expiry).await
            }
            LoginMethod::KeyExchange { bearer } => {
                authenticate_key_exchange(conn, bearer, requested_expiry).await
            }
            LoginMethod::Oidc {
                provider_id,
                redirect_url,
                code,
            } => {
                authenticate_oidc(
                    conn,
                    oidc_client,
                    organization,
                    *provider_id,
                    redirect_url,
                    code,
                    requested_expiry,
                )
                .await
            }
        }
    }
}

async fn authenticate_password(
    conn: &mut SqliteConnection,
    organization: &Organization,
    name: &str,
    password: &str,
    requested_expiry: DateTime<Utc>,
) -> Result<AuthenticatedIdentity, ServiceError> {
    let identity = db::identities::find_identity_by_name(conn, organization.id, name).await?;
    let credential = match &identity {
        Some(identity) => db::credentials::find_credential_by_identity(conn, identity.id).await?,
        None => None,
    };

    let stored_hash = credential
        .as_ref()
        .map(|c| c.password_hash.clone())
        .unwrap_or_else(|| dummy_password_hash().as_str().to_string());

    let verified = verify_password_blocking(password.to_string(), stored_hash).await;

    let (identity, credential) = match (identity, credential) {
        (Some(identity), Some(credential)) => (identity, credential),
        // the dummy verification already ran; fail exactly like a bad password
        _ => return Err(ServiceError::InvalidCredentials),
    };
    verified?;

    let provider = db::providers::find_internal_provider(conn, organization.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("built-in provider missing for {}", organization.name))?;

    Ok(AuthenticatedIdentity {
        identity,
        provider,
        session_expiry: requested_expiry,
        scope: AuthScope {
            password_reset_only: credential.one_time_password,
        },
    })
}

async fn authenticate_key_exchange(
    conn: &mut SqliteConnection,
    bearer: &str,
    requested_expiry: DateTime<Utc>,
) -> Result<AuthenticatedIdentity, ServiceError> {
    let key = access_keys::validate_and_get_token(conn, bearer).await?;

    let identity = db::identities::find_identity_by_id(conn, key.issued_for)
        .await?
        .ok_or(ServiceError::InvalidCredentials)?;
    let provider = db::providers::find_provider_by_id(conn, key.provider_id)
        .await?
        .ok_or(ServiceError::InvalidCredentials)?;

    // an exchanged session can never outlive the key it was minted from
    let session_expiry = requested_expiry.min(key.expires_at);

    Ok(AuthenticatedIdentity {
        identity,
        provider,
        session_expiry,
        scope: AuthScope {
            password_reset_only: key.has_scope(SCOPE_PASSWORD_RESET),
        },
    })
}

async fn authenticate_oidc(
    conn: &mut SqliteConnection,
    oidc_client: &dyn OidcClient,
    organization: &Organization,
    provider_id: Uuid,
    redirect_url: &str,
    code: &str,
    requested_expiry: DateTime<Utc>,
) -> Result<AuthenticatedIdentity, ServiceError> {
    let provider = db::providers::find_provider_by_id(conn, provider_id)
        .await?
        .ok_or_else(|| ServiceError::BadRequest(format!("unknown provider {}", provider_id)))?;

    if provider.is_internal() {
        return Err(ServiceError::BadRequest(
            "the built-in provider does not support oidc login".to_string(),
        ));
    }

    let claims = oidc_client.exchange_code(&provider, redirect_url, code).await?;

    let identity =
        match db::identities::find_identity_by_name(conn, organization.id, &claims.email).await? {
            Some(identity) => identity,
            None => {
                let identity = Identity::new(organization.id, claims.email.clone());
                db::identities::create_identity(conn, &identity).await?;
                tracing::info!(identity = %identity.id, provider = %provider.name, "identity created from federated login");
                identity
            }
        };

    if db::provider_users::find_provider_user(conn, provider.id, identity.id)
        .await?
        .is_none()
    {
        let provider_user = ProviderUser::new(identity.id, provider.id, claims.email.clone());
        db::provider_users::save_provider_user(conn, &provider_user).await?;
    }

    groups::sync_groups(conn, &identity, &provider, &claims.groups).await?;

    Ok(AuthenticatedIdentity {
        identity,
        provider,
        session_expiry: requested_expiry,
        scope: AuthScope::default(),
    })
}

/// Authenticate and mint an access key for the verified principal.
///
/// Runs entirely on the caller's transaction connection: if any step fails
/// the whole login aborts and no key is persisted. The identity's last-seen
/// timestamp is updated in the same transaction.
pub async fn login(
    conn: &mut SqliteConnection,
    oidc_client: &dyn OidcClient,
    organization: &Organization,
    method: &LoginMethod,
    requested_expiry: DateTime<Utc>,
    key_extension: Duration,
) -> Result<(AccessKey, String), ServiceError> {
    let authenticated = match method
        .authenticate(conn, oidc_client, organization, requested_expiry)
        .await
    {
        Ok(authenticated) => authenticated,
        Err(err) => {
            tracing::warn!(method = method.name(), error = %err, "failed to login");
            return Err(err);
        }
    };

    let mut key = access_keys::new_key(
        authenticated.identity.id,
        authenticated.provider.id,
        String::new(),
        authenticated.session_expiry,
        key_extension,
    );

    if authenticated.scope.password_reset_only {
        key.add_scope(SCOPE_PASSWORD_RESET);
    }

    let bearer = access_keys::issue_access_key(conn, &mut key).await?;

    db::identities::update_last_seen(conn, authenticated.identity.id, Utc::now()).await?;

    tracing::info!(
        method = method.name(),
        identity = %authenticated.identity.id,
        provider = %authenticated.provider.name,
        "login succeeded"
    );

    Ok((key, bearer))
}
