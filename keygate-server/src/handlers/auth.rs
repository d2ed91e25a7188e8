//! Login and logout.

use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use keygate_core::error::AppError;

use crate::db;
use crate::handlers::cookies::{clear_auth_cookies, set_auth_cookies};
use crate::middleware::Ctx;
use crate::models::SCOPE_PASSWORD_RESET;
use crate::services::{access_keys, authn, ServiceError};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct PasswordCredentials {
    #[validate(email)]
    pub name: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct OidcCredentials {
    pub provider_id: Uuid,
    #[validate(length(min = 1))]
    pub redirect_url: String,
    #[validate(length(min = 1))]
    pub code: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct KeyExchangeCredentials {
    #[validate(length(min = 1))]
    pub bearer: String,
}

/// Exactly one method variant must be selected.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub password_credentials: Option<PasswordCredentials>,
    pub oidc: Option<OidcCredentials>,
    pub key_exchange: Option<KeyExchangeCredentials>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub bearer_token: String,
    pub identity_name: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub password_reset_required: bool,
}

impl LoginRequest {
    /// Map the request shape onto the closed method set.
    fn into_method(self) -> Result<authn::LoginMethod, AppError> {
        match (self.password_credentials, self.oidc, self.key_exchange) {
            (Some(pc), None, None) => {
                pc.validate()?;
                Ok(authn::LoginMethod::PasswordCredential {
                    name: pc.name,
                    password: pc.password,
                })
            }
            (None, Some(oidc), None) => {
                oidc.validate()?;
                Ok(authn::LoginMethod::Oidc {
                    provider_id: oidc.provider_id,
                    redirect_url: oidc.redirect_url,
                    code: oidc.code,
                })
            }
            (None, None, Some(exchange)) => {
                exchange.validate()?;
                Ok(authn::LoginMethod::KeyExchange {
                    bearer: exchange.bearer,
                })
            }
            _ => Err(AppError::BadRequest(anyhow::anyhow!(
                "exactly one login method must be provided"
            ))),
        }
    }
}

/// Authenticate and open a session
#[utoipa::path(
    post,
    path = "/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 400, description = "Malformed method selection"),
        (status = 401, description = "Authentication failed"),
        (status = 502, description = "Identity provider unavailable")
    ),
    tag = "Authentication"
)]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let method = req.into_method()?;

    let requested_expiry = Utc::now() + Duration::minutes(state.config.session.duration_minutes);
    let key_extension = Duration::minutes(state.config.session.extension_minutes);

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let (key, bearer) = authn::login(
        &mut tx,
        state.oidc.as_ref(),
        &state.organization,
        &method,
        requested_expiry,
        key_extension,
    )
    .await?;

    let identity = db::identities::find_identity_by_id(&mut tx, key.issued_for)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("identity vanished mid-login")))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let jar = set_auth_cookies(jar, &bearer, key.expires_at);

    Ok((
        jar,
        Json(LoginResponse {
            bearer_token: bearer,
            identity_name: identity.name,
            user_id: identity.id,
            expires_at: key.expires_at,
            password_reset_required: key.has_scope(SCOPE_PASSWORD_RESET),
        }),
    ))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LogoutResponse {
    pub message: String,
}

/// Close the caller's session
#[utoipa::path(
    post,
    path = "/v1/logout",
    responses(
        (status = 200, description = "Session closed", body = LogoutResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Authentication"
)]
pub async fn logout(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    jar: CookieJar,
) -> Result<(CookieJar, Json<LogoutResponse>), AppError> {
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    access_keys::revoke(&mut tx, ctx.access_key_id).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    tracing::info!(identity = %ctx.identity_id, "logged out");

    Ok((
        clear_auth_cookies(jar),
        Json(LogoutResponse {
            message: "logged out".to_string(),
        }),
    ))
}
