//! Bearer-resolving authentication middleware.
//!
//! Resolves the caller's access key from the Authorization header or the
//! session cookie, validates it (sliding the extension deadline), resolves
//! the caller's role from grants, and threads the result through the request
//! as an immutable `RequestContext` extension.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, Method},
    middleware::Next,
    response::IntoResponse,
};
use axum_extra::extract::cookie::CookieJar;
use keygate_core::error::AppError;

use crate::db;
use crate::handlers::cookies::COOKIE_TOKEN_NAME;
use crate::models::{RESOURCE_KEYGATE, SCOPE_PASSWORD_RESET};
use crate::services::{access_keys, RequestContext, ServiceError};
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, AppError> {
    let header_bearer = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|value| value.to_string());

    let bearer = match header_bearer
        .or_else(|| jar.get(COOKIE_TOKEN_NAME).map(|c| c.value().to_string()))
    {
        Some(bearer) => bearer,
        None => {
            return Err(AppError::Unauthorized(anyhow::anyhow!(
                "missing bearer token"
            )));
        }
    };

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let key = access_keys::validate_and_extend(&mut tx, &bearer)
        .await
        .map_err(AppError::from)?;

    let identity = db::identities::find_identity_by_id(&mut tx, key.issued_for)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthorized")))?;

    let role = db::grants::find_role(&mut tx, identity.id, RESOURCE_KEYGATE)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    // a password-reset-only session can do nothing but change the password
    if key.has_scope(SCOPE_PASSWORD_RESET) && !is_password_change(req.method(), req.uri().path()) {
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "password must be changed before this session can be used"
        )));
    }

    let ctx = RequestContext {
        identity_id: identity.id,
        organization_id: identity.organization_id,
        role,
        access_key_id: key.id,
    };
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

fn is_password_change(method: &Method, path: &str) -> bool {
    method == Method::PUT && path.starts_with("/v1/identities/")
}

/// Extractor handing handlers the request context the middleware resolved.
pub struct Ctx(pub RequestContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts.extensions.get::<RequestContext>().ok_or_else(|| {
            AppError::InternalError(anyhow::anyhow!(
                "request context missing from request extensions"
            ))
        })?;

        Ok(Ctx(ctx.clone()))
    }
}
