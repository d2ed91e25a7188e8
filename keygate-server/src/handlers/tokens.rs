//! Signed identity assertions for downstream services.
//!
//! The caller trades its session for a short-lived JWT that downstream
//! services verify against the key published at the discovery endpoint.

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use keygate_core::error::AppError;

use crate::db;
use crate::middleware::Ctx;
use crate::services::ServiceError;
use crate::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: i64,
}

/// Mint a signed identity assertion
#[utoipa::path(
    post,
    path = "/v1/token",
    responses(
        (status = 200, description = "Token minted", body = TokenResponse),
        (status = 401, description = "Not authenticated")
    ),
    tag = "Authentication"
)]
pub async fn create_token(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
) -> Result<Json<TokenResponse>, AppError> {
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let identity = db::identities::find_identity_by_id(&mut tx, ctx.identity_id)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("unauthorized")))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let (token, expires_at) = state
        .jwt
        .generate_identity_token(&identity.id.to_string(), &identity.name)
        .map_err(AppError::InternalError)?;

    Ok(Json(TokenResponse { token, expires_at }))
}
