//! Machine-credential lifecycle management.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use keygate_core::error::AppError;

use crate::middleware::Ctx;
use crate::models::{AccessKey, Pagination};
use crate::services::access;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAccessKeyRequest {
    /// Identity the key is issued for; defaults to the caller.
    pub identity_id: Option<Uuid>,
    #[serde(default)]
    pub name: String,
    pub ttl_seconds: i64,
    pub extension_seconds: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessKeyResponse {
    pub id: Uuid,
    pub name: String,
    pub issued_for: Uuid,
    pub provider_id: Uuid,
    pub expires_at: DateTime<Utc>,
    pub extension_seconds: i64,
    pub extension_deadline: DateTime<Utc>,
    pub scopes: Vec<String>,
    pub key_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<AccessKey> for AccessKeyResponse {
    fn from(key: AccessKey) -> Self {
        let scopes = key.scope_names().iter().map(|s| s.to_string()).collect();
        Self {
            id: key.id,
            name: key.name,
            issued_for: key.issued_for,
            provider_id: key.provider_id,
            expires_at: key.expires_at,
            extension_seconds: key.extension_seconds,
            extension_deadline: key.extension_deadline,
            scopes,
            key_id: key.key_id,
            created_at: key.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateAccessKeyResponse {
    pub key: AccessKeyResponse,
    /// Full bearer; shown once and never recoverable afterwards.
    pub bearer_token: String,
}

/// Create a machine credential
#[utoipa::path(
    post,
    path = "/v1/access-keys",
    request_body = CreateAccessKeyRequest,
    responses(
        (status = 201, description = "Key created", body = CreateAccessKeyResponse),
        (status = 401, description = "Admin role required for other identities")
    ),
    tag = "Access Keys"
)]
pub async fn create_access_key(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Json(req): Json<CreateAccessKeyRequest>,
) -> Result<(StatusCode, Json<CreateAccessKeyResponse>), AppError> {
    if req.ttl_seconds <= 0 || req.extension_seconds <= 0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "ttl_seconds and extension_seconds must be positive"
        )));
    }

    let issued_for = req.identity_id.unwrap_or(ctx.identity_id);

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let (key, bearer) = access::create_access_key(
        &mut tx,
        &ctx,
        issued_for,
        req.name,
        Duration::seconds(req.ttl_seconds),
        Duration::seconds(req.extension_seconds),
    )
    .await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAccessKeyResponse {
            key: key.into(),
            bearer_token: bearer,
        }),
    ))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListAccessKeysQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// List access keys
#[utoipa::path(
    get,
    path = "/v1/access-keys",
    params(ListAccessKeysQuery),
    responses(
        (status = 200, description = "Keys listed", body = [AccessKeyResponse])
    ),
    tag = "Access Keys"
)]
pub async fn list_access_keys(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Query(query): Query<ListAccessKeysQuery>,
) -> Result<Json<Vec<AccessKeyResponse>>, AppError> {
    let pagination = Pagination::new(query.page.unwrap_or(1), query.limit.unwrap_or(100));

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let keys = access::list_access_keys(&mut tx, &ctx, &pagination).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(Json(keys.into_iter().map(AccessKeyResponse::from).collect()))
}

/// Revoke an access key
#[utoipa::path(
    delete,
    path = "/v1/access-keys/{id}",
    params(("id" = Uuid, Path, description = "Access key ID")),
    responses(
        (status = 204, description = "Key revoked (idempotent)"),
        (status = 401, description = "Admin role required for other identities' keys")
    ),
    tag = "Access Keys"
)]
pub async fn delete_access_key(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    access::delete_access_key(&mut tx, &ctx, id).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(StatusCode::NO_CONTENT)
}
