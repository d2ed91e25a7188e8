//! Identity administration.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use keygate_core::error::AppError;

use crate::db;
use crate::middleware::Ctx;
use crate::models::{Identity, Pagination};
use crate::services::{access, ServiceError};
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateIdentityRequest {
    #[validate(email)]
    pub name: String,
    /// Generate a one-time password for the new identity; its cleartext is
    /// returned exactly once.
    #[serde(default)]
    pub set_one_time_password: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateIdentityResponse {
    pub id: Uuid,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_time_password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IdentityResponse {
    pub id: Uuid,
    pub name: String,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

impl From<Identity> for IdentityResponse {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            name: identity.name,
            last_seen_at: identity.last_seen_at,
            created_at: identity.created_at,
            groups: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateIdentityRequest {
    #[validate(length(min = 8))]
    pub password: String,
}

/// Create an identity
#[utoipa::path(
    post,
    path = "/v1/identities",
    request_body = CreateIdentityRequest,
    responses(
        (status = 201, description = "Identity created", body = CreateIdentityResponse),
        (status = 401, description = "Admin role required")
    ),
    tag = "Identities"
)]
pub async fn create_identity(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Json(req): Json<CreateIdentityRequest>,
) -> Result<(StatusCode, Json<CreateIdentityResponse>), AppError> {
    req.validate()?;

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let (identity, one_time_password) =
        access::create_identity(&mut tx, &ctx, req.name, req.set_one_time_password).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateIdentityResponse {
            id: identity.id,
            name: identity.name,
            one_time_password,
        }),
    ))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListIdentitiesQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// List identities
#[utoipa::path(
    get,
    path = "/v1/identities",
    params(ListIdentitiesQuery),
    responses(
        (status = 200, description = "Identities listed", body = [IdentityResponse]),
        (status = 401, description = "Admin role required")
    ),
    tag = "Identities"
)]
pub async fn list_identities(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Query(query): Query<ListIdentitiesQuery>,
) -> Result<Json<Vec<IdentityResponse>>, AppError> {
    let pagination = Pagination::new(query.page.unwrap_or(1), query.limit.unwrap_or(100));

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let identities =
        access::list_identities(&mut tx, &ctx, query.name.as_deref(), &pagination).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(Json(
        identities.into_iter().map(IdentityResponse::from).collect(),
    ))
}

/// Fetch one identity with its group memberships
#[utoipa::path(
    get,
    path = "/v1/identities/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    responses(
        (status = 200, description = "Identity found", body = IdentityResponse),
        (status = 401, description = "Admin role required for other identities"),
        (status = 404, description = "No such identity")
    ),
    tag = "Identities"
)]
pub async fn get_identity(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<Uuid>,
) -> Result<Json<IdentityResponse>, AppError> {
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let identity = access::get_identity(&mut tx, &ctx, id).await?;
    let groups = db::groups::list_groups_by_member(&mut tx, identity.id)
        .await
        .map_err(|e| AppError::from(ServiceError::from(e)))?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let mut response = IdentityResponse::from(identity);
    response.groups = groups.into_iter().map(|g| g.name).collect();

    Ok(Json(response))
}

/// Change an identity's password
#[utoipa::path(
    put,
    path = "/v1/identities/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    request_body = UpdateIdentityRequest,
    responses(
        (status = 200, description = "Password updated"),
        (status = 401, description = "Admin role required for other identities"),
        (status = 422, description = "Password too short")
    ),
    tag = "Identities"
)]
pub async fn update_identity(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateIdentityRequest>,
) -> Result<StatusCode, AppError> {
    req.validate()?;

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    access::update_password(&mut tx, &ctx, id, req.password).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(StatusCode::OK)
}

/// Delete an identity and everything referencing it
#[utoipa::path(
    delete,
    path = "/v1/identities/{id}",
    params(("id" = Uuid, Path, description = "Identity ID")),
    responses(
        (status = 204, description = "Identity deleted"),
        (status = 401, description = "Admin role required"),
        (status = 404, description = "No such identity")
    ),
    tag = "Identities"
)]
pub async fn delete_identity(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    access::delete_identity(&mut tx, &ctx, id).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(StatusCode::NO_CONTENT)
}
