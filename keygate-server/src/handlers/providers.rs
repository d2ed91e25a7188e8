//! Provider administration. Every mutation funnels through the
//! authorization guard, which protects the built-in provider
//! unconditionally.

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

use crate::middleware::Ctx;
use crate::models::{Pagination, Provider, ProviderKind};
use crate::services::access;
use crate::AppState;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProviderRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[validate(length(min = 1))]
    pub client_id: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProviderRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(url)]
    pub url: String,
    #[validate(length(min = 1))]
    pub client_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProviderResponse {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub url: String,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Provider> for ProviderResponse {
    fn from(p: Provider) -> Self {
        Self {
            id: p.id,
            name: p.name,
            kind: p.kind,
            url: p.url,
            client_id: p.client_id,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProvidersQuery {
    pub name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// List identity providers
#[utoipa::path(
    get,
    path = "/v1/providers",
    params(ListProvidersQuery),
    responses((status = 200, description = "Providers listed", body = [ProviderResponse])),
    tag = "Providers"
)]
pub async fn list_providers(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Query(query): Query<ListProvidersQuery>,
) -> Result<Json<Vec<ProviderResponse>>, AppError> {
    let pagination = Pagination::new(query.page.unwrap_or(1), query.limit.unwrap_or(100));

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let providers =
        access::list_providers(&mut tx, &ctx, query.name.as_deref(), &pagination).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(Json(
        providers.into_iter().map(ProviderResponse::from).collect(),
    ))
}

/// Fetch one provider
#[utoipa::path(
    get,
    path = "/v1/providers/{id}",
    params(("id" = Uuid, Path, description = "Provider ID")),
    responses(
        (status = 200, description = "Provider found", body = ProviderResponse),
        (status = 404, description = "No such provider")
    ),
    tag = "Providers"
)]
pub async fn get_provider(
    State(state): State<AppState>,
    Ctx(_ctx): Ctx,
    Path(id): Path<Uuid>,
) -> Result<Json<ProviderResponse>, AppError> {
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let provider = access::get_provider(&mut tx, id).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(Json(provider.into()))
}

/// Register an identity provider
#[utoipa::path(
    post,
    path = "/v1/providers",
    request_body = CreateProviderRequest,
    responses(
        (status = 201, description = "Provider created", body = ProviderResponse),
        (status = 401, description = "Admin role required")
    ),
    tag = "Providers"
)]
pub async fn create_provider(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Json(req): Json<CreateProviderRequest>,
) -> Result<(StatusCode, Json<ProviderResponse>), AppError> {
    req.validate()?;

    let mut provider = Provider::new(ctx.organization_id, req.name, ProviderKind::Oidc);
    provider.url = req.url;
    provider.client_id = req.client_id;

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    access::create_provider(&mut tx, &ctx, &provider).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok((StatusCode::CREATED, Json(provider.into())))
}

/// Update an identity provider
#[utoipa::path(
    put,
    path = "/v1/providers/{id}",
    params(("id" = Uuid, Path, description = "Provider ID")),
    request_body = UpdateProviderRequest,
    responses(
        (status = 200, description = "Provider updated", body = ProviderResponse),
        (status = 400, description = "Built-in provider is immutable"),
        (status = 401, description = "Admin role required")
    ),
    tag = "Providers"
)]
pub async fn update_provider(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProviderRequest>,
) -> Result<Json<ProviderResponse>, AppError> {
    req.validate()?;

    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let mut provider = access::get_provider(&mut tx, id).await?;
    provider.name = req.name;
    provider.url = req.url;
    provider.client_id = req.client_id;
    provider.updated_at = Utc::now();

    access::save_provider(&mut tx, &ctx, &provider).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(Json(provider.into()))
}

/// Remove an identity provider
#[utoipa::path(
    delete,
    path = "/v1/providers/{id}",
    params(("id" = Uuid, Path, description = "Provider ID")),
    responses(
        (status = 204, description = "Provider deleted"),
        (status = 400, description = "Built-in provider is immutable"),
        (status = 401, description = "Admin role required")
    ),
    tag = "Providers"
)]
pub async fn delete_provider(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let mut tx = state
        .pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    access::delete_provider(&mut tx, &ctx, id).await?;

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(StatusCode::NO_CONTENT)
}
