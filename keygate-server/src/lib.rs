pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use keygate_core::config::Environment;
use keygate_core::error::AppError;
use keygate_core::middleware::rate_limit::{ip_rate_limit_middleware, IpRateLimiter};

use crate::config::ServerConfig;
use crate::models::{Credential, Grant, Identity, Organization, Provider, ProviderKind, Role,
    RESOURCE_KEYGATE};
use crate::services::{JwtService, OidcClient};
use crate::utils::{generate_one_time_password, hash_password, Password};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::well_known::jwks,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::tokens::create_token,
        handlers::access_keys::create_access_key,
        handlers::access_keys::list_access_keys,
        handlers::access_keys::delete_access_key,
        handlers::providers::list_providers,
        handlers::providers::get_provider,
        handlers::providers::create_provider,
        handlers::providers::update_provider,
        handlers::providers::delete_provider,
        handlers::identities::create_identity,
        handlers::identities::list_identities,
        handlers::identities::get_identity,
        handlers::identities::update_identity,
        handlers::identities::delete_identity,
    ),
    components(
        schemas(
            handlers::auth::LoginRequest,
            handlers::auth::LoginResponse,
            handlers::auth::LogoutResponse,
            handlers::auth::PasswordCredentials,
            handlers::auth::OidcCredentials,
            handlers::auth::KeyExchangeCredentials,
            handlers::tokens::TokenResponse,
            handlers::access_keys::CreateAccessKeyRequest,
            handlers::access_keys::CreateAccessKeyResponse,
            handlers::access_keys::AccessKeyResponse,
            handlers::providers::CreateProviderRequest,
            handlers::providers::UpdateProviderRequest,
            handlers::providers::ProviderResponse,
            handlers::identities::CreateIdentityRequest,
            handlers::identities::CreateIdentityResponse,
            handlers::identities::IdentityResponse,
            handlers::identities::UpdateIdentityRequest,
        )
    ),
    tags(
        (name = "Authentication", description = "Login, logout, identity assertions"),
        (name = "Access Keys", description = "Machine-credential lifecycle"),
        (name = "Providers", description = "Identity provider administration"),
        (name = "Identities", description = "Identity administration"),
        (name = "Well-Known", description = "Public service metadata"),
        (name = "Observability", description = "Service health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub pool: sqlx::SqlitePool,
    /// The tenant this server instance fronts, resolved at startup.
    pub organization: Organization,
    pub jwt: JwtService,
    pub oidc: Arc<dyn OidcClient>,
    pub login_rate_limiter: IpRateLimiter,
    pub ip_rate_limiter: IpRateLimiter,
}

/// Seed the default organization, the built-in provider, and (optionally) a
/// bootstrap admin with a one-time password. Idempotent across restarts.
pub async fn bootstrap(
    pool: &sqlx::SqlitePool,
    config: &config::BootstrapConfig,
) -> Result<Organization, AppError> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    let organization =
        match db::organizations::find_organization_by_name(&mut tx, &config.organization_name)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?
        {
            Some(org) => org,
            None => {
                let org = Organization::new(
                    config.organization_name.clone(),
                    config.organization_domain.clone(),
                );
                db::organizations::create_organization(&mut tx, &org)
                    .await
                    .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
                tracing::info!(organization = %org.name, "organization created");
                org
            }
        };

    if db::providers::find_internal_provider(&mut tx, organization.id)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?
        .is_none()
    {
        let provider = Provider::new(
            organization.id,
            "keygate".to_string(),
            ProviderKind::Internal,
        );
        db::providers::create_provider(&mut tx, &provider)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
        tracing::info!(provider = %provider.id, "built-in provider created");
    }

    if let Some(admin_name) = &config.admin_name {
        let existing = db::identities::find_identity_by_name(&mut tx, organization.id, admin_name)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;
        if existing.is_none() {
            let identity = Identity::new(organization.id, admin_name.clone());
            db::identities::create_identity(&mut tx, &identity)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

            let otp = generate_one_time_password(12);
            let hash = hash_password(&Password::new(otp.clone()))
                .map_err(AppError::InternalError)?
                .into_string();
            let credential = Credential::new(identity.id, hash, true);
            db::credentials::create_credential(&mut tx, &credential)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

            let grant = Grant::new(
                organization.id,
                identity.id,
                RESOURCE_KEYGATE.to_string(),
                Role::Admin,
            );
            db::grants::create_grant(&mut tx, &grant)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

            // printed once at first start; rotated on first login
            tracing::warn!(
                admin = %admin_name,
                one_time_password = %otp,
                "bootstrap admin created with a one-time password"
            );
        }
    }

    tx.commit()
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::Error::new(e)))?;

    Ok(organization)
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Login route with its own tighter rate limit
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/v1/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    // Everything below requires a valid session
    let authed_routes = Router::new()
        .route("/v1/logout", post(handlers::auth::logout))
        .route("/v1/token", post(handlers::tokens::create_token))
        .route(
            "/v1/access-keys",
            post(handlers::access_keys::create_access_key)
                .get(handlers::access_keys::list_access_keys),
        )
        .route(
            "/v1/access-keys/:id",
            axum::routing::delete(handlers::access_keys::delete_access_key),
        )
        .route(
            "/v1/providers",
            get(handlers::providers::list_providers).post(handlers::providers::create_provider),
        )
        .route(
            "/v1/providers/:id",
            get(handlers::providers::get_provider)
                .put(handlers::providers::update_provider)
                .delete(handlers::providers::delete_provider),
        )
        .route(
            "/v1/identities",
            post(handlers::identities::create_identity)
                .get(handlers::identities::list_identities),
        )
        .route(
            "/v1/identities/:id",
            get(handlers::identities::get_identity)
                .put(handlers::identities::update_identity)
                .delete(handlers::identities::delete_identity),
        )
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/.well-known/jwks.json", get(handlers::well_known::jwks));

    let swagger_enabled = state.config.environment == Environment::Dev;
    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        // still provide the OpenAPI JSON for programmatic access
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    let ip_limiter = state.ip_rate_limiter.clone();

    let app = app
        .merge(login_route)
        .merge(authed_routes)
        .with_state(state.clone())
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ])
                .allow_credentials(true),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "Service is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    sqlx::query("SELECT 1")
        .execute(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "database health check failed");
            AppError::DatabaseError(anyhow::Error::new(e))
        })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "checks": {
            "database": "up"
        }
    })))
}
