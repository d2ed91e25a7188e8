use keygate_core::middleware::rate_limit::create_ip_rate_limiter;
use keygate_core::observability::logging::init_tracing;
use keygate_server::{
    bootstrap, build_router, config::ServerConfig, db, services::HttpOidcClient,
    services::JwtService, AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> Result<(), keygate_core::error::AppError> {
    // Pick up a local .env in development; ignore when absent
    let _ = dotenvy::dotenv();

    // Load configuration - fail fast if invalid
    let config = ServerConfig::from_env()?;

    init_tracing(&config.service_name, &config.log_level);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting keygate server"
    );

    // Database
    let pool = db::connect(&config.database.path)
        .await
        .map_err(|e| keygate_core::error::AppError::DatabaseError(anyhow::Error::new(e)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| keygate_core::error::AppError::DatabaseError(anyhow::Error::new(e)))?;
    tracing::info!("database initialized");

    // Default organization, built-in provider, optional bootstrap admin
    let organization = bootstrap(&pool, &config.bootstrap).await?;

    // Server signing keypair
    let jwt = JwtService::new(&config.jwt)?;

    // Upstream identity-provider client with the configured timeout
    let oidc = Arc::new(
        HttpOidcClient::new(Duration::from_secs(config.security.oidc_timeout_seconds))
            .map_err(keygate_core::error::AppError::InternalError)?,
    );

    // Rate limiters
    let login_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.login_attempts,
        config.rate_limit.login_window_seconds,
    );
    let ip_rate_limiter = create_ip_rate_limiter(
        config.rate_limit.global_ip_limit,
        config.rate_limit.global_ip_window_seconds,
    );

    let port = config.port;
    let state = AppState {
        config,
        pool,
        organization,
        jwt,
        oidc,
        login_rate_limiter,
        ip_rate_limiter,
    };

    let app = build_router(state).await?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(address = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
