use keygate_core::error::AppError;
use thiserror::Error;

/// Domain errors of the trust core.
///
/// `InvalidCredentials` deliberately covers both unknown-name and bad-secret
/// failures so callers cannot enumerate accounts.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("access key expired or revoked")]
    ExpiredOrRevoked,

    #[error("identity provider unavailable: {0}")]
    UpstreamUnavailable(anyhow::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            // authentication failures collapse to 401 at the boundary
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("unauthorized"))
            }
            ServiceError::ExpiredOrRevoked => {
                AppError::Unauthorized(anyhow::anyhow!("unauthorized"))
            }
            // upstream failures pass through unchanged: distinct, retryable
            ServiceError::UpstreamUnavailable(e) => AppError::BadGateway(e.to_string()),
            ServiceError::BadRequest(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            ServiceError::Unauthorized(msg) => AppError::Unauthorized(anyhow::anyhow!(msg)),
            ServiceError::NotFound(msg) => AppError::NotFound(anyhow::anyhow!(msg)),
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
