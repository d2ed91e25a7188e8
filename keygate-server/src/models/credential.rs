use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Password credential for an identity. One per identity; replaced on
/// password change.
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub id: Uuid,
    pub identity_id: Uuid,
    /// Argon2 PHC string; never the raw password.
    pub password_hash: String,
    /// When set, sessions issued from this credential are restricted to the
    /// password-reset scope until the password is changed.
    pub one_time_password: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(identity_id: Uuid, password_hash: String, one_time_password: bool) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            identity_id,
            password_hash,
            one_time_password,
            created_at: now,
            updated_at: now,
        }
    }
}
