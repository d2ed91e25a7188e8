use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Tenant isolation boundary owning providers, identities, and grants.
#[derive(Debug, Clone, FromRow)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// Domain the session cookie is scoped to.
    pub domain: String,
    pub created_at: DateTime<Utc>,
}

impl Organization {
    pub fn new(name: String, domain: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            domain,
            created_at: Utc::now(),
        }
    }
}
