use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A named collection of identities, optionally auto-created during
/// federated group reconciliation.
#[derive(Debug, Clone, FromRow)]
pub struct Group {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    /// Provider that auto-created this group, if any.
    pub created_by_provider: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(organization_id: Uuid, name: String, created_by_provider: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name,
            created_by_provider,
            created_at: Utc::now(),
        }
    }
}
