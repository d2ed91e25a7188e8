use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A principal (human or machine) known to the system.
///
/// Group membership lives in the `identities_groups` join table and is
/// reconciled by name-keyed set difference, never rebuilt wholesale.
#[derive(Debug, Clone, FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Display name; an email address for human principals.
    pub name: String,
    pub last_seen_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Identity {
    pub fn new(organization_id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name,
            last_seen_at: now,
            created_at: now,
        }
    }
}
