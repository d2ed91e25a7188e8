use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Join of Identity x Provider recording the last-known external group-name
/// snapshot. Created on first federated login, refreshed on every subsequent
/// one.
#[derive(Debug, Clone, FromRow)]
pub struct ProviderUser {
    pub identity_id: Uuid,
    pub provider_id: Uuid,
    pub email: String,
    /// Comma-separated group-name snapshot from the provider's claims.
    pub groups: String,
    pub last_update: DateTime<Utc>,
}

impl ProviderUser {
    pub fn new(identity_id: Uuid, provider_id: Uuid, email: String) -> Self {
        Self {
            identity_id,
            provider_id,
            email,
            groups: String::new(),
            last_update: Utc::now(),
        }
    }

    /// Group names from the stored snapshot.
    pub fn group_names(&self) -> Vec<String> {
        if self.groups.is_empty() {
            return Vec::new();
        }
        self.groups.split(',').map(|s| s.to_string()).collect()
    }

    pub fn set_group_names(&mut self, names: &[String]) {
        self.groups = names.join(",");
        self.last_update = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_snapshot_roundtrip() {
        let mut pu = ProviderUser::new(Uuid::new_v4(), Uuid::new_v4(), "a@b.c".to_string());
        assert!(pu.group_names().is_empty());

        pu.set_group_names(&["devs".to_string(), "ops".to_string()]);
        assert_eq!(pu.group_names(), vec!["devs", "ops"]);

        pu.set_group_names(&[]);
        assert!(pu.group_names().is_empty());
    }
}
