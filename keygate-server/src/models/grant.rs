use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// The built-in resource governing platform administration.
pub const RESOURCE_KEYGATE: &str = "keygate";

/// Roles a grant may bind a subject to on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Superuser role governing provider and organization administration.
    Admin,
    View,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::View => "view",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "view" => Some(Role::View),
            _ => None,
        }
    }
}

/// Authorization binding of subject -> resource -> role.
#[derive(Debug, Clone, FromRow)]
pub struct Grant {
    pub id: Uuid,
    pub organization_id: Uuid,
    /// Identity the grant applies to.
    pub subject: Uuid,
    pub resource: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl Grant {
    pub fn new(organization_id: Uuid, subject: Uuid, resource: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id,
            subject,
            resource,
            role: role.as_str().to_string(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("view"), Some(Role::View));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
