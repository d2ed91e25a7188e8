use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Provider kind codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// The built-in provider backing password and access-key logins.
    /// Exactly one row carries this kind and it can never be mutated.
    Internal,
    Oidc,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Internal => "internal",
            ProviderKind::Oidc => "oidc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(ProviderKind::Internal),
            "oidc" => Some(ProviderKind::Oidc),
            _ => None,
        }
    }
}

/// An identity source configuration.
#[derive(Debug, Clone, FromRow)]
pub struct Provider {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub kind: String,
    /// Issuer URL for OIDC providers; empty for the built-in provider.
    pub url: String,
    pub client_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(organization_id: Uuid, name: String, kind: ProviderKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name,
            kind: kind.as_str().to_string(),
            url: String::new(),
            client_id: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind == ProviderKind::Internal.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_roundtrip() {
        assert_eq!(ProviderKind::parse("internal"), Some(ProviderKind::Internal));
        assert_eq!(ProviderKind::parse("oidc"), Some(ProviderKind::Oidc));
        assert_eq!(ProviderKind::parse("saml"), None);
    }

    #[test]
    fn test_internal_flag() {
        let org = Uuid::new_v4();
        let p = Provider::new(org, "keygate".to_string(), ProviderKind::Internal);
        assert!(p.is_internal());
        let q = Provider::new(org, "okta".to_string(), ProviderKind::Oidc);
        assert!(!q.is_internal());
    }
}
