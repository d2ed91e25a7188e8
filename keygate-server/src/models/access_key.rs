use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Scope restricting a session to changing the caller's own password.
pub const SCOPE_PASSWORD_RESET: &str = "password-reset";

/// A bearer credential record backing a session or machine token.
///
/// Secret material is split: `key_id` is the public half presented in the
/// bearer, `secret_checksum` is the one-way derivation of the secret half.
/// The raw secret is returned to the caller once and never stored.
#[derive(Debug, Clone, FromRow)]
pub struct AccessKey {
    pub id: Uuid,
    pub name: String,
    pub issued_for: Uuid,
    pub provider_id: Uuid,
    /// Absolute expiry, fixed at issuance.
    pub expires_at: DateTime<Utc>,
    /// Renewable extension window, in seconds.
    pub extension_seconds: i64,
    /// Current deadline; slides forward by the extension window on use,
    /// never past `expires_at`.
    pub extension_deadline: DateTime<Utc>,
    /// Comma-separated scope list; empty means unrestricted.
    pub scopes: String,
    /// Public key ID, generated independently of the secret.
    pub key_id: String,
    /// SHA-256 of the secret half; the raw secret is never persisted.
    pub secret_checksum: String,
    pub created_at: DateTime<Utc>,
}

impl AccessKey {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    pub fn past_extension_deadline(&self, now: DateTime<Utc>) -> bool {
        now > self.extension_deadline
    }

    pub fn extension(&self) -> Duration {
        Duration::seconds(self.extension_seconds)
    }

    /// Slide the extension deadline forward by the stored extension window,
    /// capped at the absolute expiry.
    pub fn slide_extension(&mut self, now: DateTime<Utc>) {
        let next = now + self.extension();
        self.extension_deadline = next.min(self.expires_at);
    }

    pub fn scope_names(&self) -> Vec<&str> {
        if self.scopes.is_empty() {
            return Vec::new();
        }
        self.scopes.split(',').collect()
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope_names().contains(&scope)
    }

    pub fn add_scope(&mut self, scope: &str) {
        if self.has_scope(scope) {
            return;
        }
        if self.scopes.is_empty() {
            self.scopes = scope.to_string();
        } else {
            self.scopes = format!("{},{}", self.scopes, scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(expires_in: Duration, extension: Duration) -> AccessKey {
        let now = Utc::now();
        AccessKey {
            id: Uuid::new_v4(),
            name: String::new(),
            issued_for: Uuid::new_v4(),
            provider_id: Uuid::new_v4(),
            expires_at: now + expires_in,
            extension_seconds: extension.num_seconds(),
            extension_deadline: (now + extension).min(now + expires_in),
            scopes: String::new(),
            key_id: "0123456789".to_string(),
            secret_checksum: String::new(),
            created_at: now,
        }
    }

    #[test]
    fn test_expiry_checks() {
        let now = Utc::now();
        let k = key(Duration::minutes(10), Duration::minutes(1));
        assert!(!k.is_expired(now));
        assert!(!k.past_extension_deadline(now));
        assert!(k.past_extension_deadline(now + Duration::minutes(2)));
        assert!(k.is_expired(now + Duration::minutes(11)));
    }

    #[test]
    fn test_slide_capped_at_expiry() {
        let now = Utc::now();
        let mut k = key(Duration::minutes(10), Duration::minutes(3));

        k.slide_extension(now + Duration::minutes(2));
        assert_eq!(k.extension_deadline, now + Duration::minutes(5));

        // sliding near the end of life never passes the absolute expiry
        k.slide_extension(now + Duration::minutes(9));
        assert_eq!(k.extension_deadline, k.expires_at);

        k.slide_extension(now + Duration::minutes(30));
        assert_eq!(k.extension_deadline, k.expires_at);
    }

    #[test]
    fn test_scopes() {
        let mut k = key(Duration::minutes(10), Duration::minutes(1));
        assert!(!k.has_scope(SCOPE_PASSWORD_RESET));

        k.add_scope(SCOPE_PASSWORD_RESET);
        assert!(k.has_scope(SCOPE_PASSWORD_RESET));

        // adding twice keeps the list deduplicated
        k.add_scope(SCOPE_PASSWORD_RESET);
        assert_eq!(k.scope_names(), vec![SCOPE_PASSWORD_RESET]);

        k.add_scope("other");
        assert_eq!(k.scope_names(), vec![SCOPE_PASSWORD_RESET, "other"]);
    }
}
