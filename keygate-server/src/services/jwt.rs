//! Server signing keypair.
//!
//! Signs short-lived identity assertions that downstream services verify
//! against the public key published at the discovery endpoint. Only the
//! public half is ever serialized; the JWKS document carries no
//! authentication-core state.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rsa::{pkcs8::DecodePublicKey, traits::PublicKeyParts, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use uuid::Uuid;

use crate::config::JwtConfig;

/// Claims of a signed identity assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityTokenClaims {
    /// Subject (identity ID)
    pub sub: String,
    /// Identity display name
    pub name: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// JWT ID
    pub jti: String,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    public_key_pem: String,
    token_expiry_minutes: i64,
}

impl JwtService {
    /// Create the service by loading RSA keys from the configured files.
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let private_key_pem = fs::read_to_string(&config.private_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read private key from {}: {}",
                config.private_key_path,
                e
            )
        })?;

        let encoding_key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse private key: {}", e))?;

        let public_key_pem = fs::read_to_string(&config.public_key_path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read public key from {}: {}",
                config.public_key_path,
                e
            )
        })?;

        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes())
            .map_err(|e| anyhow::anyhow!("Failed to parse public key: {}", e))?;

        tracing::info!("JWT service initialized with RS256 keys");

        Ok(Self {
            encoding_key,
            decoding_key,
            public_key_pem,
            token_expiry_minutes: config.token_expiry_minutes,
        })
    }

    /// Sign an identity assertion for the given principal.
    pub fn generate_identity_token(
        &self,
        identity_id: &str,
        name: &str,
    ) -> Result<(String, i64), anyhow::Error> {
        let now = Utc::now();
        let exp = now + Duration::minutes(self.token_expiry_minutes);

        let claims = IdentityTokenClaims {
            sub: identity_id.to_string(),
            name: name.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let header = Header::new(Algorithm::RS256);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode identity token: {}", e))?;

        Ok((token, exp.timestamp()))
    }

    /// Validate and decode an identity assertion.
    pub fn validate_identity_token(
        &self,
        token: &str,
    ) -> Result<IdentityTokenClaims, anyhow::Error> {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_exp = true;
        validation.required_spec_claims.clear();

        let token_data = decode::<IdentityTokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| anyhow::anyhow!("Invalid identity token: {}", e))?;

        Ok(token_data.claims)
    }

    /// JWKS document for the public verification key. No secrets, no
    /// authentication-core state.
    pub fn jwks(&self) -> Result<serde_json::Value, anyhow::Error> {
        let public_key = RsaPublicKey::from_public_key_pem(&self.public_key_pem)
            .map_err(|e| anyhow::anyhow!("Failed to parse public key for JWKS: {}", e))?;

        let n = public_key.n().to_bytes_be();
        let e = public_key.e().to_bytes_be();

        let mut hasher = Sha256::new();
        hasher.update(&n);
        let kid = hex::encode(&hasher.finalize()[..8]);

        Ok(serde_json::json!({
            "keys": [{
                "kty": "RSA",
                "use": "sig",
                "alg": "RS256",
                "kid": kid,
                "n": URL_SAFE_NO_PAD.encode(n),
                "e": URL_SAFE_NO_PAD.encode(e),
            }]
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_keys;

    fn test_service() -> (JwtService, tempfile::NamedTempFile, tempfile::NamedTempFile) {
        let (private_file, public_file) = test_keys::write_test_keys();
        let config = JwtConfig {
            private_key_path: private_file.path().to_str().unwrap().to_string(),
            public_key_path: public_file.path().to_str().unwrap().to_string(),
            token_expiry_minutes: 15,
        };
        let service = JwtService::new(&config).expect("Failed to create JWT service");
        (service, private_file, public_file)
    }

    #[test]
    fn test_identity_token_roundtrip() {
        let (service, _priv, _pub) = test_service();

        let (token, exp) = service
            .generate_identity_token("identity_123", "gohan@example.com")
            .unwrap();
        assert!(!token.is_empty());
        assert!(exp > Utc::now().timestamp());

        let claims = service.validate_identity_token(&token).unwrap();
        assert_eq!(claims.sub, "identity_123");
        assert_eq!(claims.name, "gohan@example.com");
    }

    #[test]
    fn test_tampered_token_rejected() {
        let (service, _priv, _pub) = test_service();

        let (token, _) = service
            .generate_identity_token("identity_123", "gohan@example.com")
            .unwrap();
        let mut tampered = token.clone();
        tampered.truncate(token.len() - 2);

        assert!(service.validate_identity_token(&tampered).is_err());
    }

    #[test]
    fn test_jwks_shape() {
        let (service, _priv, _pub) = test_service();

        let jwks = service.jwks().unwrap();
        let keys = jwks["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["kty"], "RSA");
        assert_eq!(keys[0]["use"], "sig");
        assert!(keys[0]["n"].as_str().is_some());
        assert!(keys[0]["e"].as_str().is_some());
        // only the public half: no private exponent fields
        assert!(keys[0].get("d").is_none());
        assert!(keys[0].get("p").is_none());
    }
}
