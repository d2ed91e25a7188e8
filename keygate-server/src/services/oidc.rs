//! External identity-provider client: authorization-code-for-claims exchange.
//!
//! The trait is the seam between the authentication engine and the wire-level
//! OIDC implementation. Transport failures (connect, timeout, cancellation)
//! surface as `UpstreamUnavailable`; a definitive rejection of the code by the
//! provider is a credential failure.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;

use crate::models::Provider;
use crate::services::ServiceError;

/// Claims extracted from a successful code exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct IdpClaims {
    /// Stable subject identifier at the provider.
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub groups: Vec<String>,
}

#[async_trait]
pub trait OidcClient: Send + Sync {
    /// Exchange an authorization code for the provider's claims.
    async fn exchange_code(
        &self,
        provider: &Provider,
        redirect_url: &str,
        code: &str,
    ) -> Result<IdpClaims, ServiceError>;
}

/// Token endpoint response; only the ID token is consumed.
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    id_token: Option<String>,
}

/// OIDC client backed by reqwest.
///
/// The request timeout doubles as the cancellation bound required of the
/// exchange: a hung upstream fails with `UpstreamUnavailable` instead of
/// stalling the login transaction, and dropping the future aborts the call.
pub struct HttpOidcClient {
    http: reqwest::Client,
}

impl HttpOidcClient {
    pub fn new(timeout: Duration) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build OIDC http client: {}", e))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl OidcClient for HttpOidcClient {
    async fn exchange_code(
        &self,
        provider: &Provider,
        redirect_url: &str,
        code: &str,
    ) -> Result<IdpClaims, ServiceError> {
        let token_url = format!("{}/token", provider.url.trim_end_matches('/'));

        let response = self
            .http
            .post(&token_url)
            .form(&[
                ("code", code),
                ("client_id", provider.client_id.as_str()),
                ("redirect_uri", redirect_url),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                ServiceError::UpstreamUnavailable(anyhow::anyhow!(
                    "code exchange with {} failed: {}",
                    provider.name,
                    e
                ))
            })?;

        let status = response.status();
        if status.is_server_error() {
            return Err(ServiceError::UpstreamUnavailable(anyhow::anyhow!(
                "provider {} returned {}",
                provider.name,
                status
            )));
        }
        if !status.is_success() {
            // the provider definitively rejected the code
            tracing::warn!(provider = %provider.name, status = %status, "authorization code rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let tokens: TokenEndpointResponse = response.json().await.map_err(|e| {
            ServiceError::UpstreamUnavailable(anyhow::anyhow!(
                "failed to parse token response from {}: {}",
                provider.name,
                e
            ))
        })?;

        let id_token = tokens
            .id_token
            .ok_or_else(|| ServiceError::BadRequest("no ID token in provider response".to_string()))?;

        decode_id_token_claims(&id_token)
    }
}

/// Decode the claims segment of an ID token.
///
/// Signature verification against the provider's JWKS is the wire-level OIDC
/// layer's concern; this core consumes the claims the exchange produced over
/// the provider's TLS channel.
fn decode_id_token_claims(id_token: &str) -> Result<IdpClaims, ServiceError> {
    let mut parts = id_token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err(ServiceError::BadRequest("invalid ID token format".to_string())),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| ServiceError::BadRequest("failed to decode ID token payload".to_string()))?;

    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::BadRequest(format!("failed to parse ID token claims: {}", e)))
}

/// Deterministic client for tests: returns the configured claims, or
/// `UpstreamUnavailable` when none are set.
pub struct StaticOidcClient {
    pub claims: Option<IdpClaims>,
}

impl StaticOidcClient {
    pub fn with_claims(claims: IdpClaims) -> Self {
        Self {
            claims: Some(claims),
        }
    }

    pub fn unavailable() -> Self {
        Self { claims: None }
    }
}

#[async_trait]
impl OidcClient for StaticOidcClient {
    async fn exchange_code(
        &self,
        _provider: &Provider,
        _redirect_url: &str,
        _code: &str,
    ) -> Result<IdpClaims, ServiceError> {
        match &self.claims {
            Some(claims) => Ok(claims.clone()),
            None => Err(ServiceError::UpstreamUnavailable(anyhow::anyhow!(
                "identity provider unreachable"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_segment(value: &serde_json::Value) -> String {
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_decode_id_token_claims() {
        let header = encode_segment(&serde_json::json!({"alg": "RS256"}));
        let payload = encode_segment(&serde_json::json!({
            "sub": "abc123",
            "email": "gohan@example.com",
            "groups": ["devs", "ops"],
        }));
        let token = format!("{}.{}.sig", header, payload);

        let claims = decode_id_token_claims(&token).unwrap();
        assert_eq!(claims.sub, "abc123");
        assert_eq!(claims.email, "gohan@example.com");
        assert_eq!(claims.groups, vec!["devs", "ops"]);
    }

    #[test]
    fn test_decode_id_token_missing_groups_defaults_empty() {
        let header = encode_segment(&serde_json::json!({"alg": "RS256"}));
        let payload = encode_segment(&serde_json::json!({
            "sub": "abc123",
            "email": "gohan@example.com",
        }));
        let token = format!("{}.{}.sig", header, payload);

        let claims = decode_id_token_claims(&token).unwrap();
        assert!(claims.groups.is_empty());
    }

    #[test]
    fn test_decode_id_token_rejects_malformed() {
        assert!(matches!(
            decode_id_token_claims("not-a-jwt"),
            Err(ServiceError::BadRequest(_))
        ));
        assert!(matches!(
            decode_id_token_claims("a.b.c.d"),
            Err(ServiceError::BadRequest(_))
        ));
    }
}
