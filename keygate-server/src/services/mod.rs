//! Business logic of the keygate trust core.

pub mod access;
pub mod access_keys;
pub mod authn;
pub mod error;
pub mod groups;
pub mod jwt;
pub mod oidc;

pub use access::RequestContext;
pub use error::ServiceError;
pub use jwt::{IdentityTokenClaims, JwtService};
pub use oidc::{HttpOidcClient, IdpClaims, OidcClient, StaticOidcClient};
