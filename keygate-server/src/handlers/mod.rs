//! HTTP surface exercising the trust core.

pub mod access_keys;
pub mod auth;
pub mod cookies;
pub mod identities;
pub mod providers;
pub mod tokens;
pub mod well_known;
