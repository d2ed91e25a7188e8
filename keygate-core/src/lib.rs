//! Shared plumbing for keygate services.
//!
//! Provides the HTTP boundary error type, environment-driven configuration
//! helpers, tracing initialization, and rate limiting middleware.

pub mod config;
pub mod error;
pub mod middleware;
pub mod observability;

pub use error::AppError;
