//! Environment-driven configuration helpers shared by keygate services.

use crate::error::AppError;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

/// Read an environment variable with a dev-only default.
///
/// In production every value must be set explicitly; in dev the default is
/// used when the variable is absent.
pub fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

/// Parse an integer environment variable with a dev-only default.
pub fn get_env_parse<T>(key: &str, default: Option<&str>, is_prod: bool) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, default, is_prod)?.parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!(format!("invalid value for {}: {}", key, e)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_default_in_dev() {
        let val = get_env("KEYGATE_TEST_MISSING_VAR", Some("fallback"), false).unwrap();
        assert_eq!(val, "fallback");
    }

    #[test]
    fn test_get_env_required_in_prod() {
        let err = get_env("KEYGATE_TEST_MISSING_VAR", Some("fallback"), true);
        assert!(err.is_err());
    }

    #[test]
    fn test_get_env_parse() {
        let val: u16 = get_env_parse("KEYGATE_TEST_MISSING_PORT", Some("8080"), false).unwrap();
        assert_eq!(val, 8080);
    }

    #[test]
    fn test_environment_from_str() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("PROD".parse::<Environment>().unwrap(), Environment::Prod);
        assert!("staging".parse::<Environment>().is_err());
    }
}
