use crate::error::AppError;
use config::{Config as Cfg, File};
use serde::Deserialize;
use std::env;

/// Shared server configuration common to every console service.
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8085
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let config = Cfg::builder()
            .add_source(File::with_name("configuration").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

/// Read an environment variable with an optional development default.
///
/// In production every variable without a value is a hard startup error so
/// that misconfiguration never silently falls back to a default.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_env_prefers_set_value() {
        env::set_var("SERVICE_CORE_TEST_VAR", "set");
        let val = get_env("SERVICE_CORE_TEST_VAR", Some("default"), false).unwrap();
        assert_eq!(val, "set");
        env::remove_var("SERVICE_CORE_TEST_VAR");
    }

    #[test]
    fn get_env_falls_back_to_default_in_dev() {
        env::remove_var("SERVICE_CORE_TEST_MISSING");
        let val = get_env("SERVICE_CORE_TEST_MISSING", Some("default"), false).unwrap();
        assert_eq!(val, "default");
    }

    #[test]
    fn get_env_rejects_missing_value_in_prod() {
        env::remove_var("SERVICE_CORE_TEST_MISSING_PROD");
        let result = get_env("SERVICE_CORE_TEST_MISSING_PROD", Some("default"), true);
        assert!(result.is_err());
    }
}
