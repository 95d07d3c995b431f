use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default request timeout applied by the HTTP timeout layer.
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub fcm_project_id: String,
    pub fcm_credentials_path: String,
    pub request_timeout_seconds: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing)
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| "0.0.0.0:8080".to_string());

        let fcm_project_id = vars
            .get("FCM_PROJECT_ID")
            .ok_or_else(|| ConfigError::MissingEnvVar("FCM_PROJECT_ID".to_string()))?
            .clone();

        let fcm_credentials_path = vars
            .get("GOOGLE_APPLICATION_CREDENTIALS")
            .ok_or_else(|| {
                ConfigError::MissingEnvVar("GOOGLE_APPLICATION_CREDENTIALS".to_string())
            })?
            .clone();

        let request_timeout_seconds = match vars.get("REQUEST_TIMEOUT_SECONDS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| {
                ConfigError::InvalidValue("REQUEST_TIMEOUT_SECONDS".to_string(), e.to_string())
            })?,
            None => DEFAULT_REQUEST_TIMEOUT_SECONDS,
        };

        Ok(Config {
            database_url,
            bind_address,
            fcm_project_id,
            fcm_credentials_path,
            request_timeout_seconds,
        })
    }
}
