//! Configuration module
//!
//! Environment-driven configuration for the storage backend. The engine
//! itself carries no process-wide state; callers construct services with
//! whatever store the configuration yields.

use serde::Deserialize;

use crate::error::OrgError;

const DEFAULT_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Database connection configuration, read from the environment:
/// `DATABASE_URL`, `DB_MAX_CONNECTIONS`, `DB_TIMEOUT_SECONDS`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_timeout_seconds")]
    pub db_timeout_seconds: u64,
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl DatabaseConfig {
    /// Load from process environment, reading a `.env` file first when
    /// present.
    pub fn from_env() -> Result<Self, OrgError> {
        dotenvy::dotenv().ok();
        envy::from_env::<DatabaseConfig>()
            .map_err(|e| OrgError::InvalidInput(format!("Invalid database configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let cfg: DatabaseConfig =
            envy::from_iter([("DATABASE_URL".to_string(), "postgres://localhost/org".to_string())])
                .unwrap();
        assert_eq!(cfg.db_max_connections, DEFAULT_MAX_CONNECTIONS);
        assert_eq!(cfg.db_timeout_seconds, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_missing_url_fails() {
        let result =
            envy::from_iter::<_, DatabaseConfig>(std::iter::empty::<(String, String)>());
        assert!(result.is_err());
    }
}
