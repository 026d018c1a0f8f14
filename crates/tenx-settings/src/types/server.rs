//! HTTP server settings.

use serde::{Deserialize, Serialize};

/// Deployment environment. Error details are hidden in production.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development.
    #[default]
    Development,
    /// Test runs.
    Test,
    /// Production deployment.
    Production,
}

impl Environment {
    /// Whether this is a production deployment.
    pub fn is_production(self) -> bool {
        self == Self::Production
    }
}

/// Server network and storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// HTTP port.
    pub port: u16,
    /// Database file (relative to `~/.tenx` unless absolute).
    pub database_path: String,
    /// Connection pool size.
    pub pool_size: u32,
    /// Deployment environment.
    pub environment: Environment,
    /// Maximum request body size in bytes.
    pub body_limit_bytes: usize,
    /// Allowed CORS origins. Empty allows any origin.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_path: "tenx.db".to_string(),
            pool_size: 16,
            environment: Environment::Development,
            body_limit_bytes: 2 * 1024 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.port, 3000);
        assert_eq!(s.environment, Environment::Development);
        assert!(!s.environment.is_production());
    }

    #[test]
    fn environment_parses_lowercase() {
        let e: Environment = serde_json::from_str("\"production\"").unwrap();
        assert!(e.is_production());
    }
}
