//! `steward.yaml` plus environment overrides.

use anyhow::{Context, Result};
use api::ApiConfig;
use ::assignments::ServiceConfig;
use database::DatabaseConfig;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;
use user::SessionConfig;

use crate::utils::env_paths::EnvPaths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StewardConfig {
    pub database: DatabaseSection,
    pub api: ApiConfig,
    pub service: ServiceSection,
    pub sessions: SessionConfig,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Defaults to `<DATA_PATH>/steward.db`
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub busy_timeout_secs: u64,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        let defaults = DatabaseConfig::default();
        Self {
            path: None,
            max_connections: defaults.max_connections,
            busy_timeout_secs: defaults.busy_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceSection {
    pub operation_timeout_ms: u64,
}

impl Default for ServiceSection {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl StewardConfig {
    /// Read `steward.yaml` if it exists, then apply environment overrides.
    pub fn load(paths: &EnvPaths) -> Result<Self> {
        let file = paths.config_file();
        let mut config = if file.exists() {
            debug!("Loading configuration from {:?}", file);
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("Invalid configuration in {}", file.display()))?
        } else {
            StewardConfig::default()
        };

        config.apply_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = Some(PathBuf::from(path));
        }
        if let Some(port) = lookup("API_PORT") {
            self.api.port = port
                .parse()
                .with_context(|| format!("API_PORT must be a port number, got {:?}", port))?;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(timeout) = lookup("OPERATION_TIMEOUT_MS") {
            self.service.operation_timeout_ms = timeout.parse().with_context(|| {
                format!("OPERATION_TIMEOUT_MS must be milliseconds, got {:?}", timeout)
            })?;
        }
        Ok(())
    }

    pub fn database_config(&self, paths: &EnvPaths) -> DatabaseConfig {
        let path = match &self.database.path {
            Some(path) => paths.resolve(path),
            None => paths.database_path(),
        };

        DatabaseConfig {
            busy_timeout_secs: self.database.busy_timeout_secs,
            ..DatabaseConfig::new_with_path(path)
                .with_max_connections(self.database.max_connections)
        }
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::default()
            .with_operation_timeout(Duration::from_millis(self.service.operation_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn paths() -> EnvPaths {
        EnvPaths {
            base_dir: PathBuf::from("/srv/steward"),
            data_path: PathBuf::from("/srv/steward/data"),
            configuration_path: PathBuf::from("/srv/steward/config"),
        }
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: StewardConfig = serde_yaml::from_str(
            r#"
api:
  port: 8080
service:
  operation_timeout_ms: 2500
"#,
        )
        .unwrap();

        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.host, "127.0.0.1");
        assert_eq!(config.service_config().operation_timeout, Duration::from_millis(2500));
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.sessions.ttl_hours, 24);
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DATABASE_PATH", "custom/steward.db"),
            ("API_PORT", "4000"),
            ("LOG_LEVEL", "debug"),
            ("OPERATION_TIMEOUT_MS", "50"),
        ]
        .into_iter()
        .collect();

        let mut config = StewardConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api.port, 4000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.service.operation_timeout_ms, 50);
        assert_eq!(
            config.database_config(&paths()).database_path,
            PathBuf::from("/srv/steward/custom/steward.db")
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let mut config = StewardConfig::default();
        let err = config
            .apply_overrides(|name| (name == "API_PORT").then(|| "http".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("API_PORT"));
    }

    #[test]
    fn test_default_database_under_data_path() {
        let config = StewardConfig::default();
        let db = config.database_config(&paths());
        assert_eq!(db.database_path, PathBuf::from("/srv/steward/data/steward.db"));
        assert_eq!(db.max_connections, 5);
        assert!(db.create_tables);
    }
}
