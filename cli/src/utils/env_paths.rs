use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Environment-based path configuration
#[derive(Debug, Clone)]
pub struct EnvPaths {
    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
    pub data_path: PathBuf,
    pub configuration_path: PathBuf,
}

impl EnvPaths {
    /// Load paths from environment variables with defaults
    pub fn load() -> Result<Self> {
        Self::load_with_base(None)
    }

    /// Load paths from environment variables with an optional base directory
    pub fn load_with_base(base_dir: Option<PathBuf>) -> Result<Self> {
        let base = match base_dir {
            Some(base) => base,
            None => {
                let cwd = env::current_dir().context("Failed to get current directory")?;
                let env_file = cwd.join(".env");
                if env_file.exists() {
                    dotenv::from_path(&env_file).ok();
                }
                cwd
            }
        };

        Ok(Self {
            data_path: Self::get_path_from_env("DATA_PATH", "./data", &base),
            configuration_path: Self::get_path_from_env("CONFIGURATION_PATH", "./config", &base),
            base_dir: base,
        })
    }

    fn get_path_from_env(var_name: &str, default: &str, base_dir: &Path) -> PathBuf {
        let path_str = env::var(var_name).unwrap_or_else(|_| default.to_string());
        Self::resolve_against(base_dir, PathBuf::from(path_str))
    }

    fn resolve_against(base_dir: &Path, path: PathBuf) -> PathBuf {
        if path.is_relative() {
            base_dir.join(path)
        } else {
            path
        }
    }

    /// Make a configured path absolute relative to the base directory
    pub fn resolve(&self, path: impl Into<PathBuf>) -> PathBuf {
        Self::resolve_against(&self.base_dir, path.into())
    }

    /// Default database file when none is configured
    pub fn database_path(&self) -> PathBuf {
        self.data_path.join("steward.db")
    }

    pub fn logs_path(&self) -> PathBuf {
        self.data_path.join("logs")
    }

    pub fn config_file(&self) -> PathBuf {
        self.configuration_path.join("steward.yaml")
    }
}
