//! Configuration for the `fabryk-redis` CLI.
//!
//! Provides [`RedisCliConfig`], loaded from TOML files, environment
//! variables, and defaults using the `confyg` crate.
//!
//! # Loading Priority
//!
//! 1. Explicit `--config <path>` flag
//! 2. `FABRYK_REDIS_CONFIG` environment variable
//! 3. XDG default: `~/.config/fabryk-redis/config.toml`
//! 4. Built-in defaults
//!
//! `FABRYK_REDIS_*` variables (e.g. `FABRYK_REDIS_URL`) override file values.

use std::path::PathBuf;

use confyg::{Confygery, env};
use fabryk_redis::{Error, RedisStoreConfig, Result};
use serde::{Deserialize, Serialize};

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "FABRYK_REDIS_CONFIG";

// ============================================================================
// Configuration structs
// ============================================================================

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCliConfig {
    /// Store and connection settings.
    pub redis: RedisStoreConfig,
}

// ============================================================================
// Config loading
// ============================================================================

impl RedisCliConfig {
    /// Load configuration from file, environment, and defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder =
            Confygery::new().map_err(|e| Error::config(format!("config init: {e}")))?;

        if let Some(path) = Self::resolve_config_path(config_path)
            && path.exists()
        {
            log::debug!("Loading config from {}", path.display());
            builder
                .add_file(&path.to_string_lossy())
                .map_err(|e| Error::config(format!("config file: {e}")))?;
        }

        let mut env_opts = env::Options::with_top_level("FABRYK");
        env_opts.add_section("redis");
        builder
            .add_env(env_opts)
            .map_err(|e| Error::config(format!("config env: {e}")))?;

        let config: Self = builder
            .build()
            .map_err(|e| Error::config(format!("config build: {e}")))?;

        Ok(config)
    }

    /// Resolve the config file path from explicit flag, env var, or XDG default.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(PathBuf::from(path));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }

        Self::default_config_path()
    }

    /// Return the XDG default config path.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("fabryk-redis").join("config.toml"))
    }

    /// Serialize this config to a pretty-printed TOML string.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let path = RedisCliConfig::resolve_config_path(Some("/tmp/explicit.toml"));
        assert_eq!(path, Some(PathBuf::from("/tmp/explicit.toml")));
    }

    #[test]
    fn test_default_path_shape() {
        if let Some(path) = RedisCliConfig::default_config_path() {
            assert!(path.ends_with("fabryk-redis/config.toml"));
        }
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RedisCliConfig {
            redis: RedisStoreConfig::new("users").with_url("redis://cache:6380"),
        };
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[redis]"));
        assert!(text.contains("index_name = \"users\""));

        let parsed: RedisCliConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[redis]\nindex_name = \"cities\"\ndefault_k = 7\n",
        )
        .unwrap();

        let config = RedisCliConfig::load(Some(&path.to_string_lossy())).unwrap();
        assert_eq!(config.redis.index_name, "cities");
        assert_eq!(config.redis.default_k, 7);
        assert_eq!(config.redis.content_key, "content");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = RedisCliConfig::load(Some(&path.to_string_lossy())).unwrap();
        assert_eq!(config.redis.url, "redis://localhost:6379");
    }
}
