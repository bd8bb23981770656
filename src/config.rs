//! Configuration loading.
//!
//! ```toml
//! [compiler]
//! placeholder = "dollar"
//!
//! [database]
//! url = "postgres://localhost/app"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::transpiler::PlaceholderStyle;

/// File looked up in the working directory by [`Config::discover`].
pub const LOCAL_CONFIG_FILE: &str = "lambdaql.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub compiler: CompilerConfig,
    pub database: Option<DatabaseConfig>,
}

/// Settings that change the emitted SQL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub placeholder: PlaceholderStyle,
}

impl CompilerConfig {
    pub fn with_placeholder(placeholder: PlaceholderStyle) -> Self {
        Self { placeholder }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Config {
    /// Parse configuration from TOML text.
    pub fn from_toml_str(text: &str) -> QueryResult<Self> {
        toml::from_str(text).map_err(|e| QueryError::Config(e.to_string()))
    }

    /// Load configuration from a file.
    pub fn load(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| QueryError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Self::from_toml_str(&text)
    }

    /// Load the first config found in the search path, or the defaults.
    pub fn discover() -> QueryResult<Self> {
        match Self::search_path().into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// `./lambdaql.toml`, then `<config dir>/lambdaql/config.toml`.
    pub fn search_path() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("lambdaql").join("config.toml"));
        }
        paths
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database.as_ref().map(|db| db.url.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.compiler.placeholder, PlaceholderStyle::Question);
        assert!(config.database_url().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [compiler]
            placeholder = "dollar"

            [database]
            url = "postgres://localhost/app"
            "#,
        )
        .unwrap();
        assert_eq!(config.compiler.placeholder, PlaceholderStyle::Dollar);
        assert_eq!(config.database_url(), Some("postgres://localhost/app"));
    }

    #[test]
    fn test_unknown_placeholder_is_config_error() {
        let err = Config::from_toml_str("[compiler]\nplaceholder = \"colon\"").unwrap_err();
        assert!(matches!(err, QueryError::Config(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load("/nonexistent/lambdaql.toml").unwrap_err();
        assert!(matches!(err, QueryError::Config(msg) if msg.contains("/nonexistent/lambdaql.toml")));
    }

    #[test]
    fn test_search_path_starts_local() {
        assert_eq!(Config::search_path()[0], PathBuf::from(LOCAL_CONFIG_FILE));
    }
}
