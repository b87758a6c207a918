//! `rqb.toml` configuration.
//!
//! ```toml
//! [datasource]
//! url = "sqlite://metrics.db"
//! timeout = "30s"
//! max_connections = 5
//!
//! [query]
//! time_columns = ["time", "ts"]
//! format = "time_series"
//! escape_literals = false
//! ```
//!
//! Lookup order: an explicit path, `./rqb.toml`, then
//! `<config dir>/rqb/config.toml`. With no file the defaults apply.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ast::QueryFormat;
use crate::error::{Error, Result};
use crate::macros::parse_interval;
use crate::transpiler::LiteralMode;

const FILE_NAME: &str = "rqb.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub datasource: DatasourceConfig,
    pub query: QueryConfig,
}

/// Where and how to connect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasourceConfig {
    /// `sqlite://path.db`, `sqlite::memory:`, `postgres://...`
    pub url: Option<String>,
    /// Connection acquire timeout, e.g. `30s` or `1m`.
    pub timeout: Option<String>,
    pub max_connections: u32,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: None,
            max_connections: 5,
        }
    }
}

impl DatasourceConfig {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// The configured timeout, if it parses to a positive number of seconds.
    pub fn timeout(&self) -> Option<Duration> {
        let seconds = parse_interval(self.timeout.as_deref()?, 0);
        (seconds > 0).then(|| Duration::from_secs(seconds as u64))
    }
}

/// Defaults applied to queries built on the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub time_columns: Vec<String>,
    pub format: QueryFormat,
    /// Double single quotes inside quoted values.
    pub escape_literals: bool,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            time_columns: vec!["time".to_string()],
            format: QueryFormat::Table,
            escape_literals: false,
        }
    }
}

impl QueryConfig {
    pub fn literal_mode(&self) -> LiteralMode {
        if self.escape_literals {
            LiteralMode::Escaped
        } else {
            LiteralMode::Verbatim
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. The default locations are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        for path in Self::search_paths() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading config");
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Candidate config files, most specific first.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(FILE_NAME)];

        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("rqb").join("config.toml"));
        }

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.datasource.max_connections, 5);
        assert_eq!(config.query.time_columns, vec!["time".to_string()]);
        assert_eq!(config.query.literal_mode(), LiteralMode::Verbatim);
    }

    #[test]
    fn test_full_file() {
        let config = Config::from_toml(
            r#"
            [datasource]
            url = "sqlite::memory:"
            timeout = "1m"
            max_connections = 1

            [query]
            time_columns = ["ts"]
            format = "time_series"
            escape_literals = true
            "#,
        )
        .unwrap();

        assert_eq!(config.datasource.url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(config.datasource.timeout(), Some(Duration::from_secs(60)));
        assert_eq!(config.datasource.max_connections, 1);
        assert_eq!(config.query.time_columns, vec!["ts".to_string()]);
        assert_eq!(config.query.format, QueryFormat::TimeSeries);
        assert_eq!(config.query.literal_mode(), LiteralMode::Escaped);
    }

    #[test]
    fn test_timeout_variants() {
        let mut ds = DatasourceConfig::default();
        assert_eq!(ds.timeout(), None);

        ds.timeout = Some("45".to_string());
        assert_eq!(ds.timeout(), Some(Duration::from_secs(45)));

        ds.timeout = Some("never".to_string());
        assert_eq!(ds.timeout(), None);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_toml("[query]\nformat = \"graph\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/definitely/not/here/rqb.toml")));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
