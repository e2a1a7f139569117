//! Runtime configuration read from `SHELF_*` environment variables.
//!
//! A `.env` file in the working directory is honoured through `dotenvy`.
//! Unset variables fall back to the defaults below.

use crate::cover::{DEFAULT_ALLOWED_PREFIXES, DEFAULT_DOWNLOAD_TIMEOUT};
use std::{path::PathBuf, time::Duration};
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./db/shelf.db";
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads/covers";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// sqlx connection URL of the SQLite database.
    pub database_url: String,
    /// Managed root all cover files are stored in.
    pub upload_dir: PathBuf,
    /// Address the web binary listens on.
    pub bind_addr: String,
    /// Upper bound for one remote cover download.
    pub download_timeout: Duration,
    /// URL prefixes remote covers may be downloaded from.
    pub cover_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            download_timeout: DEFAULT_DOWNLOAD_TIMEOUT,
            cover_prefixes: DEFAULT_ALLOWED_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is not an error.
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(url) = lookup("SHELF_DATABASE_URL") {
            config.database_url = url;
        }

        if let Some(dir) = lookup("SHELF_UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Some(addr) = lookup("SHELF_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(secs) = lookup("SHELF_DOWNLOAD_TIMEOUT_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::Invalid {
                    key: "SHELF_DOWNLOAD_TIMEOUT_SECS",
                    value: secs.clone(),
                })?;
            config.download_timeout = Duration::from_secs(secs);
        }

        if let Some(prefixes) = lookup("SHELF_COVER_PREFIXES") {
            config.cover_prefixes = prefixes
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::{Config, ConfigError};
    use std::{collections::HashMap, path::PathBuf, time::Duration};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(Config::default(), config);
        assert_eq!(Duration::from_secs(10), config.download_timeout);
        assert_eq!(2, config.cover_prefixes.len());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SHELF_DATABASE_URL", "sqlite::memory:"),
            ("SHELF_UPLOAD_DIR", "/srv/covers"),
            ("SHELF_BIND_ADDR", "127.0.0.1:9000"),
            ("SHELF_DOWNLOAD_TIMEOUT_SECS", " 3 "),
            ("SHELF_COVER_PREFIXES", "http://127.0.0.1:8000/, ,https://img.example/"),
        ]))
        .unwrap();

        assert_eq!("sqlite::memory:", config.database_url);
        assert_eq!(PathBuf::from("/srv/covers"), config.upload_dir);
        assert_eq!("127.0.0.1:9000", config.bind_addr);
        assert_eq!(Duration::from_secs(3), config.download_timeout);
        assert_eq!(
            vec!["http://127.0.0.1:8000/", "https://img.example/"],
            config.cover_prefixes
        );
    }

    #[test]
    fn test_invalid_timeout() {
        let err = Config::from_lookup(lookup(&[("SHELF_DOWNLOAD_TIMEOUT_SECS", "soon")]))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "SHELF_DOWNLOAD_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
