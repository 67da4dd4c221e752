// crates/record-store-server/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: Environment-driven configuration for the record store server.
// Purpose: Resolve bind address, backend selection, and request limits.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Configuration comes from the environment: a bind address, a request body
//! limit, and the backend selection. Presence of the relational database path
//! selects the `SQLite` backend; otherwise the server runs on the single-file
//! backend. Validation fails closed: a malformed value is an error, never a
//! silent fallback to a default.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable naming the listen address.
pub const ENV_BIND: &str = "RECORD_STORE_BIND";
/// Environment variable naming the single-file backend path.
pub const ENV_FILE_PATH: &str = "RECORD_STORE_FILE_PATH";
/// Environment variable naming the `SQLite` database path. Presence selects
/// the relational backend.
pub const ENV_SQLITE_PATH: &str = "RECORD_STORE_SQLITE_PATH";
/// Environment variable naming the request body size limit in bytes.
pub const ENV_MAX_BODY_BYTES: &str = "RECORD_STORE_MAX_BODY_BYTES";

/// Default listen address (loopback only).
const DEFAULT_BIND: &str = "127.0.0.1:3001";
/// Default single-file backend path.
const DEFAULT_FILE_PATH: &str = "record-store.json";
/// Default request body size limit.
const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Storage backend selected at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSelection {
    /// Single-file backend at the given path.
    File(PathBuf),
    /// `SQLite` backend at the given database path.
    Sqlite(PathBuf),
}

/// Record store server configuration.
///
/// # Invariants
/// - `max_body_bytes` is greater than zero.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address the server listens on.
    pub bind: SocketAddr,
    /// Storage backend selection.
    pub backend: BackendSelection,
    /// Maximum allowed request body size.
    pub max_body_bytes: usize,
}

impl ServerConfig {
    /// Loads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_raw = lookup(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_raw
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{ENV_BIND} is not a socket address")))?;

        let backend = match lookup(ENV_SQLITE_PATH) {
            Some(path) if !path.trim().is_empty() => BackendSelection::Sqlite(PathBuf::from(path)),
            Some(_) => {
                return Err(ConfigError::Invalid(format!("{ENV_SQLITE_PATH} must not be empty")));
            }
            None => {
                let path =
                    lookup(ENV_FILE_PATH).unwrap_or_else(|| DEFAULT_FILE_PATH.to_string());
                if path.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "{ENV_FILE_PATH} must not be empty"
                    )));
                }
                BackendSelection::File(PathBuf::from(path))
            }
        };

        let max_body_bytes = match lookup(ENV_MAX_BODY_BYTES) {
            Some(raw) => raw.parse::<usize>().map_err(|_| {
                ConfigError::Invalid(format!("{ENV_MAX_BODY_BYTES} is not a byte count"))
            })?,
            None => DEFAULT_MAX_BODY_BYTES,
        };
        if max_body_bytes == 0 {
            return Err(ConfigError::Invalid(format!(
                "{ENV_MAX_BODY_BYTES} must be greater than zero"
            )));
        }

        Ok(Self {
            bind,
            backend,
            max_body_bytes,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use std::collections::BTreeMap;

    use super::BackendSelection;
    use super::ENV_BIND;
    use super::ENV_MAX_BODY_BYTES;
    use super::ENV_SQLITE_PATH;
    use super::ServerConfig;

    fn lookup<'a>(vars: &'a BTreeMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| vars.get(name).map(|value| (*value).to_string())
    }

    #[test]
    fn defaults_select_loopback_and_file_backend() {
        let vars = BTreeMap::new();
        let config = ServerConfig::from_lookup(lookup(&vars)).unwrap();
        assert!(config.bind.ip().is_loopback());
        assert_eq!(config.bind.port(), 3001);
        assert!(matches!(config.backend, BackendSelection::File(_)));
        assert_eq!(config.max_body_bytes, 2 * 1024 * 1024);
    }

    #[test]
    fn sqlite_path_presence_selects_relational_backend() {
        let mut vars = BTreeMap::new();
        vars.insert(ENV_SQLITE_PATH, "records.db");
        let config = ServerConfig::from_lookup(lookup(&vars)).unwrap();
        assert!(matches!(config.backend, BackendSelection::Sqlite(_)));
    }

    #[test]
    fn malformed_values_fail_closed() {
        let mut vars = BTreeMap::new();
        vars.insert(ENV_BIND, "not-an-address");
        assert!(ServerConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = BTreeMap::new();
        vars.insert(ENV_MAX_BODY_BYTES, "0");
        assert!(ServerConfig::from_lookup(lookup(&vars)).is_err());

        let mut vars = BTreeMap::new();
        vars.insert(ENV_SQLITE_PATH, "  ");
        assert!(ServerConfig::from_lookup(lookup(&vars)).is_err());
    }
}
