// crates/unzip-relay-config/src/config.rs
// ============================================================================
// Module: Unzip Relay Configuration
// Description: Configuration loading and validation for the relay service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, toml, unzip-relay-core
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path
//! limits. Missing or invalid configuration fails closed. The deployment
//! platform may inject a `PORT` environment variable; it overrides the port
//! of the configured bind address after the file is parsed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;
use unzip_relay_core::runtime::ExtractionLimits;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "unzip-relay.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "UNZIP_RELAY_CONFIG";
/// Environment variable whose value overrides the bind port.
pub(crate) const PORT_ENV_VAR: &str = "PORT";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 256 * 1024;
/// Maximum total config path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address for the push endpoint.
const DEFAULT_BIND: &str = "0.0.0.0:8080";
/// Default maximum request body size in bytes.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Maximum allowed request body size in bytes.
pub(crate) const MAX_BODY_BYTES_CEILING: usize = 16 * 1024 * 1024;
/// Default chunk size for decode reads and destination writes.
const DEFAULT_CHUNK_SIZE_BYTES: usize = 64 * 1024;
/// Minimum allowed chunk size in bytes.
pub(crate) const MIN_CHUNK_SIZE_BYTES: usize = 4 * 1024;
/// Maximum allowed chunk size in bytes.
pub(crate) const MAX_CHUNK_SIZE_BYTES: usize = 8 * 1024 * 1024;
/// Maximum length of a bucket name.
pub(crate) const MAX_BUCKET_NAME_LENGTH: usize = 63;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Unzip Relay service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    /// Push endpoint configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Source store configuration (archives are read from here).
    #[serde(default)]
    pub source: SourceStoreConfig,
    /// Destination store configuration (extracted objects land here).
    pub destination: DestinationStoreConfig,
    /// Extraction resource ceilings.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl RelayConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, the `UNZIP_RELAY_CONFIG`
    /// environment variable, then `unzip-relay.toml` in the working
    /// directory. A `PORT` environment variable overrides the bind port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let mut config = Self::from_toml(content)?;
        if let Ok(port) = env::var(PORT_ENV_VAR) {
            config.apply_port_override(&port)?;
        }
        Ok(config)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.source.validate()?;
        self.destination.validate()?;
        self.limits.validate()?;
        Ok(())
    }

    /// Replaces the port of the bind address with an injected value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the injected port is not a valid port
    /// number.
    pub fn apply_port_override(&mut self, port: &str) -> Result<(), ConfigError> {
        let port: u16 = port
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("injected port is not valid: {port}")))?;
        let mut addr = self.server.bind_addr()?;
        addr.set_port(port);
        self.server.bind = addr.to_string();
        Ok(())
    }
}

/// Push endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the push endpoint.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Validates the server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_CEILING {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes exceeds ceiling ({MAX_BODY_BYTES_CEILING})"
            )));
        }
        Ok(())
    }

    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the bind address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("bind address is not valid: {}", self.bind)))
    }
}

/// Store backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreProvider {
    /// S3-compatible object store.
    #[default]
    S3,
    /// In-memory store for tests and local demos.
    Memory,
}

/// Source store configuration.
///
/// The source bucket is named by each notification, so only connection
/// settings live here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourceStoreConfig {
    /// Store backend.
    #[serde(default)]
    pub provider: StoreProvider,
    /// Region for S3-compatible backends.
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override for S3-compatible backends.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Use path-style addressing (required by some S3-compatible stores).
    #[serde(default)]
    pub force_path_style: bool,
}

impl SourceStoreConfig {
    /// Validates the source store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_endpoint("source", self.endpoint.as_deref())
    }
}

/// Destination store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DestinationStoreConfig {
    /// Store backend.
    #[serde(default)]
    pub provider: StoreProvider,
    /// Bucket receiving extracted objects.
    pub bucket: String,
    /// Region for S3-compatible backends.
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override for S3-compatible backends.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Use path-style addressing (required by some S3-compatible stores).
    #[serde(default)]
    pub force_path_style: bool,
}

impl DestinationStoreConfig {
    /// Validates the destination store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let bucket = self.bucket.trim();
        if bucket.is_empty() {
            return Err(ConfigError::Invalid("destination bucket must be set".to_string()));
        }
        if bucket.len() > MAX_BUCKET_NAME_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "destination bucket name exceeds {MAX_BUCKET_NAME_LENGTH} characters"
            )));
        }
        validate_endpoint("destination", self.endpoint.as_deref())
    }
}

/// Extraction resource ceilings.
///
/// Entry counts and sizes inside an archive are attacker-influenced;
/// ceilings left unset are unlimited, matching the behavior of a relay that
/// trusts its notification sources.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Chunk size for decode reads and destination writes.
    #[serde(default = "default_chunk_size_bytes")]
    pub chunk_size_bytes: usize,
    /// Maximum number of entries processed per job.
    #[serde(default)]
    pub max_entries: Option<u64>,
    /// Maximum decompressed bytes for a single entry.
    #[serde(default)]
    pub max_entry_bytes: Option<u64>,
    /// Maximum decompressed bytes across one job.
    #[serde(default)]
    pub max_total_bytes: Option<u64>,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            chunk_size_bytes: default_chunk_size_bytes(),
            max_entries: None,
            max_entry_bytes: None,
            max_total_bytes: None,
        }
    }
}

impl LimitsConfig {
    /// Validates the limit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size_bytes < MIN_CHUNK_SIZE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "chunk_size_bytes must be at least {MIN_CHUNK_SIZE_BYTES}"
            )));
        }
        if self.chunk_size_bytes > MAX_CHUNK_SIZE_BYTES {
            return Err(ConfigError::Invalid(format!(
                "chunk_size_bytes exceeds ceiling ({MAX_CHUNK_SIZE_BYTES})"
            )));
        }
        if let Some(0) = self.max_entries {
            return Err(ConfigError::Invalid("max_entries must be greater than zero".to_string()));
        }
        if let Some(0) = self.max_entry_bytes {
            return Err(ConfigError::Invalid(
                "max_entry_bytes must be greater than zero".to_string(),
            ));
        }
        if let Some(0) = self.max_total_bytes {
            return Err(ConfigError::Invalid(
                "max_total_bytes must be greater than zero".to_string(),
            ));
        }
        if let (Some(entry), Some(total)) = (self.max_entry_bytes, self.max_total_bytes)
            && entry > total
        {
            return Err(ConfigError::Invalid(
                "max_entry_bytes cannot exceed max_total_bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts the configured ceilings into runtime extraction limits.
    #[must_use]
    pub fn to_extraction_limits(&self) -> ExtractionLimits {
        ExtractionLimits {
            chunk_bytes: self.chunk_size_bytes,
            max_entries: self.max_entries,
            max_entry_bytes: self.max_entry_bytes,
            max_total_bytes: self.max_total_bytes,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default bind address value.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default maximum request body size.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default chunk size.
const fn default_chunk_size_bytes() -> usize {
    DEFAULT_CHUNK_SIZE_BYTES
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a store endpoint override.
fn validate_endpoint(section: &str, endpoint: Option<&str>) -> Result<(), ConfigError> {
    let Some(endpoint) = endpoint else {
        return Ok(());
    };
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{section} endpoint must not be empty")));
    }
    if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
        return Err(ConfigError::Invalid(format!(
            "{section} endpoint must start with http:// or https://"
        )));
    }
    Ok(())
}
