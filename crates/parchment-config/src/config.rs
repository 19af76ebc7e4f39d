// crates/parchment-config/src/config.rs
// ============================================================================
// Module: Parchment Configuration
// Description: Configuration loading and validation for the Parchment server.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and content
//! limits. Missing or invalid configuration fails closed; the server refuses
//! to start on anything it cannot fully validate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "parchment.toml";
/// Environment variable used to override the config path.
pub(crate) const CONFIG_ENV_VAR: &str = "PARCHMENT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum number of server auth tokens.
pub(crate) const MAX_AUTH_TOKENS: usize = 64;
/// Maximum length of a server auth token.
pub(crate) const MAX_AUTH_TOKEN_LENGTH: usize = 256;
/// Maximum request body size the server will accept.
pub(crate) const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Minimum allowed cache time-to-live in seconds.
pub(crate) const MIN_CACHE_TTL_SECS: u64 = 1;
/// Maximum allowed cache time-to-live in seconds.
pub(crate) const MAX_CACHE_TTL_SECS: u64 = 86_400;
/// Maximum number of tracked blueprint paths.
pub(crate) const MAX_BLUEPRINT_PATHS: usize = 256;
/// Maximum number of extra template tags.
pub(crate) const MAX_EXTRA_TAGS: usize = 128;

/// Default maximum request body size in bytes.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Default memoization time-to-live in seconds.
const fn default_memoize_ttl_secs() -> u64 {
    300
}

/// Default discovery time-to-live in seconds.
const fn default_discovery_ttl_secs() -> u64 {
    3600
}

/// Default blueprint-scan time-to-live in seconds.
const fn default_scan_ttl_secs() -> u64 {
    1800
}

/// Default cache enablement.
const fn default_cache_enabled() -> bool {
    true
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Parchment server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParchmentConfig {
    /// Server transport configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Cache layer configuration.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging sink configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Destructive-operation gate configuration.
    #[serde(default)]
    pub safety: SafetyConfig,
    /// Template linter configuration.
    #[serde(default)]
    pub lint: LintConfig,
    /// Content store configuration.
    #[serde(default)]
    pub store: StoreConfig,
}

impl ParchmentConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path argument wins over the `PARCHMENT_CONFIG` environment
    /// variable, which wins over `parchment.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path);
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
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
        self.cache.validate()?;
        self.logging.validate()?;
        self.lint.validate()?;
        self.store.validate()?;
        Ok(())
    }
}

/// Transport type for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerTransport {
    /// Use stdin/stdout framed transport.
    #[default]
    Stdio,
    /// Use HTTP JSON-RPC transport.
    Http,
}

/// Server configuration for MCP transports.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Transport type for MCP.
    #[serde(default)]
    pub transport: ServerTransport,
    /// Bind address for the HTTP transport.
    #[serde(default)]
    pub bind: Option<String>,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Bearer tokens accepted on the HTTP transport.
    #[serde(default)]
    pub auth_tokens: Vec<String>,
    /// Whether debug detail may appear in error responses.
    #[serde(default)]
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: ServerTransport::Stdio,
            bind: None,
            max_body_bytes: default_max_body_bytes(),
            auth_tokens: Vec::new(),
            debug: false,
        }
    }
}

impl ServerConfig {
    /// Validates server transport configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(
                "server.max_body_bytes must be between 1 and 16 MiB".to_string(),
            ));
        }
        if self.auth_tokens.len() > MAX_AUTH_TOKENS {
            return Err(ConfigError::Invalid("too many server.auth_tokens".to_string()));
        }
        for token in &self.auth_tokens {
            let trimmed = token.trim();
            if trimmed.is_empty() || trimmed.len() > MAX_AUTH_TOKEN_LENGTH {
                return Err(ConfigError::Invalid(
                    "server.auth_tokens entries must be non-empty and bounded".to_string(),
                ));
            }
        }
        match self.transport {
            ServerTransport::Http => {
                let bind = self.bind.as_deref().unwrap_or_default().trim();
                if bind.is_empty() {
                    return Err(ConfigError::Invalid(
                        "http transport requires a bind address".to_string(),
                    ));
                }
                let _: SocketAddr = bind.parse().map_err(|_| {
                    ConfigError::Invalid(format!("invalid bind address: {bind}"))
                })?;
            }
            ServerTransport::Stdio => {
                if self.bind.is_some() {
                    return Err(ConfigError::Invalid(
                        "stdio transport does not take a bind address".to_string(),
                    ));
                }
                if !self.auth_tokens.is_empty() {
                    return Err(ConfigError::Invalid(
                        "auth tokens require the http transport".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Parses the validated bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when no valid bind address is configured.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .as_deref()
            .unwrap_or_default()
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("missing or invalid bind address".to_string()))
    }
}

/// Cache layer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Whether caching is active.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Time-to-live for memoized computations, in seconds.
    #[serde(default = "default_memoize_ttl_secs")]
    pub memoize_ttl_secs: u64,
    /// Time-to-live for discovery manifests, in seconds.
    #[serde(default = "default_discovery_ttl_secs")]
    pub discovery_ttl_secs: u64,
    /// Time-to-live for blueprint scans, in seconds.
    #[serde(default = "default_scan_ttl_secs")]
    pub scan_ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            memoize_ttl_secs: default_memoize_ttl_secs(),
            discovery_ttl_secs: default_discovery_ttl_secs(),
            scan_ttl_secs: default_scan_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Validates cache configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, ttl) in [
            ("cache.memoize_ttl_secs", self.memoize_ttl_secs),
            ("cache.discovery_ttl_secs", self.discovery_ttl_secs),
            ("cache.scan_ttl_secs", self.scan_ttl_secs),
        ] {
            if !(MIN_CACHE_TTL_SECS..=MAX_CACHE_TTL_SECS).contains(&ttl) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be between {MIN_CACHE_TTL_SECS} and {MAX_CACHE_TTL_SECS}"
                )));
            }
        }
        Ok(())
    }

    /// Returns the memoization time-to-live as a duration.
    #[must_use]
    pub const fn memoize_ttl(&self) -> Duration {
        Duration::from_secs(self.memoize_ttl_secs)
    }

    /// Returns the discovery time-to-live as a duration.
    #[must_use]
    pub const fn discovery_ttl(&self) -> Duration {
        Duration::from_secs(self.discovery_ttl_secs)
    }

    /// Returns the blueprint-scan time-to-live as a duration.
    #[must_use]
    pub const fn scan_ttl(&self) -> Duration {
        Duration::from_secs(self.scan_ttl_secs)
    }
}

/// Log sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard all log records.
    None,
}

/// Logging sink configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Sink selection.
    #[serde(default)]
    pub sink: LogSinkKind,
    /// Log file path; required for the file sink.
    #[serde(default)]
    pub path: Option<String>,
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match self.sink {
            LogSinkKind::File => {
                let path = self.path.as_deref().unwrap_or_default().trim();
                if path.is_empty() {
                    return Err(ConfigError::Invalid(
                        "file log sink requires logging.path".to_string(),
                    ));
                }
            }
            LogSinkKind::Stderr | LogSinkKind::None => {
                if self.path.is_some() {
                    return Err(ConfigError::Invalid(
                        "logging.path is only valid with the file sink".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Destructive-operation gate configuration.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SafetyConfig {
    /// When set, destructive actions execute without gating.
    #[serde(default)]
    pub bypass: bool,
}

/// Template linter configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LintConfig {
    /// Extra tag names accepted as known, beyond the built-in set.
    #[serde(default)]
    pub extra_tags: Vec<String>,
}

impl LintConfig {
    /// Validates linter configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.extra_tags.len() > MAX_EXTRA_TAGS {
            return Err(ConfigError::Invalid("too many lint.extra_tags".to_string()));
        }
        for tag in &self.extra_tags {
            let valid = !tag.is_empty()
                && tag
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == ':');
            if !valid {
                return Err(ConfigError::Invalid(format!("invalid lint.extra_tags entry: {tag}")));
            }
        }
        Ok(())
    }
}

/// Content store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Blueprint file paths tracked by the scan cache.
    #[serde(default)]
    pub blueprint_paths: Vec<String>,
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.blueprint_paths.len() > MAX_BLUEPRINT_PATHS {
            return Err(ConfigError::Invalid("too many store.blueprint_paths".to_string()));
        }
        for path in &self.blueprint_paths {
            if path.trim().is_empty() || path.contains('\0') {
                return Err(ConfigError::Invalid(
                    "store.blueprint_paths entries must be non-empty".to_string(),
                ));
            }
            let has_parent =
                Path::new(path).components().any(|part| matches!(part, Component::ParentDir));
            if has_parent {
                return Err(ConfigError::Invalid(format!(
                    "store.blueprint_paths entry escapes its root: {path}"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
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
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument or environment defaults.
fn resolve_path(path: Option<&Path>) -> PathBuf {
    if let Some(path) = path {
        return path.to_path_buf();
    }
    if let Ok(from_env) = env::var(CONFIG_ENV_VAR)
        && !from_env.trim().is_empty()
    {
        return PathBuf::from(from_env);
    }
    PathBuf::from(DEFAULT_CONFIG_NAME)
}
