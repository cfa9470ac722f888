use std::collections::BTreeMap;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use serde_aux::prelude::deserialize_vec_from_string_or_vec;

/// Application configuration loaded from multiple sources.
///
/// Configuration is loaded in priority order (lowest to highest):
/// 1. Struct defaults
/// 2. config.yaml file (if exists)
/// 3. Environment variables with IRONHAT_ prefix
/// 4. The bare `PORT` environment variable (always wins)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub security_headers: SecurityHeadersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP server bind address.
    #[serde(default = "default_host")]
    pub host: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticFilesConfig {
    /// Directory served for static assets.
    #[serde(default = "default_public_dir")]
    pub public_dir: String,

    /// Index document served at `/` and as the routing fallback.
    #[serde(default = "default_index_file")]
    pub index_file: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            public_dir: default_public_dir(),
            index_file: default_index_file(),
        }
    }
}

/// Response-header security policy knobs.
///
/// Defaults match the shipped policy: frames denied, HSTS forced for 90
/// days, CSP restricted to `'self'` plus the trusted script CDN.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SecurityHeadersConfig {
    /// Enable security headers (default: true).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// X-Frame-Options action: "deny" or "sameorigin" (default: "deny").
    /// The deprecated "allow-from" is rejected.
    #[serde(default = "default_frame_action")]
    pub frame_action: String,

    /// Enable the Strict-Transport-Security header (default: true).
    #[serde(default = "default_true")]
    pub hsts_enabled: bool,

    /// HSTS max-age in seconds (default: 7776000 = 90 days).
    #[serde(default = "default_hsts_max_age")]
    pub hsts_max_age: u64,

    /// Set the HSTS header on every response, not just those detected as
    /// HTTPS (default: true).
    #[serde(default = "default_true")]
    pub hsts_force: bool,

    /// Include subdomains in HSTS (default: false).
    #[serde(default)]
    pub hsts_include_subdomains: bool,

    /// Disable client-side caching via Cache-Control/Pragma/Expires/
    /// Surrogate-Control (default: false, opt-in).
    #[serde(default)]
    pub no_cache: bool,

    /// Content-Security-Policy directives (default: "default-src 'self';
    /// script-src 'self' trusted-cdn.com").
    #[serde(default)]
    pub csp: CspConfig,
}

/// A CSP source list. Accepts either an array or a comma-separated string so
/// directives can be overridden from environment variables.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct SourceList(
    #[serde(deserialize_with = "deserialize_vec_from_string_or_vec")] pub Vec<String>,
);

/// Content-Security-Policy directive set.
///
/// `BTreeMap` keeps the emitted header value deterministic; `default-src`
/// sorts ahead of the more specific directives.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CspConfig {
    #[serde(default = "default_csp_directives")]
    pub directives: BTreeMap<String, SourceList>,
}

impl Default for CspConfig {
    fn default() -> Self {
        Self {
            directives: default_csp_directives(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_public_dir() -> String {
    "public".to_string()
}

fn default_index_file() -> String {
    "views/index.html".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}

fn default_frame_action() -> String {
    "deny".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_hsts_max_age() -> u64 {
    7_776_000 // 90 days
}

fn default_csp_directives() -> BTreeMap<String, SourceList> {
    let mut directives = BTreeMap::new();
    directives.insert(
        "default-src".to_string(),
        SourceList(vec!["'self'".to_string()]),
    );
    directives.insert(
        "script-src".to_string(),
        SourceList(vec!["'self'".to_string(), "trusted-cdn.com".to_string()]),
    );
    directives
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            frame_action: default_frame_action(),
            hsts_enabled: default_true(),
            hsts_max_age: default_hsts_max_age(),
            hsts_force: default_true(),
            hsts_include_subdomains: false,
            no_cache: false,
            csp: CspConfig::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                port: default_port(),
                host: default_host(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
            },
            static_files: StaticFilesConfig::default(),
            security_headers: SecurityHeadersConfig::default(),
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Sources are merged in priority order:
    /// 1. Struct defaults (lowest)
    /// 2. config.yaml file (if exists)
    /// 3. Environment variables with IRONHAT_ prefix
    /// 4. `PORT` (highest, the conventional deployment interface)
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_file("config.yaml")
    }

    /// Load configuration with a custom YAML file path.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load_from(yaml_path: &str) -> Result<Self, ConfigError> {
        Self::load_with_file(yaml_path)
    }

    fn load_with_file(yaml_path: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path))
            .merge(Env::prefixed("IRONHAT_").split("__"))
            .merge(
                Env::raw()
                    .only(&["PORT"])
                    .map(|_| "server.port".into())
                    .split("."),
            )
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// The process refuses to start on any invalid value rather than serve
    /// requests with a broken security policy.
    ///
    /// # Errors
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Port must be non-zero
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".into()));
        }

        if self.static_files.public_dir.is_empty() {
            return Err(ConfigError::Validation(
                "static_files.public_dir cannot be empty".into(),
            ));
        }

        if self.static_files.index_file.is_empty() {
            return Err(ConfigError::Validation(
                "static_files.index_file cannot be empty".into(),
            ));
        }

        // X-Frame-Options action must be DENY or SAMEORIGIN; ALLOW-FROM is
        // deprecated and unsupported
        let frame_action = self.security_headers.frame_action.to_uppercase();
        if frame_action != "DENY" && frame_action != "SAMEORIGIN" {
            return Err(ConfigError::Validation(format!(
                "security_headers.frame_action must be 'deny' or 'sameorigin', got: '{}'",
                self.security_headers.frame_action
            )));
        }

        // A zero max-age would instruct browsers to forget HSTS state
        if self.security_headers.hsts_enabled && self.security_headers.hsts_max_age == 0 {
            return Err(ConfigError::Validation(
                "security_headers.hsts_max_age cannot be 0 while HSTS is enabled".into(),
            ));
        }

        self.validate_csp()
    }

    fn validate_csp(&self) -> Result<(), ConfigError> {
        let directives = &self.security_headers.csp.directives;

        if directives.is_empty() {
            return Err(ConfigError::Validation(
                "security_headers.csp.directives cannot be empty".into(),
            ));
        }

        // default-src is the fallback for every directive left unset
        if !directives.contains_key("default-src") {
            return Err(ConfigError::Validation(
                "security_headers.csp.directives must include 'default-src'".into(),
            ));
        }

        for (name, SourceList(sources)) in directives {
            if name.is_empty()
                || !name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            {
                return Err(ConfigError::Validation(format!(
                    "security_headers.csp.directives contains invalid directive name '{name}'. \
                     Use lowercase names like 'default-src'"
                )));
            }

            if sources.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "security_headers.csp.directives['{name}'] has an empty source list"
                )));
            }

            if sources.iter().any(|source| source.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "security_headers.csp.directives['{name}'] contains an empty source token"
                )));
            }
        }

        Ok(())
    }
}
