//! Service configuration
//!
//! One JSON file, every field but `auth.jwt_secret` optional. Loading
//! validates the result; `LIBRIS_JWT_SECRET` overrides the secret so it
//! can stay out of the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::JwtConfig;
use crate::borrowing::{FeeSchedule, LendingPolicy, Money};
use crate::catalog::DEFAULT_VOLUMES_URL;
use crate::http_server::HttpServerConfig;
use crate::observability::LogFormat;

/// Environment variable that replaces `auth.jwt_secret`
pub const JWT_SECRET_ENV: &str = "LIBRIS_JWT_SECRET";

const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    #[serde(default)]
    pub library: LibraryConfig,

    pub auth: AuthConfig,

    #[serde(default)]
    pub lookup: LookupConfig,

    /// Snapshot loaded at start, rewritten every `snapshot_interval_secs`
    /// while serving and once more on graceful shutdown. Changes made
    /// after the last save are lost if the process is killed.
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// Seconds between data file saves while serving; 0 saves only on shutdown
    #[serde(default = "default_snapshot_interval")]
    pub snapshot_interval_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,
}

/// Lending rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    #[serde(default = "default_loan_period_days")]
    pub loan_period_days: u32,

    /// Minor currency units per whole day late
    #[serde(default = "default_late_fee_per_day")]
    pub late_fee_per_day: u64,

    #[serde(default = "default_five")]
    pub recommendation_limit: usize,

    #[serde(default = "default_five")]
    pub top_borrowed_limit: usize,

    #[serde(default = "default_due_soon_days")]
    pub due_soon_days: u32,

    #[serde(default)]
    pub allow_duplicate_loans: bool,

    #[serde(default = "default_true")]
    pub notify_on_return: bool,
}

fn default_snapshot_interval() -> u64 {
    30
}
fn default_loan_period_days() -> u32 {
    14
}
fn default_late_fee_per_day() -> u64 {
    100
}
fn default_five() -> usize {
    5
}
fn default_due_soon_days() -> u32 {
    2
}
fn default_true() -> bool {
    true
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            loan_period_days: default_loan_period_days(),
            late_fee_per_day: default_late_fee_per_day(),
            recommendation_limit: default_five(),
            top_borrowed_limit: default_five(),
            due_soon_days: default_due_soon_days(),
            allow_duplicate_loans: false,
            notify_on_return: true,
        }
    }
}

impl LibraryConfig {
    pub fn lending_policy(&self) -> LendingPolicy {
        LendingPolicy {
            loan_period: Duration::days(i64::from(self.loan_period_days)),
            fees: FeeSchedule::new(Money::from_minor(self.late_fee_per_day)),
            allow_duplicate_loans: self.allow_duplicate_loans,
            notify_on_return: self.notify_on_return,
            due_soon_window: Duration::days(i64::from(self.due_soon_days)),
        }
    }
}

/// Bearer token verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_token_party")]
    pub issuer: String,

    #[serde(default = "default_token_party")]
    pub audience: String,

    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: u32,
}

fn default_token_party() -> String {
    "libris".to_string()
}
fn default_token_ttl_minutes() -> u32 {
    60
}

impl AuthConfig {
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: secret.into(),
            issuer: default_token_party(),
            audience: default_token_party(),
            token_ttl_minutes: default_token_ttl_minutes(),
        }
    }

    pub fn jwt_config(&self) -> JwtConfig {
        JwtConfig {
            secret: self.jwt_secret.clone(),
            access_token_ttl: Duration::minutes(i64::from(self.token_ttl_minutes)),
            issuer: self.issuer.clone(),
            audience: self.audience.clone(),
        }
    }
}

/// External ISBN lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_lookup_url")]
    pub base_url: String,

    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
}

fn default_lookup_url() -> String {
    DEFAULT_VOLUMES_URL.to_string()
}
fn default_lookup_timeout() -> u64 {
    10
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_lookup_url(),
            timeout_secs: default_lookup_timeout(),
        }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> StdDuration {
        StdDuration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Defaults everywhere except the secret
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            server: HttpServerConfig::default(),
            library: LibraryConfig::default(),
            auth: AuthConfig::with_secret(secret),
            lookup: LookupConfig::default(),
            data_file: None,
            snapshot_interval_secs: default_snapshot_interval(),
            log_format: LogFormat::default(),
        }
    }

    /// Period of the background data file save, if any
    pub fn snapshot_interval(&self) -> Option<StdDuration> {
        match (&self.data_file, self.snapshot_interval_secs) {
            (Some(_), secs) if secs > 0 => Some(StdDuration::from_secs(secs)),
            _ => None,
        }
    }

    /// Load configuration from file, apply the environment override and validate
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            if !secret.is_empty() {
                config.auth.jwt_secret = secret;
            }
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.auth.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {} bytes (or set {})",
                MIN_SECRET_LEN, JWT_SECRET_ENV
            )));
        }

        if self.auth.token_ttl_minutes == 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_minutes must be > 0".to_string(),
            ));
        }

        if self.library.loan_period_days == 0 {
            return Err(ConfigError::Invalid(
                "library.loan_period_days must be > 0".to_string(),
            ));
        }

        if self.server.socket_addr().parse::<std::net::SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "server address '{}' is not a valid socket address",
                self.server.socket_addr()
            )));
        }

        if self.lookup.enabled {
            if !self.lookup.base_url.starts_with("http://")
                && !self.lookup.base_url.starts_with("https://")
            {
                return Err(ConfigError::Invalid(format!(
                    "lookup.base_url must be an http(s) URL, got '{}'",
                    self.lookup.base_url
                )));
            }
            if self.lookup.timeout_secs == 0 {
                return Err(ConfigError::Invalid(
                    "lookup.timeout_secs must be > 0".to_string(),
                ));
            }
        }

        Ok(())
    }
}
