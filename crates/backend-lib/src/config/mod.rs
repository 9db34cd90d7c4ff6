// ============================
// crates/backend-lib/src/config/mod.rs
// ============================
//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `AUTHGATE_`-prefixed environment variables (`__` separates sections, e.g.
//! `AUTHGATE_SERVER__PORT=9000`).
use anyhow::{bail, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::store::RetryPolicy;
use crate::validation::{PasswordRequirements, Schemas, DEFAULT_NAME_MAX_LENGTH};

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
/// Environment variable prefix
pub const ENV_PREFIX: &str = "AUTHGATE_";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub retry: RetrySettings,
    pub auth: AuthSettings,
    pub validation: ValidationSettings,
    pub log: LogSettings,
}

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

/// Which store backs the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    FlatFile,
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// Root directory of the flat-file store
    pub path: PathBuf,
}

/// Retry bounds for session and user lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

/// Auth service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Public URL of the web app, used in emailed links
    pub base_url: String,
    /// Origins allowed to call the API from a browser
    pub trusted_origins: Vec<String>,
    pub session_ttl_secs: u64,
    pub reset_token_ttl_secs: u64,
    /// scrypt cost parameter (log2 of N)
    pub scrypt_log_n: u8,
}

/// Field schema settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationSettings {
    pub name_max_length: usize,
    pub password: PasswordRequirements,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("data"),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            trusted_origins: vec!["http://localhost:3000".to_string()],
            session_ttl_secs: 60 * 60 * 24 * 7, // 7 days
            reset_token_ttl_secs: 60 * 60,
            scrypt_log_n: 15,
        }
    }
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            name_max_length: DEFAULT_NAME_MAX_LENGTH,
            password: PasswordRequirements::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            storage: StorageSettings::default(),
            retry: RetrySettings::default(),
            auth: AuthSettings::default(),
            validation: ValidationSettings::default(),
            log: LogSettings::default(),
        }
    }
}

impl Settings {
    /// Load from `config.toml` in the working directory plus the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load from an explicit TOML file plus the environment.
    /// A missing file is not an error; defaults fill the gaps.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.log.level.to_lowercase().as_str()) {
            bail!("unknown log level {:?}", self.log.level);
        }
        if self.server.port == 0 {
            bail!("server.port must be non-zero");
        }
        if self.auth.session_ttl_secs == 0 {
            bail!("auth.session_ttl_secs must be non-zero");
        }
        if self.auth.reset_token_ttl_secs == 0 {
            bail!("auth.reset_token_ttl_secs must be non-zero");
        }
        if !(1..64).contains(&self.auth.scrypt_log_n) {
            bail!("auth.scrypt_log_n must be between 1 and 63");
        }
        let password = &self.validation.password;
        if password.min_length < 6 {
            bail!("validation.password.min_length must be at least 6");
        }
        if password.min_length > password.max_length {
            bail!("validation.password.min_length exceeds max_length");
        }
        if self.validation.name_max_length == 0 {
            bail!("validation.name_max_length must be non-zero");
        }
        Ok(())
    }

    /// Socket address to listen on
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.server.host.parse()?;
        Ok(SocketAddr::new(ip, self.server.port))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry.max_retries,
            Duration::from_millis(self.retry.base_delay_ms),
        )
    }

    pub fn schemas(&self) -> Schemas {
        Schemas::new(
            self.validation.name_max_length,
            self.validation.password.clone(),
        )
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.session_ttl_secs)
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.reset_token_ttl_secs)
    }
}
