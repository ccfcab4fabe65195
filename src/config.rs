//! Runtime configuration.
//!
//! DESIGN
//! ======
//! Settings come from the environment (after `dotenvy` loads `.env`). A
//! deployment may also ship `CENSUS_CONFIG_B64`: a base64-encoded JSON
//! object whose fields override the plain variables. Malformed numeric or
//! boolean variables fall back to their defaults; a malformed override blob
//! is an error, since it is always machine-generated.

use std::path::PathBuf;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;

use crate::error::ErrorCode;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CACHE_DIR: &str = "./census-cache";
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_RESEND_FROM: &str = "Censo HHR <censo@hospital.local>";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("CENSUS_CONFIG_B64 is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("CENSUS_CONFIG_B64 is not a valid config object: {0}")]
    Json(#[from] serde_json::Error),
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Base64(_) => "E_CONFIG_BASE64",
            Self::Json(_) => "E_CONFIG_JSON",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    pub cudyr: bool,
    pub email: bool,
    pub offline_cache: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self { cudyr: true, email: true, offline_cache: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub port: u16,
    pub db_max_connections: u32,
    pub cache_dir: PathBuf,
    pub sync_interval_ms: u64,
    pub resend_api_key: Option<String>,
    pub resend_from: String,
    pub flags: FeatureFlags,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            port: DEFAULT_PORT,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            sync_interval_ms: DEFAULT_SYNC_INTERVAL_MS,
            resend_api_key: None,
            resend_from: DEFAULT_RESEND_FROM.to_owned(),
            flags: FeatureFlags::default(),
        }
    }
}

/// Shape of the decoded `CENSUS_CONFIG_B64` object. Every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigOverride {
    database_url: Option<String>,
    port: Option<u16>,
    db_max_connections: Option<u32>,
    cache_dir: Option<String>,
    sync_interval_ms: Option<u64>,
    resend_api_key: Option<String>,
    resend_from: Option<String>,
    features: Option<FlagOverride>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FlagOverride {
    cudyr: Option<bool>,
    email: Option<bool>,
    offline_cache: Option<bool>,
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive.
#[must_use]
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse::<T>().ok()).unwrap_or(default)
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty())
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns an error if `CENSUS_CONFIG_B64` is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if `CENSUS_CONFIG_B64` is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let flag = |key: &str| lookup(key).and_then(|v| parse_bool(&v)).unwrap_or(true);
        let mut config = Self {
            database_url: non_empty(lookup("DATABASE_URL")),
            port: parse_or(lookup("PORT"), DEFAULT_PORT),
            db_max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), DEFAULT_DB_MAX_CONNECTIONS),
            cache_dir: non_empty(lookup("CACHE_DIR")).map_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR), PathBuf::from),
            sync_interval_ms: parse_or(lookup("SYNC_INTERVAL_MS"), DEFAULT_SYNC_INTERVAL_MS),
            resend_api_key: non_empty(lookup("RESEND_API_KEY")),
            resend_from: non_empty(lookup("RESEND_FROM")).unwrap_or_else(|| DEFAULT_RESEND_FROM.to_owned()),
            flags: FeatureFlags {
                cudyr: flag("FEATURE_CUDYR"),
                email: flag("FEATURE_EMAIL"),
                offline_cache: flag("FEATURE_OFFLINE_CACHE"),
            },
        };

        if let Some(blob) = non_empty(lookup("CENSUS_CONFIG_B64")) {
            let bytes = STANDARD.decode(blob.as_bytes())?;
            let overrides: ConfigOverride = serde_json::from_slice(&bytes)?;
            config.apply(overrides);
        }
        Ok(config)
    }

    fn apply(&mut self, o: ConfigOverride) {
        if let Some(url) = non_empty(o.database_url) {
            self.database_url = Some(url);
        }
        if let Some(port) = o.port {
            self.port = port;
        }
        if let Some(max) = o.db_max_connections {
            self.db_max_connections = max;
        }
        if let Some(dir) = non_empty(o.cache_dir) {
            self.cache_dir = PathBuf::from(dir);
        }
        if let Some(ms) = o.sync_interval_ms {
            self.sync_interval_ms = ms;
        }
        if let Some(key) = non_empty(o.resend_api_key) {
            self.resend_api_key = Some(key);
        }
        if let Some(from) = non_empty(o.resend_from) {
            self.resend_from = from;
        }
        if let Some(flags) = o.features {
            self.flags.cudyr = flags.cudyr.unwrap_or(self.flags.cudyr);
            self.flags.email = flags.email.unwrap_or(self.flags.email);
            self.flags.offline_cache = flags.offline_cache.unwrap_or(self.flags.offline_cache);
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
