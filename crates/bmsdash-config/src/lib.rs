//! Shared configuration for the bmsdash CLI and TUI.
//!
//! TOML profiles, bearer-token resolution (env + keyring + plaintext),
//! and translation to `bmsdash_core::DashboardConfig`. Both binaries
//! depend on this crate; the CLI layers its global flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use bmsdash_core::{DEFAULT_TOPIC, DashboardConfig, TlsVerification};

const KEYRING_SERVICE: &str = "bmsdash";
const ENV_PREFIX: &str = "BMSDASH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{profile}' has no {field} configured")]
    MissingField { profile: String, field: String },

    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration shared by CLI and TUI.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is named on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Pick `name`, else `default_profile`, else `"default"`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default")
            .to_owned();
        match self.profiles.get(&name) {
            Some(profile) => Ok((name, profile)),
            None => Err(ConfigError::UnknownProfile { name }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// REST root (e.g., "http://bms.local:8084").
    pub api_url: Option<String>,

    /// STOMP-over-WebSocket endpoint (e.g., "ws://bms.local:8084/ws").
    pub ws_url: Option<String>,

    /// Telemetry topic; defaults to `/topic/hvac`.
    pub topic: Option<String>,

    /// Bearer token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the bearer token.
    pub token_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates on REST calls.
    pub insecure: Option<bool>,

    /// REST timeout in seconds.
    pub timeout: Option<u64>,

    pub reconnect_delay_ms: Option<u64>,

    pub handshake_timeout_ms: Option<u64>,

    /// STOMP virtual host for brokers that require one (e.g. "/" on RabbitMQ).
    pub virtual_host: Option<String>,

    pub debounce_ms: Option<u64>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "bmsdash", "bmsdash").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("bmsdash");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + `BMSDASH_` environment variables.
///
/// Nested keys use a double underscore, e.g.
/// `BMSDASH_PROFILES__LAB__API_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    debug!(path = %path.display(), "Loading configuration");
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if loading fails.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve a bearer token from the profile's credential chain.
///
/// Order: `token_env` variable, system keyring, plaintext `token`.
/// `None` means the backend is reached anonymously.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    if let Some(ref env_name) = profile.token_env {
        if let Ok(val) = std::env::var(env_name) {
            return Some(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name)) {
        if let Ok(secret) = entry.get_password() {
            return Some(SecretString::from(secret));
        }
    }

    profile.token.clone().map(SecretString::from)
}

/// Store a profile's bearer token in the system keyring.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &keyring_user(profile_name))?;
    entry.set_password(token)?;
    Ok(())
}

fn keyring_user(profile_name: &str) -> String {
    format!("{profile_name}/token")
}

// ── Translation ─────────────────────────────────────────────────────

/// Build a `DashboardConfig` from a profile with no CLI overrides.
///
/// Both endpoints are required; a missing or unparsable one is a
/// configuration failure, never retried.
pub fn profile_to_dashboard_config(
    profile: &Profile,
    profile_name: &str,
) -> Result<DashboardConfig, ConfigError> {
    let api_url = required_url(profile.api_url.as_deref(), "api_url", profile_name)?;
    let ws_url = required_url(profile.ws_url.as_deref(), "ws_url", profile_name)?;

    let mut cfg = DashboardConfig::new(api_url, ws_url);
    cfg.topic = profile.topic.clone().unwrap_or_else(|| DEFAULT_TOPIC.into());
    cfg.token = resolve_token(profile, profile_name);
    cfg.tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };
    cfg.timeout = Duration::from_secs(profile.timeout.unwrap_or_else(default_timeout));

    if let Some(ms) = profile.reconnect_delay_ms {
        if ms == 0 {
            return Err(ConfigError::Validation {
                field: "reconnect_delay_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        cfg.reconnect_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = profile.handshake_timeout_ms {
        cfg.handshake_timeout = Duration::from_millis(ms);
    }
    if let Some(ms) = profile.debounce_ms {
        cfg.debounce = Duration::from_millis(ms);
    }
    cfg.virtual_host.clone_from(&profile.virtual_host);

    Ok(cfg)
}

/// Parse a URL-valued setting, naming the field on failure.
pub fn parse_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    value.parse().map_err(|e: url::ParseError| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{value}': {e}"),
    })
}

fn required_url(value: Option<&str>, field: &str, profile_name: &str) -> Result<Url, ConfigError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_url(field, v),
        None => Err(ConfigError::MissingField {
            profile: profile_name.into(),
            field: field.into(),
        }),
    }
}
