//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use bmsdash_config::ConfigError;
use bmsdash_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFLICT: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach backend at {url}")]
    #[diagnostic(
        code(bmsdash::connection_failed),
        help(
            "Check that the backend is running and accessible.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Push endpoint rejected: {reason}")]
    #[diagnostic(
        code(bmsdash::invalid_endpoint),
        help("Use a ws://, wss://, http:// or https:// URL for --ws-url or the profile's ws_url.")
    )]
    InvalidEndpoint { reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(bmsdash::auth_failed),
        help(
            "Verify the bearer token.\n\
             Run: bmsdash config set-token --profile <name>"
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' already exists")]
    #[diagnostic(code(bmsdash::conflict))]
    Conflict {
        resource_type: String,
        identifier: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Backend error (HTTP {status}): {message}")]
    #[diagnostic(code(bmsdash::api_error))]
    ApiError { status: u16, message: String },

    #[error("Unexpected response from backend: {message}")]
    #[diagnostic(code(bmsdash::unexpected_response))]
    UnexpectedResponse { message: String },

    #[error("Device id check failed: {message}")]
    #[diagnostic(code(bmsdash::check_failed))]
    CheckFailed { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(bmsdash::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(bmsdash::profile_not_found),
        help(
            "Available profiles: {available}\n\
             List them with: bmsdash config profiles"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(bmsdash::no_config),
        help(
            "Pass --api-url/--ws-url or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Profile '{profile}' is missing {field}")]
    #[diagnostic(
        code(bmsdash::missing_setting),
        help("Set {field} in the profile or pass the matching --flag.")
    )]
    MissingSetting { profile: String, field: String },

    #[error("{0}")]
    #[diagnostic(code(bmsdash::config))]
    Config(String),

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out")]
    #[diagnostic(
        code(bmsdash::timeout),
        help("Increase timeout with --timeout or check backend responsiveness.")
    )]
    Timeout,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML output failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::CheckFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Conflict { .. } => exit_code::CONFLICT,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::InvalidEndpoint { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },
            CoreError::Timeout => CliError::Timeout,
            CoreError::PushDisconnected { reason } => CliError::ConnectionFailed {
                url: "(push endpoint)".into(),
                reason,
            },
            CoreError::Rejected { status, message } => CliError::ApiError { status, message },
            CoreError::UnexpectedResponse { message } => CliError::UnexpectedResponse { message },
            CoreError::Config { message } => CliError::Config(message),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::MissingField { profile, field } => {
                CliError::MissingSetting { profile, field }
            }
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: String::new(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config(other.to_string()),
        }
    }
}
