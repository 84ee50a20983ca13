//! CLI configuration: thin wrapper around `bmsdash_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --ws-url, --token, etc.).

use std::time::Duration;

use secrecy::SecretString;

use bmsdash_core::{DashboardConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use bmsdash_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Which endpoint a command talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Needs {
    /// REST only; the push endpoint may be absent.
    Rest,
    /// Push session; both endpoints must resolve.
    Push,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `DashboardConfig` from the config file, profile and flag overrides.
///
/// Flags win over profile values. With no matching profile, the flags alone
/// must name the endpoints.
pub fn resolve_dashboard_config(
    global: &GlobalOpts,
    needs: Needs,
) -> Result<DashboardConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None if global.api_url.is_none() && global.ws_url.is_none() => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
        None => Profile::default(),
    };

    apply_overrides(&mut profile, global);

    // REST commands never open the push session.
    if needs == Needs::Rest && profile.ws_url.is_none() {
        profile.ws_url.clone_from(&profile.api_url);
    }

    let mut dashboard = bmsdash_config::profile_to_dashboard_config(&profile, &profile_name)?;
    if let Some(ref token) = global.token {
        dashboard.token = Some(SecretString::from(token.clone()));
    }
    if global.insecure {
        dashboard.tls = TlsVerification::DangerAcceptInvalid;
    }
    Ok(dashboard)
}

fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref url) = global.api_url {
        profile.api_url = Some(url.clone());
    }
    if let Some(ref url) = global.ws_url {
        profile.ws_url = Some(url.clone());
    }
    if let Some(ref topic) = global.topic {
        profile.topic = Some(topic.clone());
    }
    if let Some(secs) = global.timeout {
        profile.timeout = Some(secs);
    }
}

fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}

/// Timeout used for one-shot waits (device-id checks).
pub fn request_timeout(dashboard: &DashboardConfig) -> Duration {
    dashboard.timeout + dashboard.debounce
}
