//! Config subcommand handlers.

use std::fmt::Write as _;
use std::io::BufRead;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

/// Format config for display, masking sensitive fields.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref url) = p.api_url {
            let _ = writeln!(out, "api_url = \"{url}\"");
        }
        if let Some(ref url) = p.ws_url {
            let _ = writeln!(out, "ws_url = \"{url}\"");
        }
        if let Some(ref topic) = p.topic {
            let _ = writeln!(out, "topic = \"{topic}\"");
        }
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(ms) = p.reconnect_delay_ms {
            let _ = writeln!(out, "reconnect_delay_ms = {ms}");
        }
        if let Some(ms) = p.handshake_timeout_ms {
            let _ = writeln!(out, "handshake_timeout_ms = {ms}");
        }
        if let Some(ref vhost) = p.virtual_host {
            let _ = writeln!(out, "virtual_host = \"{vhost}\"");
        }
        if let Some(ms) = p.debounce_ms {
            let _ = writeln!(out, "debounce_ms = {ms}");
        }
    }

    out
}

fn read_token_from_stdin() -> Result<String, CliError> {
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let token = line.trim();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "token".into(),
            reason: "no token on stdin".into(),
        });
    }
    Ok(token.to_owned())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config_or_default();
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = config::active_profile_name(global, &cfg);
            let lines: Vec<String> = cfg
                .profiles
                .keys()
                .map(|name| {
                    let marker = if *name == default { "*" } else { " " };
                    format!("{marker} {name}")
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            if !cfg.profiles.contains_key(&name) {
                let available = cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ");
                return Err(CliError::ProfileNotFound { name, available });
            }
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }

        ConfigCommand::SetToken { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));
            let token = read_token_from_stdin()?;
            bmsdash_config::store_token(&profile_name, &token)?;
            if !global.quiet {
                eprintln!("Token for '{profile_name}' stored in system keyring");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Profile;

    #[test]
    fn redacted_config_masks_token() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                api_url: Some("http://bms.local:8084".into()),
                token: Some("super-secret".into()),
                debounce_ms: Some(300),
                ..Profile::default()
            },
        );
        let out = format_config_redacted(&cfg);
        assert!(out.contains("[profiles.lab]"));
        assert!(out.contains("token = \"****\""));
        assert!(out.contains("debounce_ms = 300"));
        assert!(!out.contains("super-secret"));
    }
}
