//! `bmsdash-tui`: live HVAC telemetry dashboard in the terminal.
//!
//! Screen 1 shows the live unit table fed by the STOMP push session, with
//! fleet summary cards and the connection state. Screen 2 registers new
//! units, checking BACnet device ids for uniqueness while you type.
//!
//! Logs go to a file (default `$TMPDIR/bmsdash-tui.log`) so they never
//! corrupt the terminal.

mod action;
mod app;
mod component;
mod data_bridge;
mod event;
mod screen;
mod screens;
mod theme;
mod tui;
mod widgets;

use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::{Result, WrapErr, bail};
use secrecy::SecretString;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use bmsdash_config::Profile;
use bmsdash_core::DashboardConfig;

use crate::app::App;

/// Terminal dashboard for live HVAC telemetry.
#[derive(Parser, Debug)]
#[command(name = "bmsdash-tui", version, about)]
struct Cli {
    /// Profile from the config file
    #[arg(short, long, env = "BMSDASH_PROFILE")]
    profile: Option<String>,

    /// REST base URL (e.g. http://bms.local:8084)
    #[arg(long, env = "BMSDASH_API_URL")]
    api_url: Option<String>,

    /// STOMP WebSocket endpoint (e.g. ws://bms.local:8084/ws)
    #[arg(long, env = "BMSDASH_WS_URL")]
    ws_url: Option<String>,

    /// Telemetry topic
    #[arg(long)]
    topic: Option<String>,

    /// Bearer token for REST calls and the WebSocket upgrade
    #[arg(long, env = "BMSDASH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// File-based tracing; the guard must live until exit so logs flush.
fn setup_tracing(cli: &Cli) -> WorkerGuard {
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "bmsdash_tui={level},bmsdash_core={level},bmsdash_api={level}"
        ))
    });

    let log_file = cli
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("bmsdash-tui.log"));
    let dir = log_file
        .parent()
        .map_or_else(std::env::temp_dir, Path::to_path_buf);
    let file_name = log_file
        .file_name()
        .map_or_else(|| "bmsdash-tui.log".into(), std::ffi::OsStr::to_os_string);

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    guard
}

/// Profile from the config file, overlaid with flags. Missing endpoints
/// stop startup here, before the terminal is taken over.
fn resolve_config(cli: &Cli) -> Result<DashboardConfig> {
    let cfg = bmsdash_config::load_config_or_default();
    let name = cli
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    let mut profile = match cfg.profiles.get(&name) {
        Some(profile) => profile.clone(),
        None if cli.profile.is_some() => bail!(
            "profile '{name}' not found in {}",
            bmsdash_config::config_path().display()
        ),
        None => Profile::default(),
    };

    if let Some(ref url) = cli.api_url {
        profile.api_url = Some(url.clone());
    }
    if let Some(ref url) = cli.ws_url {
        profile.ws_url = Some(url.clone());
    }
    if let Some(ref topic) = cli.topic {
        profile.topic = Some(topic.clone());
    }

    let mut config = bmsdash_config::profile_to_dashboard_config(&profile, &name)
        .wrap_err("no backend configured; pass --api-url and --ws-url or add a profile")?;
    if let Some(ref token) = cli.token {
        config.token = Some(SecretString::from(token.clone()));
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tui::install_hooks()?;
    let _log_guard = setup_tracing(&cli);

    let config = resolve_config(&cli)?;
    info!(
        api_url = %config.api_url,
        ws_url = %config.ws_url,
        topic = %config.topic,
        "starting bmsdash-tui"
    );

    let mut app = App::new(config);
    app.run().await
}
