//! Clap derive structures for the `bmsdash` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

use bmsdash_core::Protocol;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// bmsdash -- live HVAC telemetry from the terminal
#[derive(Debug, Parser)]
#[command(
    name = "bmsdash",
    version,
    about = "Watch live HVAC telemetry and manage unit registrations",
    long_about = "A command-line client for a building-management backend.\n\n\
        Streams unit telemetry over STOMP/WebSocket and talks to the HVAC\n\
        configuration REST API for registrations and device-id checks.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "BMSDASH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// REST API root (overrides profile)
    #[arg(long, env = "BMSDASH_API_URL", global = true)]
    pub api_url: Option<String>,

    /// STOMP WebSocket endpoint (overrides profile)
    #[arg(long, env = "BMSDASH_WS_URL", global = true)]
    pub ws_url: Option<String>,

    /// Telemetry topic (overrides profile)
    #[arg(long, global = true)]
    pub topic: Option<String>,

    /// Bearer token
    #[arg(long, env = "BMSDASH_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "BMSDASH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates on REST calls
    #[arg(long, short = 'k', global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream live unit telemetry until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Check whether a device id is already registered
    CheckId(CheckIdArgs),

    /// Manage HVAC unit registrations
    #[command(alias = "u")]
    Units(UnitsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Exit after the first telemetry frame
    #[arg(long)]
    pub once: bool,

    /// Print only the fleet summary line
    #[arg(long)]
    pub summary: bool,
}

// ── Check-id ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CheckIdArgs {
    /// Device id to look up
    pub device_id: String,

    /// Protocol namespace (SIMULATOR, BACNET, MODBUS)
    #[arg(long, default_value = "BACNET")]
    pub protocol: Protocol,
}

// ── Units ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct UnitsArgs {
    #[command(subcommand)]
    pub command: UnitsCommand,
}

#[derive(Debug, Subcommand)]
pub enum UnitsCommand {
    /// List registered units
    #[command(alias = "ls")]
    List,

    /// Register a new unit
    Add(Box<AddUnitArgs>),
}

#[derive(Debug, Args)]
pub struct AddUnitArgs {
    /// Field-bus device id
    #[arg(long)]
    pub device_id: String,

    /// Display name
    #[arg(long)]
    pub name: String,

    #[arg(long, default_value = "SIMULATOR")]
    pub protocol: Protocol,

    #[arg(long)]
    pub building: Option<String>,

    #[arg(long)]
    pub floor: Option<String>,

    #[arg(long)]
    pub room: Option<String>,

    /// BACnet device instance (defaults to the device id when numeric)
    #[arg(long)]
    pub bacnet_instance: Option<u32>,

    #[arg(long)]
    pub modbus_host: Option<String>,

    #[arg(long)]
    pub modbus_port: Option<u16>,

    #[arg(long)]
    pub modbus_unit_id: Option<u8>,

    /// Register the unit disabled
    #[arg(long)]
    pub disabled: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store a bearer token (read from stdin) in the system keyring
    SetToken {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
