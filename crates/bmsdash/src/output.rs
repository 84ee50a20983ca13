//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use bmsdash_core::{AvailabilityState, ConnectionState, FleetSummary};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Connection badge: green when connected, red when not.
pub fn connection_badge(state: ConnectionState, color: bool) -> String {
    let label: &'static str = state.into();
    if !color {
        return label.to_owned();
    }
    match state {
        ConnectionState::Connected => label.green().bold().to_string(),
        ConnectionState::Connecting => label.yellow().to_string(),
        ConnectionState::Disconnected => label.red().bold().to_string(),
    }
}

/// One-line status message for a settled availability check.
pub fn availability_line(id: &str, state: &AvailabilityState, color: bool) -> String {
    let text = match state {
        AvailabilityState::Idle => format!("{id}: no check required"),
        AvailabilityState::Checking => format!("{id}: checking..."),
        AvailabilityState::Available => format!("{id}: device id is available"),
        AvailabilityState::Taken => format!("{id}: device id already exists"),
        AvailabilityState::Error(message) => format!("{id}: error checking device id ({message})"),
    };
    if !color {
        return text;
    }
    match state {
        AvailabilityState::Available => text.green().to_string(),
        AvailabilityState::Taken | AvailabilityState::Error(_) => text.red().to_string(),
        AvailabilityState::Idle | AvailabilityState::Checking => text,
    }
}

/// Header cards as one line: units, active, faults, average temperature.
pub fn summary_line(summary: &FleetSummary, color: bool) -> String {
    let avg = summary
        .mean_temperature
        .map_or_else(|| "--".to_owned(), |t| format!("{t:.1}°C"));
    let faults = summary.faulted.to_string();
    let faults = if color && summary.faulted > 0 {
        faults.yellow().bold().to_string()
    } else {
        faults
    };
    format!(
        "Units: {}  Active: {}  Faults: {faults}  Avg Temp: {avg}",
        summary.total, summary.active
    )
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// `Tabled` derive.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}
