//! Live telemetry streaming.

use chrono::Local;
use tabled::Tabled;
use tokio::sync::mpsc;
use tracing::{debug, info};

use bmsdash_core::{ConnectionEvent, DeviceState, LiveView, TelemetrySnapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::config::{self, Needs};
use crate::error::CliError;
use crate::output;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Unit")]
    unit: String,
    #[tabled(rename = "Temp (°C)")]
    temperature: String,
    #[tabled(rename = "Setpoint (°C)")]
    setpoint: String,
    #[tabled(rename = "On/Off")]
    on_off: &'static str,
    #[tabled(rename = "Fan (%)")]
    fan: String,
    #[tabled(rename = "Flow")]
    flow: String,
    #[tabled(rename = "Fault")]
    fault: &'static str,
    #[tabled(rename = "Last Update")]
    last_update: String,
}

impl From<&DeviceState> for DeviceRow {
    fn from(d: &DeviceState) -> Self {
        Self {
            unit: d.display_name.clone(),
            temperature: format!("{:.2}", d.temperature),
            setpoint: format!("{:.2}", d.setpoint),
            on_off: d.on_off_label(),
            fan: format!("{:.0}%", d.fan_speed_percent),
            flow: format!("{:.2} m³/h", d.flow_rate),
            fault: d.fault_label(),
            last_update: d
                .sample_time
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string(),
        }
    }
}

// ── Rendering ───────────────────────────────────────────────────────

fn render_snapshot(
    snapshot: &TelemetrySnapshot,
    args: &WatchArgs,
    format: OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    let summary = snapshot.summary();
    if args.summary {
        return output::render_single(
            format,
            &summary,
            |s| output::summary_line(s, color),
            |s| s.total.to_string(),
        );
    }

    let devices: Vec<DeviceState> = snapshot.iter().cloned().collect();
    let body = output::render_list(format, &devices, |d| DeviceRow::from(d), |d| d.id.to_string())?;

    if !matches!(format, OutputFormat::Table) {
        return Ok(body);
    }
    if devices.is_empty() {
        return Ok(format!(
            "{}\nNo data available",
            output::summary_line(&summary, color)
        ));
    }
    Ok(format!("{}\n{body}", output::summary_line(&summary, color)))
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let dashboard = config::resolve_dashboard_config(global, Needs::Push)?;
    let color = output::should_color(global.color);

    info!(endpoint = %dashboard.ws_url, topic = %dashboard.topic, "Watching telemetry");

    let (tx, mut events) = mpsc::unbounded_channel();
    let view = LiveView::mount(&dashboard, Some(tx)).await;
    let mut snapshots = view.snapshots();

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                break Ok(());
            }
            Some(event) = events.recv() => match event {
                ConnectionEvent::Transition { to, .. } => {
                    if !global.quiet {
                        eprintln!(
                            "{} {}",
                            Local::now().format("%H:%M:%S"),
                            output::connection_badge(to, color)
                        );
                    }
                }
                ConnectionEvent::Fatal(reason) => break Err(CliError::InvalidEndpoint { reason }),
            },
            snapshot = snapshots.changed() => {
                let Some(snapshot) = snapshot else {
                    break Ok(());
                };
                match render_snapshot(&snapshot, &args, global.output, color) {
                    Ok(out) => output::print_output(&out, global.quiet),
                    Err(e) => break Err(e),
                }
                if args.once {
                    break Ok(());
                }
            }
        }
    };

    view.unmount().await;
    result
}
