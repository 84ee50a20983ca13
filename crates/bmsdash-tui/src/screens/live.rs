//! Live screen: connection badge, fleet summary cards and the unit table.
//!
//! Everything shown comes from the latest snapshot; a new snapshot replaces
//! the table wholesale.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState};

use bmsdash_core::{ConnectionState, DeviceState, TelemetrySnapshot};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::stat_card::{StatCard, format_temperature};

const HEADERS: [&str; 8] = [
    "Unit",
    "Temp (°C)",
    "Setpoint (°C)",
    "On/Off",
    "Fan (%)",
    "Flow (m³/h)",
    "Fault",
    "Last Update",
];

pub struct LiveScreen {
    focused: bool,
    snapshot: Arc<TelemetrySnapshot>,
    connection: ConnectionState,
    fatal: Option<String>,
    last_update: Option<DateTime<Utc>>,
    table_state: TableState,
}

impl LiveScreen {
    pub fn new() -> Self {
        Self {
            focused: false,
            snapshot: Arc::default(),
            connection: ConnectionState::Disconnected,
            fatal: None,
            last_update: None,
            table_state: TableState::default(),
        }
    }

    fn select_next(&mut self) {
        let len = self.snapshot.len();
        if len == 0 {
            return;
        }
        let next = self.table_state.selected().map_or(0, |i| (i + 1).min(len - 1));
        self.table_state.select(Some(next));
    }

    fn select_prev(&mut self) {
        if self.snapshot.is_empty() {
            return;
        }
        let prev = self.table_state.selected().map_or(0, |i| i.saturating_sub(1));
        self.table_state.select(Some(prev));
    }

    /// Keep the selection inside the new snapshot.
    fn clamp_selection(&mut self) {
        match (self.table_state.selected(), self.snapshot.len()) {
            (_, 0) => self.table_state.select(None),
            (Some(i), len) if i >= len => self.table_state.select(Some(len - 1)),
            _ => {}
        }
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let badge_color = theme::connection_color(self.connection);
        let mut spans = vec![
            Span::styled(" HVAC Live Telemetry ", theme::title_style()),
            Span::styled(
                format!(" {} ", self.connection),
                Style::default()
                    .fg(theme::BG_PANEL)
                    .bg(badge_color)
                    .add_modifier(Modifier::BOLD),
            ),
        ];

        if let Some(at) = self.last_update {
            let age = (Utc::now() - at).to_std().unwrap_or(Duration::ZERO);
            let age = Duration::from_secs(age.as_secs());
            spans.push(Span::styled(
                format!("  updated {} ago", humantime::format_duration(age)),
                theme::key_hint(),
            ));
        }

        if let Some(ref reason) = self.fatal {
            spans.push(Span::styled(format!("  {reason}"), theme::error_text()));
        }

        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        let summary = self.snapshot.summary();
        let cols = Layout::horizontal([Constraint::Ratio(1, 4); 4]).split(area);

        let faults_color = if summary.faulted > 0 {
            theme::FAULT_RED
        } else {
            theme::OK_GREEN
        };

        frame.render_widget(StatCard::new("Units", summary.total.to_string()), cols[0]);
        frame.render_widget(
            StatCard::new("Active Units", summary.active.to_string()).accent(theme::OK_GREEN),
            cols[1],
        );
        frame.render_widget(
            StatCard::new("Faults", summary.faulted.to_string()).accent(faults_color),
            cols[2],
        );
        frame.render_widget(
            StatCard::new("Avg Temp", format_temperature(summary.mean_temperature))
                .accent(theme::TEAL),
            cols[3],
        );
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(Span::styled(" Units ", theme::title_style()))
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            });

        if self.snapshot.is_empty() {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(
                Paragraph::new("No data available")
                    .alignment(Alignment::Center)
                    .style(theme::key_hint()),
                inner,
            );
            return;
        }

        let header = Row::new(
            HEADERS
                .iter()
                .map(|h| Cell::from(*h).style(theme::table_header())),
        );
        let rows = self.snapshot.iter().map(device_row);

        let widths = [
            Constraint::Min(14),
            Constraint::Length(10),
            Constraint::Length(14),
            Constraint::Length(7),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(6),
            Constraint::Length(12),
        ];

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(theme::table_selected());

        frame.render_stateful_widget(table, area, &mut self.table_state.clone());
    }
}

fn device_row(device: &DeviceState) -> Row<'static> {
    let on_style = if device.on_state {
        Style::default().fg(theme::OK_GREEN)
    } else {
        theme::key_hint()
    };
    let fault_style = if device.fault {
        theme::error_text().add_modifier(Modifier::BOLD)
    } else {
        theme::success_text()
    };

    Row::new(vec![
        Cell::from(device.display_name.clone()),
        Cell::from(format!("{:.2}", device.temperature)),
        Cell::from(format!("{:.2}", device.setpoint)),
        Cell::from(device.on_off_label()).style(on_style),
        Cell::from(format!("{:.0}%", device.fan_speed_percent)),
        Cell::from(format!("{:.2}", device.flow_rate)),
        Cell::from(device.fault_label()).style(fault_style),
        Cell::from(
            device
                .sample_time
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string(),
        ),
    ])
    .style(theme::table_row())
}

impl Component for LiveScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        match key.code {
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Up | KeyCode::Char('k') => self.select_prev(),
            KeyCode::Home | KeyCode::Char('g') => {
                if !self.snapshot.is_empty() {
                    self.table_state.select(Some(0));
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SnapshotUpdated(snapshot) => {
                self.snapshot = Arc::clone(snapshot);
                self.clamp_selection();
            }
            Action::LastUpdate(at) => {
                self.last_update = *at;
            }
            Action::ConnectionChanged(state) => {
                self.connection = *state;
                if *state == ConnectionState::Connected {
                    self.fatal = None;
                }
            }
            Action::ConnectionFatal(reason) => {
                self.fatal = Some(reason.clone());
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(area);

        self.render_header(frame, layout[0]);
        self.render_cards(frame, layout[1]);
        self.render_table(frame, layout[2]);
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &'static str {
        "live"
    }
}
