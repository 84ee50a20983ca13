//! Application core: event loop, screen management, action dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs},
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bmsdash_core::{ConnectionState, DashboardConfig};

use crate::action::Action;
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::theme;
use crate::tui::Tui;

const HELP: [(&str, &str); 8] = [
    ("1 / 2", "Live telemetry / register unit"),
    ("Tab", "Next screen (Live)"),
    ("j / k", "Move selection (Live)"),
    ("Tab / Shift+Tab", "Next / previous field (Register)"),
    ("◂ / ▸", "Change protocol (Register)"),
    ("Enter", "Save unit (Register)"),
    ("Esc", "Back to Live"),
    ("q / Ctrl+C", "Quit"),
];

pub struct App {
    config: DashboardConfig,
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    running: bool,
    connection: ConnectionState,
    help_visible: bool,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Cancels the data bridge, which unmounts the live view.
    data_cancel: CancellationToken,
}

impl App {
    pub fn new(config: DashboardConfig) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        let client = match config.config_client() {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "REST client unavailable; registration disabled");
                None
            }
        };
        let screens = create_screens(client, config.validator_options())
            .into_iter()
            .collect();

        Self {
            config,
            active_screen: ScreenId::Live,
            screens,
            running: true,
            connection: ConnectionState::Disconnected,
            help_visible: false,
            action_tx,
            action_rx,
            data_cancel: CancellationToken::new(),
        }
    }

    fn init_screens(&mut self) -> Result<()> {
        for screen in self.screens.values_mut() {
            screen.init(self.action_tx.clone())?;
        }
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
        Ok(())
    }

    fn spawn_data_bridge(&self) -> JoinHandle<()> {
        let config = self.config.clone();
        let tx = self.action_tx.clone();
        let cancel = self.data_cancel.clone();
        tokio::spawn(async move {
            crate::data_bridge::spawn_data_bridge(config, tx, cancel).await;
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.init_screens()?;
        let bridge = self.spawn_data_bridge();

        let mut events = EventReader::new(
            Duration::from_millis(250), // throbber
            Duration::from_millis(50),  // redraw
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        events.stop();
        self.data_cancel.cancel();
        if let Err(e) = bridge.await {
            warn!(error = %e, "data bridge ended abnormally");
        }
        tui.exit();
        info!("TUI event loop ended");
        Ok(())
    }

    fn active_captures_text(&self) -> bool {
        self.screens
            .get(&self.active_screen)
            .is_some_and(|s| s.captures_text())
    }

    /// Global keys first; the rest goes to the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        if self.active_captures_text() {
            if key.code == KeyCode::Esc {
                return Ok(Some(Action::SwitchScreen(ScreenId::Live)));
            }
        } else {
            match (key.modifiers, key.code) {
                (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
                (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char('?')) => {
                    return Ok(Some(Action::ToggleHelp));
                }
                (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='9')) => {
                    let n = u8::try_from(c).map_or(0, |b| b - b'0');
                    if let Some(screen) = ScreenId::from_number(n) {
                        return Ok(Some(Action::SwitchScreen(screen)));
                    }
                }
                (KeyModifiers::NONE, KeyCode::Tab) => {
                    return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
                }
                _ => {}
            }
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }
        Ok(None)
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!(from = %self.active_screen, to = %target, "switching screen");
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                }
            }

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::Render | Action::Resize(..) => {}

            other => {
                if let Action::ConnectionChanged(state) = other {
                    self.connection = *state;
                }

                let mut follow_ups = Vec::new();
                if other.is_broadcast() {
                    for screen in self.screens.values_mut() {
                        follow_ups.extend(screen.update(other)?);
                    }
                } else if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                    follow_ups.extend(screen.update(other)?);
                }
                for follow_up in follow_ups {
                    self.action_tx.send(follow_up)?;
                }
            }
        }

        Ok(())
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let [content_area, tab_area, status_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, content_area);
        }
        self.render_tab_bar(frame, tab_area);
        self.render_status_bar(frame, status_area);

        if self.help_visible {
            render_help_overlay(frame, area);
        }
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                Line::from(Span::styled(format!(" {} {} ", id.number(), id.label()), style))
            })
            .collect();

        let selected = ScreenId::ALL
            .iter()
            .position(|&s| s == self.active_screen)
            .unwrap_or(0);
        let tabs = Tabs::new(titles)
            .divider(Span::styled("│", theme::key_hint()))
            .select(selected);

        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let (symbol, label) = match self.connection {
            ConnectionState::Connected => ("●", "connected"),
            ConnectionState::Connecting => ("◐", "connecting"),
            ConnectionState::Disconnected => ("○", "disconnected"),
        };
        let indicator = Span::styled(
            format!("{symbol} {label}"),
            Style::default().fg(theme::connection_color(self.connection)),
        );
        let endpoint = Span::styled(format!("  {}", self.config.ws_url), theme::key_hint());
        let hints = Span::styled(" │ ? help  q quit", theme::key_hint());

        let line = Line::from(vec![Span::raw(" "), indicator, endpoint, hints]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let width = 56u16.min(area.width.saturating_sub(4));
    let height = 12u16.min(area.height.saturating_sub(2));
    let help_area = Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    );

    let block = Block::default()
        .title(" Keyboard Shortcuts ")
        .title_style(theme::title_style())
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(theme::border_focused());

    let lines: Vec<Line> = HELP
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("  {key:<16}"), theme::title_style()),
                Span::styled(*what, theme::table_row()),
            ])
        })
        .collect();

    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(lines).block(block), help_area);
}
