//! Register screen: form for adding an HVAC unit.
//!
//! The device-id field is bound to a `DebouncedValidator` that is only
//! enabled for protocols whose ids must be unique (BACnet). For those the
//! form can only be submitted once the id is confirmed available.

use std::sync::Arc;

use bmsdash_core::{
    AvailabilityState, ConfigApiClient, DebouncedValidator, HvacUnitConfig, Protocol,
    ValidatorOptions,
};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use tui_input::{Input, InputRequest};

use crate::action::Action;
use crate::component::Component;
use crate::theme;

const SAVED_MESSAGE: &str = "HVAC unit configuration saved successfully.";
const LABEL_WIDTH: u16 = 20;

// ── Types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DeviceId,
    UnitName,
    Building,
    Floor,
    Room,
    Protocol,
    BacnetInstance,
    ModbusHost,
    ModbusPort,
    ModbusUnitId,
}

impl Field {
    /// Tab order.
    const ALL: [Field; 10] = [
        Self::DeviceId,
        Self::UnitName,
        Self::Building,
        Self::Floor,
        Self::Room,
        Self::Protocol,
        Self::BacnetInstance,
        Self::ModbusHost,
        Self::ModbusPort,
        Self::ModbusUnitId,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::DeviceId => "Device ID",
            Self::UnitName => "Unit name",
            Self::Building => "Building",
            Self::Floor => "Floor",
            Self::Room => "Room",
            Self::Protocol => "Protocol",
            Self::BacnetInstance => "BACnet instance",
            Self::ModbusHost => "Modbus host",
            Self::ModbusPort => "Modbus port",
            Self::ModbusUnitId => "Modbus unit id",
        }
    }

    fn visible_for(self, protocol: Protocol) -> bool {
        match self {
            Self::BacnetInstance => protocol == Protocol::Bacnet,
            Self::ModbusHost | Self::ModbusPort | Self::ModbusUnitId => {
                protocol == Protocol::Modbus
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormState {
    Editing,
    Saving,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Notice {
    Success(String),
    Error(String),
}

#[derive(Default)]
struct Inputs {
    device_id: Input,
    unit_name: Input,
    building: Input,
    floor: Input,
    room: Input,
    bacnet_instance: Input,
    modbus_host: Input,
    modbus_port: Input,
    modbus_unit_id: Input,
}

impl Inputs {
    fn get(&self, field: Field) -> Option<&Input> {
        match field {
            Field::DeviceId => Some(&self.device_id),
            Field::UnitName => Some(&self.unit_name),
            Field::Building => Some(&self.building),
            Field::Floor => Some(&self.floor),
            Field::Room => Some(&self.room),
            Field::BacnetInstance => Some(&self.bacnet_instance),
            Field::ModbusHost => Some(&self.modbus_host),
            Field::ModbusPort => Some(&self.modbus_port),
            Field::ModbusUnitId => Some(&self.modbus_unit_id),
            Field::Protocol => None,
        }
    }

    fn get_mut(&mut self, field: Field) -> Option<&mut Input> {
        match field {
            Field::DeviceId => Some(&mut self.device_id),
            Field::UnitName => Some(&mut self.unit_name),
            Field::Building => Some(&mut self.building),
            Field::Floor => Some(&mut self.floor),
            Field::Room => Some(&mut self.room),
            Field::BacnetInstance => Some(&mut self.bacnet_instance),
            Field::ModbusHost => Some(&mut self.modbus_host),
            Field::ModbusPort => Some(&mut self.modbus_port),
            Field::ModbusUnitId => Some(&mut self.modbus_unit_id),
            Field::Protocol => None,
        }
    }
}

fn optional(input: &Input) -> Option<String> {
    let value = input.value().trim();
    (!value.is_empty()).then(|| value.to_owned())
}

fn parse_optional<T: std::str::FromStr>(input: &Input, message: &str) -> Result<Option<T>, String> {
    optional(input)
        .map(|v| v.parse::<T>().map_err(|_| message.to_owned()))
        .transpose()
}

fn edit_request(key: KeyEvent) -> Option<InputRequest> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('u') => Some(InputRequest::DeleteLine),
            KeyCode::Char('w') => Some(InputRequest::DeletePrevWord),
            _ => None,
        };
    }
    match key.code {
        KeyCode::Char(c) => Some(InputRequest::InsertChar(c)),
        KeyCode::Backspace => Some(InputRequest::DeletePrevChar),
        KeyCode::Delete => Some(InputRequest::DeleteNextChar),
        KeyCode::Left => Some(InputRequest::GoToPrevChar),
        KeyCode::Right => Some(InputRequest::GoToNextChar),
        KeyCode::Home => Some(InputRequest::GoToStart),
        KeyCode::End => Some(InputRequest::GoToEnd),
        _ => None,
    }
}

async fn save_unit(client: &ConfigApiClient, unit: &HvacUnitConfig) -> Result<HvacUnitConfig, String> {
    // The id may have been taken since the last debounced check.
    if unit.protocol.requires_unique_device_id()
        && client
            .device_id_exists(unit.protocol, &unit.device_id)
            .await
            .map_err(|e| e.to_string())?
    {
        return Err("Device ID already exists.".into());
    }
    client.create_config(unit).await.map_err(|e| e.to_string())
}

// ── Component ────────────────────────────────────────────────────────

pub struct RegisterScreen {
    focused: bool,
    action_tx: Option<UnboundedSender<Action>>,
    client: Option<Arc<ConfigApiClient>>,
    validator_options: ValidatorOptions,
    validator: Option<DebouncedValidator>,
    availability: AvailabilityState,
    state: FormState,
    active_field: Field,
    protocol: Protocol,
    inputs: Inputs,
    notice: Option<Notice>,
    throbber_state: throbber_widgets_tui::ThrobberState,
}

impl RegisterScreen {
    /// `client` is `None` when no REST endpoint could be built; the form
    /// still renders but cannot check or save.
    pub fn new(client: Option<Arc<ConfigApiClient>>, validator_options: ValidatorOptions) -> Self {
        Self {
            focused: false,
            action_tx: None,
            client,
            validator_options,
            validator: None,
            availability: AvailabilityState::Idle,
            state: FormState::Editing,
            active_field: Field::DeviceId,
            protocol: Protocol::default(),
            inputs: Inputs::default(),
            notice: None,
            throbber_state: throbber_widgets_tui::ThrobberState::default(),
        }
    }

    fn validation_enabled(&self) -> bool {
        self.protocol.requires_unique_device_id()
    }

    /// Required fields present and, where the protocol needs it, the
    /// device id confirmed free.
    fn can_submit(&self) -> bool {
        self.state == FormState::Editing
            && optional(&self.inputs.device_id).is_some()
            && optional(&self.inputs.unit_name).is_some()
            && (!self.validation_enabled() || self.availability.can_save())
    }

    fn visible_fields(&self) -> impl Iterator<Item = Field> + '_ {
        Field::ALL
            .into_iter()
            .filter(|f| f.visible_for(self.protocol))
    }

    fn focus_next(&mut self) {
        let fields: Vec<Field> = self.visible_fields().collect();
        let idx = fields.iter().position(|&f| f == self.active_field).unwrap_or(0);
        self.active_field = fields[(idx + 1) % fields.len()];
    }

    fn focus_prev(&mut self) {
        let fields: Vec<Field> = self.visible_fields().collect();
        let idx = fields.iter().position(|&f| f == self.active_field).unwrap_or(0);
        self.active_field = fields[(idx + fields.len() - 1) % fields.len()];
    }

    fn cycle_protocol(&mut self, forward: bool) {
        let all = Protocol::ALL;
        let idx = all.iter().position(|&p| p == self.protocol).unwrap_or(0);
        let next = if forward {
            (idx + 1) % all.len()
        } else {
            (idx + all.len() - 1) % all.len()
        };
        self.set_protocol(all[next]);
    }

    fn set_protocol(&mut self, protocol: Protocol) {
        self.protocol = protocol;
        if let Some(ref validator) = self.validator {
            validator.set_protocol(Some(protocol));
            validator.set_enabled(protocol.requires_unique_device_id());
        }
        if !protocol.requires_unique_device_id() {
            self.availability = AvailabilityState::Idle;
        }
        debug!(%protocol, "protocol selected");
    }

    fn device_id_changed(&mut self) {
        if let Some(ref validator) = self.validator {
            validator.set_input(self.inputs.device_id.value());
        }
    }

    /// Build the record to submit, or a message naming the first problem.
    fn build_unit(&self) -> Result<HvacUnitConfig, String> {
        let device_id = optional(&self.inputs.device_id).ok_or("Device ID is required.")?;
        let unit_name = optional(&self.inputs.unit_name).ok_or("Unit name is required.")?;

        let mut unit = HvacUnitConfig {
            device_id,
            unit_name,
            building: optional(&self.inputs.building),
            floor: optional(&self.inputs.floor),
            room: optional(&self.inputs.room),
            protocol: self.protocol,
            enabled: true,
            ..HvacUnitConfig::default()
        };

        match self.protocol {
            Protocol::Bacnet => {
                let instance = parse_optional::<u32>(
                    &self.inputs.bacnet_instance,
                    "BACnet instance must be a whole number.",
                )?;
                unit.bacnet_device_instance = instance.or_else(|| unit.device_id.parse().ok());
            }
            Protocol::Modbus => {
                unit.modbus_host = optional(&self.inputs.modbus_host);
                unit.modbus_port = parse_optional::<u16>(
                    &self.inputs.modbus_port,
                    "Modbus port must be between 0 and 65535.",
                )?;
                unit.modbus_unit_id = parse_optional::<u8>(
                    &self.inputs.modbus_unit_id,
                    "Modbus unit id must be between 0 and 255.",
                )?;
            }
            Protocol::Simulator => {}
        }

        Ok(unit)
    }

    fn submit(&mut self) {
        if !self.can_submit() {
            let message = match self.build_unit() {
                Err(message) => message,
                Ok(_) => "Device ID must be confirmed available before saving.".into(),
            };
            self.notice = Some(Notice::Error(message));
            return;
        }

        let unit = match self.build_unit() {
            Ok(unit) => unit,
            Err(message) => {
                self.notice = Some(Notice::Error(message));
                return;
            }
        };

        let Some(client) = self.client.clone() else {
            self.notice = Some(Notice::Error("No backend configured.".into()));
            return;
        };
        let Some(tx) = self.action_tx.clone() else {
            return;
        };

        self.state = FormState::Saving;
        self.notice = None;
        info!(device_id = %unit.device_id, protocol = %unit.protocol, "submitting unit");

        tokio::spawn(async move {
            let result = save_unit(&client, &unit).await;
            let _ = tx.send(Action::UnitSaved(result));
        });
    }

    fn reset(&mut self) {
        self.inputs = Inputs::default();
        self.active_field = Field::DeviceId;
        self.device_id_changed();
    }

    // ── Rendering ────────────────────────────────────────────────────

    fn render_panel(&self, frame: &mut Frame, area: Rect) -> Rect {
        let panel_w = 64u16.min(area.width.saturating_sub(2));
        let panel_h = 22u16.min(area.height);
        let x = area.x + (area.width.saturating_sub(panel_w)) / 2;
        let y = area.y + (area.height.saturating_sub(panel_h)) / 2;
        let panel = Rect::new(x, y, panel_w, panel_h);

        let block = Block::default()
            .title(Span::styled(" Register HVAC Unit ", theme::title_style()))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.focused {
                theme::border_focused()
            } else {
                theme::border_default()
            })
            .style(Style::default().bg(theme::BG_PANEL));

        let inner = block.inner(panel);
        frame.render_widget(block, panel);
        inner
    }

    fn render_field(&self, frame: &mut Frame, area: Rect, field: Field) {
        let active = field == self.active_field && self.state == FormState::Editing;
        let label_style = if active {
            Style::default().fg(theme::ACCENT).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme::TEXT)
        };
        let [label_area, value_area] =
            Layout::horizontal([Constraint::Length(LABEL_WIDTH), Constraint::Min(1)]).areas(area);

        let marker = if active { "› " } else { "  " };
        frame.render_widget(
            Paragraph::new(Span::styled(format!("{marker}{}", field.label()), label_style)),
            label_area,
        );

        let value_style = if active {
            Style::default().fg(theme::ACCENT).bg(theme::BG_SELECTED)
        } else {
            Style::default().fg(theme::TEXT)
        };

        if let Some(input) = self.inputs.get(field) {
            let width = usize::from(value_area.width.max(1));
            let scroll = input.visual_scroll(width.saturating_sub(1));
            let shown: String = input.value().chars().skip(scroll).collect();
            frame.render_widget(
                Paragraph::new(Span::styled(shown, value_style)),
                value_area,
            );
            if active && self.focused {
                let offset = input.visual_cursor().saturating_sub(scroll);
                let offset = u16::try_from(offset).unwrap_or(u16::MAX);
                frame.set_cursor_position((
                    value_area.x + offset.min(value_area.width.saturating_sub(1)),
                    value_area.y,
                ));
            }
        } else {
            let text = format!("◂ {} ▸", self.protocol.label());
            frame.render_widget(
                Paragraph::new(Span::styled(text, value_style)),
                value_area,
            );
        }
    }

    fn render_availability(&self, frame: &mut Frame, area: Rect) {
        if !self.validation_enabled() {
            return;
        }
        let [_, status_area] =
            Layout::horizontal([Constraint::Length(LABEL_WIDTH), Constraint::Min(1)]).areas(area);

        let (text, style) = match &self.availability {
            AvailabilityState::Idle => return,
            AvailabilityState::Checking => {
                let throbber = throbber_widgets_tui::Throbber::default()
                    .label("Checking...")
                    .style(theme::key_hint())
                    .throbber_style(Style::default().fg(theme::ACCENT));
                frame.render_stateful_widget(
                    throbber,
                    status_area,
                    &mut self.throbber_state.clone(),
                );
                return;
            }
            AvailabilityState::Available => ("Device ID is available.", theme::success_text()),
            AvailabilityState::Taken => ("Device ID already exists.", theme::error_text()),
            AvailabilityState::Error(_) => ("Error checking Device ID.", theme::error_text()),
        };
        frame.render_widget(Paragraph::new(Span::styled(text, style)), status_area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let [notice_area, button_area, hint_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(area);

        if let Some(ref notice) = self.notice {
            let (text, style) = match notice {
                Notice::Success(text) => (text.as_str(), theme::success_text()),
                Notice::Error(text) => (text.as_str(), theme::error_text()),
            };
            frame.render_widget(
                Paragraph::new(Span::styled(text, style)).alignment(Alignment::Center),
                notice_area,
            );
        }

        let button = match self.state {
            FormState::Saving => Span::styled("[ Saving... ]", theme::key_hint()),
            FormState::Editing if self.can_submit() => Span::styled(
                "[ Save unit ]",
                Style::default()
                    .fg(theme::BG_PANEL)
                    .bg(theme::OK_GREEN)
                    .add_modifier(Modifier::BOLD),
            ),
            FormState::Editing => Span::styled("[ Save unit ]", theme::key_hint()),
        };
        frame.render_widget(
            Paragraph::new(Line::from(button)).alignment(Alignment::Center),
            button_area,
        );

        let hints = if self.active_field == Field::Protocol {
            "◂/▸ protocol  Tab next  Enter save  Esc back"
        } else {
            "Tab next  Shift+Tab prev  Enter save  Esc back"
        };
        frame.render_widget(
            Paragraph::new(Span::styled(hints, theme::key_hint())).alignment(Alignment::Center),
            hint_area,
        );
    }
}

// ── Component impl ───────────────────────────────────────────────────

impl Component for RegisterScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        if let Some(ref client) = self.client {
            let options = ValidatorOptions {
                protocol: Some(self.protocol),
                enabled: self.validation_enabled(),
                ..self.validator_options.clone()
            };
            let validator = DebouncedValidator::spawn(Arc::clone(client), options);

            let mut states = validator.subscribe();
            let tx = action_tx.clone();
            tokio::spawn(async move {
                while states.changed().await.is_ok() {
                    let state = states.borrow_and_update().clone();
                    if tx.send(Action::AvailabilityChanged(state)).is_err() {
                        break;
                    }
                }
            });

            self.validator = Some(validator);
        } else {
            warn!("no REST client; device ids will not be checked");
        }
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.state == FormState::Saving {
            return Ok(None);
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.focus_next(),
            KeyCode::BackTab | KeyCode::Up => self.focus_prev(),
            KeyCode::Enter => self.submit(),
            _ if self.active_field == Field::Protocol => match key.code {
                KeyCode::Left | KeyCode::Char('h') => self.cycle_protocol(false),
                KeyCode::Right | KeyCode::Char('l' | ' ') => self.cycle_protocol(true),
                _ => {}
            },
            _ => {
                let field = self.active_field;
                let changed = match (edit_request(key), self.inputs.get_mut(field)) {
                    (Some(request), Some(input)) => {
                        input.handle(request).is_some_and(|change| change.value)
                    }
                    _ => false,
                };
                if changed {
                    self.notice = None;
                    if field == Field::DeviceId {
                        self.device_id_changed();
                    }
                }
            }
        }

        Ok(None)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::AvailabilityChanged(state) => {
                self.availability = state.clone();
            }
            Action::UnitSaved(Ok(unit)) => {
                info!(id = ?unit.id, device_id = %unit.device_id, "unit registered");
                self.state = FormState::Editing;
                self.notice = Some(Notice::Success(SAVED_MESSAGE.into()));
                self.reset();
            }
            Action::UnitSaved(Err(message)) => {
                warn!(%message, "unit registration failed");
                self.state = FormState::Editing;
                self.notice = Some(Notice::Error(format!("Could not save unit: {message}")));
            }
            Action::Tick => {
                if self.availability == AvailabilityState::Checking {
                    self.throbber_state.calc_next();
                }
            }
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = self.render_panel(frame, area);

        let fields: Vec<Field> = self.visible_fields().collect();
        let mut constraints = vec![Constraint::Length(1)];
        for field in &fields {
            constraints.push(Constraint::Length(1));
            if *field == Field::DeviceId {
                constraints.push(Constraint::Length(1));
            }
        }
        constraints.push(Constraint::Min(0));
        constraints.push(Constraint::Length(3));
        let rows = Layout::vertical(constraints).split(inner);

        let mut row = 1;
        for field in fields {
            self.render_field(frame, rows[row], field);
            row += 1;
            if field == Field::DeviceId {
                self.render_availability(frame, rows[row]);
                row += 1;
            }
        }

        self.render_footer(frame, rows[rows.len() - 1]);
    }

    fn captures_text(&self) -> bool {
        true
    }

    fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
    }

    fn id(&self) -> &'static str {
        "register"
    }
}
