//! Palette and semantic styles.

use ratatui::style::{Color, Modifier, Style};

use bmsdash_core::ConnectionState;

// ── Palette ───────────────────────────────────────────────────────────

pub const ACCENT: Color = Color::Rgb(97, 175, 239); // #61afef
pub const TEAL: Color = Color::Rgb(86, 182, 194); // #56b6c2
pub const OK_GREEN: Color = Color::Rgb(152, 195, 121); // #98c379
pub const WARN_AMBER: Color = Color::Rgb(229, 192, 123); // #e5c07b
pub const FAULT_RED: Color = Color::Rgb(224, 108, 117); // #e06c75
pub const TEXT: Color = Color::Rgb(200, 204, 212); // #c8ccd4
pub const MUTED: Color = Color::Rgb(92, 99, 112); // #5c6370
pub const BG_PANEL: Color = Color::Rgb(33, 37, 43); // #21252b
pub const BG_SELECTED: Color = Color::Rgb(44, 49, 58); // #2c313a

// ── Styles ────────────────────────────────────────────────────────────

pub fn title_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn border_focused() -> Style {
    Style::default().fg(ACCENT)
}

pub fn border_default() -> Style {
    Style::default().fg(MUTED)
}

pub fn table_header() -> Style {
    Style::default()
        .fg(TEAL)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
}

pub fn table_row() -> Style {
    Style::default().fg(TEXT)
}

pub fn table_selected() -> Style {
    Style::default()
        .fg(ACCENT)
        .bg(BG_SELECTED)
        .add_modifier(Modifier::BOLD)
}

pub fn tab_active() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn tab_inactive() -> Style {
    Style::default().fg(TEXT)
}

pub fn key_hint() -> Style {
    Style::default().fg(MUTED)
}

pub fn error_text() -> Style {
    Style::default().fg(FAULT_RED)
}

pub fn success_text() -> Style {
    Style::default().fg(OK_GREEN)
}

/// Badge color for a connection state.
pub fn connection_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Connected => OK_GREEN,
        ConnectionState::Connecting => WARN_AMBER,
        ConnectionState::Disconnected => FAULT_RED,
    }
}
