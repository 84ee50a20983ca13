//! Summary card: a bordered box with a caption and one large value.

use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph, Widget};

use crate::theme;

pub struct StatCard<'a> {
    caption: &'a str,
    value: String,
    accent: Color,
}

impl<'a> StatCard<'a> {
    pub fn new(caption: &'a str, value: impl Into<String>) -> Self {
        Self {
            caption,
            value: value.into(),
            accent: theme::ACCENT,
        }
    }

    pub fn accent(mut self, color: Color) -> Self {
        self.accent = color;
        self
    }
}

impl Widget for StatCard<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default())
            .title(Span::styled(format!(" {} ", self.caption), theme::key_hint()));

        let value = Line::from(Span::styled(
            self.value,
            Style::default().fg(self.accent).add_modifier(Modifier::BOLD),
        ));

        Paragraph::new(value)
            .alignment(Alignment::Center)
            .block(block)
            .render(area, buf);
    }
}

/// `"--"` when there is nothing to average.
pub fn format_temperature(value: Option<f64>) -> String {
    value.map_or_else(|| "--".into(), |t| format!("{t:.1}°C"))
}
