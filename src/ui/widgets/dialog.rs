//! Dialog widgets for the TUI

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::wizard::DialogLevel;

/// Confirmation dialog widget
pub struct ConfirmDialog<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub confirm_label: &'a str,
    pub cancel_label: &'a str,
}

impl<'a> ConfirmDialog<'a> {
    pub fn new(title: &'a str, message: &'a str) -> Self {
        Self {
            title,
            message,
            confirm_label: "Yes (y)",
            cancel_label: "No (n)",
        }
    }

    pub fn render(self, area: Rect, buf: &mut Buffer) {
        let dialog_area = centered_rect(50.min(area.width.saturating_sub(4)), 8.min(area.height.saturating_sub(4)), area);
        let inner = dialog_frame(self.title, Color::Yellow, dialog_area, buf);

        // Split into message and buttons
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(2), Constraint::Length(2)])
            .split(inner);

        Paragraph::new(self.message)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);

        let buttons = Line::from(vec![
            Span::styled(
                format!(" {} ", self.confirm_label),
                Style::default().fg(Color::Green),
            ),
            Span::raw("  "),
            Span::styled(
                format!(" {} ", self.cancel_label),
                Style::default().fg(Color::Red),
            ),
        ]);
        Paragraph::new(buttons)
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }
}

/// Modal message raised by the wizard (critical error or warning)
pub struct MessageDialog<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub level: DialogLevel,
}

impl<'a> MessageDialog<'a> {
    pub fn new(title: &'a str, message: &'a str, level: DialogLevel) -> Self {
        Self {
            title,
            message,
            level,
        }
    }

    pub fn render(self, area: Rect, buf: &mut Buffer) {
        let (color, icon) = match self.level {
            DialogLevel::Critical => (Color::Red, "✖"),
            DialogLevel::Warning => (Color::Yellow, "⚠"),
        };
        let title = format!("{} {}", icon, self.title);
        let dialog_area = centered_rect(60.min(area.width.saturating_sub(4)), 9.min(area.height.saturating_sub(4)), area);
        let inner = dialog_frame(&title, color, dialog_area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(2), Constraint::Length(1)])
            .split(inner);

        Paragraph::new(self.message)
            .style(Style::default().fg(Color::White))
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);
        Paragraph::new("[Enter] OK")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }
}

/// Shown while an image list request is pending
pub struct ProgressDialog<'a> {
    pub message: &'a str,
}

impl<'a> ProgressDialog<'a> {
    pub fn new(message: &'a str) -> Self {
        Self { message }
    }

    pub fn render(self, area: Rect, buf: &mut Buffer) {
        let dialog_area = centered_rect(50.min(area.width.saturating_sub(4)), 6.min(area.height.saturating_sub(4)), area);
        let inner = dialog_frame("Please wait", Color::Cyan, dialog_area, buf);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        Paragraph::new(self.message)
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center)
            .render(chunks[0], buf);
        Paragraph::new("[Esc] Cancel")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }
}

/// Clear the area and draw the bordered box; returns the inner area
fn dialog_frame(title: &str, color: Color, area: Rect, buf: &mut Buffer) -> Rect {
    Clear.render(area, buf);

    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(area);
    block.render(area, buf);
    inner
}

/// Helper to create a centered rectangle
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
