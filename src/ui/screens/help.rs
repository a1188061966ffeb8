use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::ui::widgets::centered_rect;

/// Render the help screen
pub fn render(frame: &mut Frame) {
    let area = frame.area();
    let dialog_width = 55.min(area.width.saturating_sub(4));
    let dialog_height = 30.min(area.height.saturating_sub(4));

    let dialog_area = centered_rect(dialog_width, dialog_height, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" Help - Key Bindings ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let help_text = vec![
        section("Devices"),
        Line::from(""),
        key_line("j / Down", "Move selection down"),
        key_line("k / Up", "Move selection up"),
        key_line("n", "New IOU device"),
        key_line("d", "Delete selected device"),
        Line::from(""),
        section("Wizard"),
        Line::from(""),
        key_line("j / k", "Move between fields"),
        key_line("Left / Right", "Change the focused value"),
        key_line("Space", "Toggle"),
        key_line("Enter", "Edit text field / Next page"),
        key_line("b", "Browse for a local image"),
        key_line("Esc", "Previous page / Cancel"),
        Line::from(""),
        section("General"),
        Line::from(""),
        key_line("?", "Show this help"),
        key_line("q", "Quit application"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    frame.render_widget(Paragraph::new(help_text), inner);
}

fn section(title: &str) -> Line<'_> {
    Line::from(Span::styled(
        title,
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

fn key_line<'a>(key: &'a str, description: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(
            format!("  {:14}", key),
            Style::default().fg(Color::Green),
        ),
        Span::raw(description),
    ])
}
