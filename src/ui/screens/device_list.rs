use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::app::App;
use crate::devices::DeviceSettings;
use crate::ui::widgets::DeviceListWidget;

/// Render the device list screen
pub fn render(app: &App, frame: &mut Frame) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Title
            Constraint::Min(10),    // Main content
            Constraint::Length(3),  // Status/help bar
        ])
        .split(area);

    render_title(app, chunks[0], frame);

    // Device list on the left, details on the right
    let main_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    DeviceListWidget::new(app.devices.devices(), app.selected_device)
        .render(main_chunks[0], frame.buffer_mut());
    render_details(app.selected_device(), main_chunks[1], frame);

    render_help_bar(app, chunks[2], frame);
}

fn render_title(app: &App, area: Rect, frame: &mut Frame) {
    let remote = match app.config.remote_servers.len() {
        0 => "no remote servers".to_string(),
        1 => "1 remote server".to_string(),
        n => format!("{} remote servers", n),
    };

    let title = Paragraph::new(vec![Line::from(vec![
        Span::styled(
            " Device Wizard ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("(local server {}, {})", app.config.local_server, remote),
            Style::default().fg(Color::Gray),
        ),
    ])])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);

    frame.render_widget(title, area);
}

fn render_details(device: Option<&DeviceSettings>, area: Rect, frame: &mut Frame) {
    let block = Block::default()
        .title(" Details ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let Some(device) = device else {
        let empty = Paragraph::new("No devices yet. Press [n] to create an IOU device.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    };

    let mut lines = settings_lines(device);
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Initial config",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    )));
    lines.extend(
        device
            .initial_config
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Gray)))),
    );

    let para = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(para, area);
}

/// Summary lines for a device, shared with the wizard's review page
pub fn settings_lines(device: &DeviceSettings) -> Vec<Line<'static>> {
    let row = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:16}", label), Style::default().fg(Color::Yellow)),
            Span::raw(value),
        ])
    };

    vec![
        row("Name:", device.name.clone()),
        row("Server:", device.server.clone()),
        row("Image:", device.image.clone()),
        row("Path:", device.path.clone()),
        row("Category:", device.category.to_string()),
        row(
            "Adapters:",
            format!(
                "{} ethernet, {} serial",
                device.ethernet_adapters, device.serial_adapters
            ),
        ),
        row("Symbol:", device.default_symbol.clone()),
        row("Hover symbol:", device.hover_symbol.clone()),
    ]
}

fn render_help_bar(app: &App, area: Rect, frame: &mut Frame) {
    let mut hints = vec![
        Span::styled(" [n]", Style::default().fg(Color::Yellow)),
        Span::raw(" New IOU device "),
        Span::styled(" [d]", Style::default().fg(Color::Yellow)),
        Span::raw(" Delete "),
        Span::styled(" [?]", Style::default().fg(Color::Yellow)),
        Span::raw(" Help "),
        Span::styled(" [q]", Style::default().fg(Color::Yellow)),
        Span::raw(" Quit "),
    ];

    // Status message overrides the hints
    if let Some(ref msg) = app.status_message {
        hints.clear();
        hints.push(Span::styled(msg.clone(), Style::default().fg(Color::Green)));
    }

    let help = Paragraph::new(Line::from(hints))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .alignment(Alignment::Center);

    frame.render_widget(help, area);
}
