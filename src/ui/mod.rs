pub mod screens;
pub mod widgets;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::backend::CrosstermBackend;
use ratatui::prelude::*;
use std::io::Stdout;
use std::time::Duration;

use crate::app::{App, ConfirmAction, Screen};
use widgets::centered_rect;

/// Run the TUI application
pub fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|frame| render(app, frame))?;

        // Check for status message expiry
        app.check_status_expiry();

        // Start requests the wizard queued, then apply finished ones
        app.dispatch_wizard_requests();
        app.check_background_results();

        // Poll with timeout to allow periodic checks
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => handle_key(app, key)?,
                Event::Mouse(mouse) => handle_mouse(app, mouse),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

/// Handle mouse input
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match (mouse.kind, &app.screen) {
        (MouseEventKind::ScrollUp, Screen::DeviceList) => app.select_prev(),
        (MouseEventKind::ScrollDown, Screen::DeviceList) => app.select_next(),
        (MouseEventKind::ScrollUp, Screen::FileBrowser) => app.file_browser_prev(),
        (MouseEventKind::ScrollDown, Screen::FileBrowser) => app.file_browser_next(),
        _ => {}
    }
}

/// Render the current screen
fn render(app: &App, frame: &mut Frame) {
    // Device list stays visible under every popup
    screens::device_list::render(app, frame);

    match &app.screen {
        Screen::DeviceList => {}
        Screen::Wizard => screens::device_wizard::render(app, frame),
        Screen::FileBrowser => {
            screens::device_wizard::render(app, frame);
            render_file_browser(app, frame);
        }
        Screen::Confirm(action) => {
            if app.wizard.is_some() {
                screens::device_wizard::render(app, frame);
            }
            render_confirm(action, frame);
        }
        Screen::ErrorDialog => {
            if app.wizard.is_some() {
                screens::device_wizard::render(app, frame);
            }
            render_error_dialog(app, frame);
        }
        Screen::Help => screens::help::render(frame),
    }
}

/// Handle key input
fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global quit with Ctrl+C
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Global quit with q/Q (except in the wizard where q might be typed)
    if (key.code == KeyCode::Char('q') || key.code == KeyCode::Char('Q'))
        && !matches!(app.screen, Screen::Wizard | Screen::FileBrowser)
    {
        app.should_quit = true;
        return Ok(());
    }

    match &app.screen {
        Screen::DeviceList => handle_device_list(app, key),
        Screen::Wizard => screens::device_wizard::handle_key(app, key)?,
        Screen::FileBrowser => handle_file_browser(app, key),
        Screen::Confirm(action) => handle_confirm(app, action.clone(), key),
        Screen::ErrorDialog => handle_error_dialog(app, key),
        Screen::Help => app.pop_screen(),
    }

    Ok(())
}

fn handle_device_list(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev(),
        KeyCode::Char('n') => app.start_wizard(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete_device(),
        KeyCode::Char('?') => app.push_screen(Screen::Help),
        _ => {}
    }
}

fn handle_confirm(app: &mut App, action: ConfirmAction, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('n') => app.pop_screen(),
        KeyCode::Char('y') | KeyCode::Enter => {
            app.pop_screen();
            match action {
                ConfirmAction::DeleteDevice(name) => app.delete_device(&name),
                ConfirmAction::CancelWizard => app.cancel_wizard(),
            }
        }
        _ => {}
    }
}

fn render_confirm(action: &ConfirmAction, frame: &mut Frame) {
    use crate::ui::widgets::ConfirmDialog;

    let (title, message) = match action {
        ConfirmAction::DeleteDevice(name) => (
            "Delete Device",
            format!("Delete {}? It will be removed from the device list.", name),
        ),
        ConfirmAction::CancelWizard => (
            "Cancel",
            "Discard this device and close the wizard?".to_string(),
        ),
    };

    ConfirmDialog::new(title, &message).render(frame.area(), frame.buffer_mut());
}

fn render_file_browser(app: &App, frame: &mut Frame) {
    use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

    let area = frame.area();
    let dialog_width = 60.min(area.width.saturating_sub(4));
    let dialog_height = 20.min(area.height.saturating_sub(4));

    let dialog_area = centered_rect(dialog_width, dialog_height, area);
    frame.render_widget(Clear, dialog_area);

    let picker = app.file_browser_filter.map(|f| f.title).unwrap_or("File");
    let title = format!(" Select {} - {} ", picker, app.file_browser_dir.display());
    let block = Block::default()
        .title(title)
        .title_bottom(" [Enter] Open/Select  [Esc] Cancel ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let content_area = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(2),  // Left margin
            Constraint::Min(1),     // Content
            Constraint::Length(2),  // Right margin
        ])
        .split(inner)[1];

    if app.file_browser_entries.is_empty() {
        let msg = Paragraph::new("Nothing to select in this directory.")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(msg, content_area);
        return;
    }

    let items: Vec<ListItem> = app
        .file_browser_entries
        .iter()
        .map(|entry| {
            let prefix = if entry.is_dir { "📁 " } else { "   " };
            ListItem::new(format!("{}{}", prefix, entry.name))
        })
        .collect();

    let mut state = ListState::default();
    state.select(Some(app.file_browser_selected));

    let list = List::new(items)
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, content_area, &mut state);
}

fn handle_file_browser(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.file_browser_done(None),
        KeyCode::Char('j') | KeyCode::Down => app.file_browser_next(),
        KeyCode::Char('k') | KeyCode::Up => app.file_browser_prev(),
        KeyCode::Enter => {
            // Directories are entered in place
            if let Some(path) = app.file_browser_enter() {
                app.file_browser_done(Some(path));
            }
        }
        _ => {}
    }
}

fn render_error_dialog(app: &App, frame: &mut Frame) {
    use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

    let area = frame.area();
    let dialog_width = 80.min(area.width.saturating_sub(4));
    let dialog_height = 20.min(area.height.saturating_sub(4));

    let dialog_area = centered_rect(dialog_width, dialog_height, area);
    frame.render_widget(Clear, dialog_area);

    let block = Block::default()
        .title(" ⚠ Error ")
        .title_bottom(" [↑/↓ or j/k] Scroll  [Enter/Esc] Close ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let error_text = app.error_detail.as_deref().unwrap_or("No error details");
    let paragraph = Paragraph::new(error_text)
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .scroll((app.error_scroll, 0));
    frame.render_widget(paragraph, inner);
}

fn handle_error_dialog(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            app.error_detail = None;
            app.error_scroll = 0;
            app.pop_screen();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.error_scroll = app.error_scroll.saturating_add(1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}
