//! IOU device wizard screen
//!
//! Three pages: server, name and image, review. Field focus moves with
//! j/k, values change with Left/Right or Space, Enter edits text fields or
//! advances.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    prelude::*,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::App;
use crate::devices::DeviceSettings;
use crate::servers::ServerChoice;
use crate::ui::screens::device_list::settings_lines;
use crate::ui::widgets::{centered_rect, MessageDialog, ProgressDialog};
use crate::wizard::visibility::Visibility;
use crate::wizard::{
    DeviceKind, DeviceWizard, ImageSource, IouDevice, WizardError, WizardPage,
};

/// Focusable controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    ServerType,
    LoadBalance,
    RemoteServer,
    Name,
    ImageSource,
    Image,
    ImageType,
}

/// Controls of the current page that can take focus
fn page_fields(wizard: &DeviceWizard<IouDevice>) -> Vec<Field> {
    match wizard.page() {
        WizardPage::Server => {
            let vis = wizard.visibility();
            let mut fields = vec![Field::ServerType];
            if vis.remote_group_enabled {
                fields.push(Field::LoadBalance);
            }
            if vis.remote_chooser_enabled {
                fields.push(Field::RemoteServer);
            }
            fields
        }
        WizardPage::NameAndImage => vec![
            Field::Name,
            Field::ImageSource,
            Field::Image,
            Field::ImageType,
        ],
        WizardPage::Review => Vec::new(),
    }
}

fn focused_field(focus: usize, wizard: &DeviceWizard<IouDevice>) -> Option<Field> {
    let fields = page_fields(wizard);
    fields.get(focus.min(fields.len().saturating_sub(1))).copied()
}

/// Server choices offered on this host
fn server_choices(vis: &Visibility) -> Vec<ServerChoice> {
    let mut choices = Vec::new();
    if vis.local_enabled {
        choices.push(ServerChoice::Local);
    }
    choices.push(ServerChoice::Remote);
    if vis.cloud_visible {
        choices.push(ServerChoice::Cloud);
    }
    choices
}

fn cycle<T: Copy + PartialEq>(options: &[T], current: T, delta: i32) -> Option<T> {
    if options.is_empty() {
        return None;
    }
    let pos = options.iter().position(|o| *o == current).unwrap_or(0) as i32;
    let len = options.len() as i32;
    Some(options[((pos + delta).rem_euclid(len)) as usize])
}

// =============================================================================
// Rendering
// =============================================================================

/// Render the wizard with any pending dialog on top
pub fn render(app: &App, frame: &mut Frame) {
    let Some(ref wizard) = app.wizard else {
        return;
    };
    let area = frame.area();

    let dialog_width = 80.min(area.width.saturating_sub(4));
    let dialog_height = 26.min(area.height.saturating_sub(4));
    let dialog_area = centered_rect(dialog_width, dialog_height, area);
    frame.render_widget(Clear, dialog_area);

    let (pos, total) = wizard.progress();
    let block = Block::default()
        .title(format!(" New IOU device ({}/{}) - {} ", pos, total, wizard.page().title()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .style(Style::default().bg(Color::Black));
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let focus = focused_field(app.wizard_focus, wizard);
    match wizard.page() {
        WizardPage::Server => render_server_page(wizard, focus, frame, inner),
        WizardPage::NameAndImage => render_name_image_page(app, wizard, focus, frame, inner),
        WizardPage::Review => render_review_page(wizard, frame, inner),
    }

    // Modal overlays: message dialogs first, then the progress dialog
    if let Some(dialog) = wizard.pending_dialog() {
        MessageDialog::new(&dialog.title, &dialog.message, dialog.level)
            .render(area, frame.buffer_mut());
    } else if wizard.is_loading() {
        ProgressDialog::new("Retrieving the IOU image list...").render(area, frame.buffer_mut());
    }
}

fn render_server_page(
    wizard: &DeviceWizard<IouDevice>,
    focus: Option<Field>,
    frame: &mut Frame,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),  // Intro
            Constraint::Length(3),  // Server type
            Constraint::Length(3),  // Load balance
            Constraint::Length(3),  // Remote server
            Constraint::Min(1),     // Notes
            Constraint::Length(1),  // Help
        ])
        .split(area);

    let intro = Paragraph::new("Please choose a server type to run your new IOU device.")
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true });
    frame.render_widget(intro, chunks[0]);

    let vis = wizard.visibility();
    let state = wizard.state();

    let choices = server_choices(&vis)
        .iter()
        .map(|c| {
            let mark = if *c == state.server_choice { "(•)" } else { "( )" };
            format!("{} {}", mark, c.label())
        })
        .collect::<Vec<_>>()
        .join("   ");
    render_select_field(frame, chunks[1], "Server type", &choices, focus == Some(Field::ServerType), "←/→ change");

    if vis.remote_group_enabled {
        let checkbox = if state.load_balance { "[x]" } else { "[ ]" };
        render_select_field(
            frame,
            chunks[2],
            "Load balance",
            &format!("{} Automatically choose a remote server", checkbox),
            focus == Some(Field::LoadBalance),
            "Space toggle",
        );

        let remote = wizard
            .core()
            .remote_label()
            .unwrap_or_else(|| "No remote server registered".to_string());
        let value = if vis.remote_chooser_enabled {
            format!("◀ {} ▶", remote)
        } else {
            format!("{} (automatic)", remote)
        };
        render_select_field(frame, chunks[3], "Remote server", &value, focus == Some(Field::RemoteServer), "←/→ change");
    }

    if !vis.local_enabled {
        let note = Paragraph::new("The local server cannot run IOU on this platform.")
            .style(Style::default().fg(Color::DarkGray))
            .wrap(Wrap { trim: true });
        frame.render_widget(note, chunks[4]);
    }

    let help = Paragraph::new("[j/k] Move  [←/→] Change  [Enter] Next  [Esc] Cancel")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[5]);
}

fn render_name_image_page(
    app: &App,
    wizard: &DeviceWizard<IouDevice>,
    focus: Option<Field>,
    frame: &mut Frame,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),  // Name
            Constraint::Length(3),  // Image source
            Constraint::Length(3),  // Image list or path
            Constraint::Length(3),  // Image type
            Constraint::Min(1),     // Image details
            Constraint::Length(1),  // Help
        ])
        .split(area);

    let editing = app.wizard_editing;
    let name = &wizard.state().name;
    let (name_value, placeholder) = if name.is_empty() && !(editing && focus == Some(Field::Name)) {
        ("Enter a name", true)
    } else {
        (name.as_str(), false)
    };
    render_input_field(
        frame,
        chunks[0],
        "Name",
        name_value,
        placeholder,
        focus == Some(Field::Name),
        editing && focus == Some(Field::Name),
    );

    let Some(selector) = wizard.kind().image_selector().and_then(|id| wizard.core().selector(id)) else {
        return;
    };
    let vis = wizard.visibility();
    let selector_vis = vis.selectors.get(selector.id().index()).copied();

    let source = match selector.source() {
        ImageSource::Existing => "(•) Existing image   ( ) New image",
        ImageSource::Manual => "( ) Existing image   (•) New image",
    };
    render_select_field(frame, chunks[1], selector.label(), source, focus == Some(Field::ImageSource), "Space toggle");

    if selector_vis.map(|v| v.image_list).unwrap_or(false) {
        let value = match (selector.current_entry(), selector.current_index()) {
            (Some(entry), Some(index)) => format!(
                "◀ {} ▶  ({}/{})",
                entry.filename,
                index + 1,
                selector.entries().len()
            ),
            _ => "No image on this server".to_string(),
        };
        render_select_field(frame, chunks[2], "Image", &value, focus == Some(Field::Image), "←/→ change");
    } else {
        let browse = selector_vis.map(|v| v.browse).unwrap_or(false);
        let label = if browse { "Image path ([b] Browse)" } else { "Image path on the server" };
        let text = selector.text();
        let field_editing = editing && focus == Some(Field::Image);
        let (value, placeholder) = if text.is_empty() && !field_editing {
            ("Enter a path", true)
        } else {
            (text, false)
        };
        render_input_field(frame, chunks[2], label, value, placeholder, focus == Some(Field::Image), field_editing);
    }

    let image_type = wizard.kind().image_type();
    render_select_field(
        frame,
        chunks[3],
        "Type",
        &format!("◀ {} ▶", image_type.label()),
        focus == Some(Field::ImageType),
        "←/→ change",
    );

    let details = image_details(selector.current_entry().map(|e| &e.metadata), selector.source());
    if !details.is_empty() {
        let para = Paragraph::new(details)
            .style(Style::default().fg(Color::Gray))
            .wrap(Wrap { trim: true });
        frame.render_widget(para, chunks[4]);
    }

    let help = Paragraph::new("[j/k] Move  [Enter] Edit/Next  [Space] Toggle  [Esc] Back")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[5]);
}

/// Extra fields the server reported for the selected image
fn image_details(
    metadata: Option<&serde_json::Map<String, serde_json::Value>>,
    source: ImageSource,
) -> String {
    let Some(metadata) = metadata.filter(|_| source == ImageSource::Existing) else {
        return String::new();
    };
    metadata
        .iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => format!("{}: {}", key, s),
            other => format!("{}: {}", key, other),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_review_page(wizard: &DeviceWizard<IouDevice>, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1),  // Header
            Constraint::Length(1),  // Spacer
            Constraint::Min(8),     // Summary
            Constraint::Length(1),  // Help
        ])
        .split(area);

    let header = Paragraph::new("Summary")
        .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
    frame.render_widget(header, chunks[0]);

    let preview: Result<DeviceSettings, WizardError> = wizard.kind().settings(wizard.core());
    let summary = match preview {
        Ok(settings) => Paragraph::new(settings_lines(&settings)).wrap(Wrap { trim: false }),
        Err(e) => Paragraph::new(e.to_string()).style(Style::default().fg(Color::Red)),
    };
    frame.render_widget(summary, chunks[2]);

    let help = Paragraph::new("[Enter] Create device  [Esc] Back")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(help, chunks[3]);
}

fn render_input_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    is_placeholder: bool,
    is_focused: bool,
    is_editing: bool,
) {
    let border_style = if is_editing {
        Style::default().fg(Color::Yellow)
    } else if is_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::Gray)
    };

    let block = Block::default()
        .title(format!(" {} ", label))
        .borders(Borders::ALL)
        .border_style(border_style);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let text_style = if is_placeholder {
        Style::default().fg(Color::DarkGray)
    } else if is_editing {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    };

    let shown = if is_editing { format!("{}_", value) } else { value.to_string() };
    frame.render_widget(Paragraph::new(shown).style(text_style), inner);
}

fn render_select_field(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    value: &str,
    is_focused: bool,
    hint: &str,
) {
    let border_style = if is_focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };

    let block = Block::default()
        .title(format!(" {} ", label))
        .borders(Borders::ALL)
        .border_style(border_style);

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = vec![Span::styled(
        value.to_string(),
        if is_focused {
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        },
    )];

    if is_focused {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(hint.to_string(), Style::default().fg(Color::DarkGray)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

// =============================================================================
// Key handling
// =============================================================================

pub fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    let Some(wizard) = app.wizard.as_mut() else {
        return Ok(());
    };

    // Dialogs are modal
    if wizard.pending_dialog().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            wizard.take_dialog();
        }
        return Ok(());
    }
    if wizard.is_loading() {
        if key.code == KeyCode::Esc {
            wizard.cancel_loading();
        }
        return Ok(());
    }

    if app.wizard_editing {
        return handle_editing(app, key);
    }

    let Some(wizard) = app.wizard.as_ref() else {
        return Ok(());
    };
    let field = focused_field(app.wizard_focus, wizard);
    let field_count = page_fields(wizard).len();
    let on_review = wizard.page() == WizardPage::Review;
    let manual = is_manual(wizard);
    let image_id = wizard.kind().image_selector();

    match key.code {
        KeyCode::Esc => app.wizard_back(),
        KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
            if app.wizard_focus + 1 < field_count {
                app.wizard_focus += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
            app.wizard_focus = app.wizard_focus.saturating_sub(1);
        }
        KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') => {
            let delta = if key.code == KeyCode::Left { -1 } else { 1 };
            if let (Some(field), Some(wizard)) = (field, app.wizard.as_mut()) {
                change_field(wizard, field, delta);
            }
        }
        KeyCode::Char('b') if field == Some(Field::Image) => {
            if let Some(id) = image_id {
                app.open_image_browser(id);
            }
        }
        KeyCode::Enter => match field {
            Some(Field::Name) => app.wizard_editing = true,
            Some(Field::Image) if manual => app.wizard_editing = true,
            _ if on_review => app.finish_wizard(),
            _ => app.wizard_next(),
        },
        _ => {}
    }

    // Focus may point past the end after the page's fields changed
    if let Some(ref wizard) = app.wizard {
        let count = page_fields(wizard).len();
        app.wizard_focus = app.wizard_focus.min(count.saturating_sub(1));
    }
    Ok(())
}

fn is_manual(wizard: &DeviceWizard<IouDevice>) -> bool {
    wizard
        .kind()
        .image_selector()
        .and_then(|id| wizard.core().selector(id))
        .map(|s| s.source() == ImageSource::Manual)
        .unwrap_or(false)
}

/// Left/Right/Space on a non-text field
fn change_field(wizard: &mut DeviceWizard<IouDevice>, field: Field, delta: i32) {
    let image_id = wizard.kind().image_selector();
    match field {
        Field::ServerType => {
            let choices = server_choices(&wizard.visibility());
            if let Some(choice) = cycle(&choices, wizard.state().server_choice, delta) {
                wizard.set_server_choice(choice);
            }
        }
        Field::LoadBalance => {
            let enabled = !wizard.state().load_balance;
            wizard.set_load_balance(enabled);
        }
        Field::RemoteServer => {
            let count = wizard.state().remote_choices.len();
            if count > 0 {
                let index = (wizard.state().remote_index as i32 + delta).rem_euclid(count as i32);
                wizard.select_remote(index as usize);
            }
        }
        Field::ImageSource => {
            if let Some(id) = image_id {
                let source = if is_manual(wizard) {
                    ImageSource::Existing
                } else {
                    ImageSource::Manual
                };
                wizard.set_image_source(id, source);
            }
        }
        Field::Image => {
            let Some(selector) = image_id.and_then(|id| wizard.core().selector(id)) else {
                return;
            };
            if selector.source() != ImageSource::Existing || selector.entries().is_empty() {
                return;
            }
            let count = selector.entries().len() as i32;
            let current = selector.current_index().unwrap_or(0) as i32;
            let index = (current + delta).rem_euclid(count) as usize;
            let id = selector.id();
            wizard.select_image(id, index);
        }
        Field::ImageType => {
            let toggled = wizard.kind().image_type().toggled();
            wizard.kind_mut().set_image_type(toggled);
        }
        Field::Name => {}
    }
}

/// Text entry for the name or the image path; changes apply as typed
fn handle_editing(app: &mut App, key: KeyEvent) -> Result<()> {
    let Some(wizard) = app.wizard.as_ref() else {
        return Ok(());
    };
    let field = focused_field(app.wizard_focus, wizard);
    let image_id = wizard.kind().image_selector();

    let mut text = match field {
        Some(Field::Name) => wizard.state().name.clone(),
        Some(Field::Image) => image_id
            .and_then(|id| wizard.core().selector(id))
            .map(|s| s.text().to_string())
            .unwrap_or_default(),
        _ => {
            app.wizard_editing = false;
            return Ok(());
        }
    };

    match key.code {
        KeyCode::Esc | KeyCode::Enter | KeyCode::Tab => {
            app.wizard_editing = false;
            if key.code == KeyCode::Tab {
                app.wizard_focus += 1;
            }
            return Ok(());
        }
        KeyCode::Char(c) => text.push(c),
        KeyCode::Backspace => {
            text.pop();
        }
        _ => return Ok(()),
    }

    let Some(wizard) = app.wizard.as_mut() else {
        return Ok(());
    };
    match (field, image_id) {
        (Some(Field::Name), _) => wizard.set_name(&text),
        (Some(Field::Image), Some(id)) => wizard.set_image_text(id, &text),
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        let options = [ServerChoice::Local, ServerChoice::Remote, ServerChoice::Cloud];
        assert_eq!(cycle(&options, ServerChoice::Cloud, 1), Some(ServerChoice::Local));
        assert_eq!(cycle(&options, ServerChoice::Local, -1), Some(ServerChoice::Cloud));
        assert_eq!(cycle::<ServerChoice>(&[], ServerChoice::Local, 1), None);
    }

    #[test]
    fn test_server_choices_follow_visibility() {
        let vis = Visibility {
            local_enabled: false,
            cloud_visible: false,
            remote_group_enabled: true,
            remote_chooser_enabled: true,
            selectors: Vec::new(),
        };
        assert_eq!(server_choices(&vis), vec![ServerChoice::Remote]);
    }

    #[test]
    fn test_image_details_only_for_existing_images() {
        let mut metadata = serde_json::Map::new();
        metadata.insert("filesize".to_string(), serde_json::json!(1024));
        assert_eq!(image_details(Some(&metadata), ImageSource::Existing), "filesize: 1024");
        assert_eq!(image_details(Some(&metadata), ImageSource::Manual), "");
        assert_eq!(image_details(None, ImageSource::Existing), "");
    }
}
