use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::client::{FetchError, HttpClient, ImageEntry, ImageListClient};
use crate::config::Config;
use crate::devices::{DeviceRegistry, DeviceSettings};
use crate::templates::TemplateStore;
use crate::ui::widgets::build_visual_order;
use crate::wizard::{DeviceWizard, IouDevice, PickerFilter, SelectorId, WizardEnv};

/// Application screens/views
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Configured devices
    DeviceList,
    /// IOU device wizard (page tracked by the wizard itself)
    Wizard,
    /// File browser (image selection for the wizard)
    FileBrowser,
    /// Confirmation dialog
    Confirm(ConfirmAction),
    /// Error dialog (scrollable)
    ErrorDialog,
    /// Help screen
    Help,
}

/// Actions that need confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteDevice(String),
    CancelWizard,
}

/// Entry in file browser
#[derive(Debug, Clone)]
pub struct FileBrowserEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Background operation result
pub enum BackgroundResult {
    ImagesLoaded {
        generation: u64,
        result: Result<Vec<ImageEntry>, FetchError>,
    },
}

/// Application state
pub struct App {
    /// Current screen
    pub screen: Screen,
    /// Screen history for back navigation
    pub screen_stack: Vec<Screen>,
    /// Application configuration
    pub config: Config,
    /// Configured devices
    pub devices: DeviceRegistry,
    /// Base initial-config templates
    pub templates: TemplateStore,
    /// Selected device index
    pub selected_device: usize,
    /// Running IOU wizard
    pub wizard: Option<DeviceWizard<IouDevice>>,
    /// Focused field on the current wizard page
    pub wizard_focus: usize,
    /// Whether the focused text field captures keys
    pub wizard_editing: bool,
    /// Status message
    pub status_message: Option<String>,
    /// When status message was set (for auto-clearing)
    pub status_time: Option<Instant>,
    /// Whether the app should quit
    pub should_quit: bool,
    /// File browser current directory
    pub file_browser_dir: PathBuf,
    /// File browser entries (directories first, then files)
    pub file_browser_entries: Vec<FileBrowserEntry>,
    /// File browser selected index
    pub file_browser_selected: usize,
    /// Files the browser offers
    pub file_browser_filter: Option<PickerFilter>,
    /// Selector waiting for the browser result
    pub browse_target: Option<SelectorId>,
    /// Channel for background operation results
    pub background_rx: Receiver<BackgroundResult>,
    /// Sender for background operations (clone this for threads)
    pub background_tx: Sender<BackgroundResult>,
    /// HTTP client shared by image list requests
    pub client: HttpClient,
    /// Error dialog content (for detailed errors)
    pub error_detail: Option<String>,
    /// Error dialog scroll position
    pub error_scroll: u16,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let devices = DeviceRegistry::load(&config.devices_path)?;
        let templates = TemplateStore::with_user_dir(&config.configs_path);
        let client = HttpClient::new().context("Failed to create HTTP client")?;
        let (background_tx, background_rx) = mpsc::channel();

        let file_browser_dir = if config.images_dir.is_dir() {
            config.images_dir.clone()
        } else {
            dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"))
        };

        info!("Loaded {} devices", devices.devices().len());

        Ok(Self {
            screen: Screen::DeviceList,
            screen_stack: Vec::new(),
            config,
            devices,
            templates,
            selected_device: 0,
            wizard: None,
            wizard_focus: 0,
            wizard_editing: false,
            status_message: None,
            status_time: None,
            should_quit: false,
            file_browser_dir,
            file_browser_entries: Vec::new(),
            file_browser_selected: 0,
            file_browser_filter: None,
            browse_target: None,
            background_rx,
            background_tx,
            client,
            error_detail: None,
            error_scroll: 0,
        })
    }

    /// Navigate to a new screen
    pub fn push_screen(&mut self, screen: Screen) {
        self.screen_stack.push(self.screen.clone());
        self.screen = screen;
    }

    /// Go back to the previous screen
    pub fn pop_screen(&mut self) {
        if let Some(prev) = self.screen_stack.pop() {
            self.screen = prev;
        }
    }

    pub fn selected_device(&self) -> Option<&DeviceSettings> {
        self.devices.devices().get(self.selected_device)
    }

    /// Move selection down in the device list (follows display order)
    pub fn select_next(&mut self) {
        self.move_selection(1);
    }

    /// Move selection up in the device list (follows display order)
    pub fn select_prev(&mut self) {
        self.move_selection(-1);
    }

    fn move_selection(&mut self, delta: isize) {
        let order = build_visual_order(self.devices.devices());
        let Some(pos) = order.iter().position(|&i| i == self.selected_device) else {
            self.selected_device = order.first().copied().unwrap_or(0);
            return;
        };
        let target = pos.saturating_add_signed(delta).min(order.len() - 1);
        self.selected_device = order[target];
    }

    /// Set a status message (auto-clears after 5 seconds)
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_time = Some(Instant::now());
    }

    /// Show a detailed error in a scrollable dialog
    pub fn show_error(&mut self, error: impl Into<String>) {
        self.error_detail = Some(error.into());
        self.error_scroll = 0;
        self.push_screen(Screen::ErrorDialog);
    }

    /// Clear status message
    pub fn clear_status(&mut self) {
        self.status_message = None;
        self.status_time = None;
    }

    /// Check and clear status if expired (call in event loop)
    pub fn check_status_expiry(&mut self) {
        if let Some(time) = self.status_time {
            if time.elapsed().as_secs() >= 5 {
                self.clear_status();
            }
        }
    }

    // === Wizard ===

    /// Open a new IOU device wizard
    pub fn start_wizard(&mut self) {
        let use_local_server = self.config.use_local_server;
        let kind = IouDevice::new(self.devices.names(), self.templates.clone(), use_local_server);
        let env = WizardEnv {
            local_available: IouDevice::local_supported(use_local_server),
            cloud_enabled: self.config.enable_cloud,
        };

        info!("Starting IOU device wizard");
        self.wizard = Some(DeviceWizard::new(kind, self.config.server_registry(), env));
        self.wizard_focus = 0;
        self.wizard_editing = false;
        self.push_screen(Screen::Wizard);
    }

    /// Close the wizard without creating anything
    pub fn cancel_wizard(&mut self) {
        if self.wizard.take().is_some() {
            debug!("Wizard closed");
        }
        self.wizard_editing = false;
        self.browse_target = None;
        self.screen_stack.clear();
        self.screen = Screen::DeviceList;
    }

    pub fn wizard_next(&mut self) {
        if let Some(ref mut wizard) = self.wizard {
            if wizard.next() {
                self.wizard_focus = 0;
            }
        }
    }

    /// Previous page; on the first page ask before discarding the wizard
    pub fn wizard_back(&mut self) {
        let went_back = self.wizard.as_mut().map(|w| w.back()).unwrap_or(false);
        if went_back {
            self.wizard_focus = 0;
        } else {
            self.push_screen(Screen::Confirm(ConfirmAction::CancelWizard));
        }
    }

    /// Assemble the settings and store the new device
    pub fn finish_wizard(&mut self) {
        let Some(ref mut wizard) = self.wizard else {
            return;
        };
        // Failures are queued as wizard dialogs
        let Ok(settings) = wizard.finish() else {
            return;
        };

        let name = settings.name.clone();
        match self.devices.add(settings) {
            Ok(()) => {
                self.cancel_wizard();
                self.selected_device = self.devices.devices().len().saturating_sub(1);
                self.set_status(format!("Device created: {}", name));
            }
            Err(e) => {
                error!("Failed to store device {}: {:#}", name, e);
                self.show_error(format!("Failed to store device {}: {:#}", name, e));
            }
        }
    }

    /// Run the wizard's pending image list request on a worker thread
    pub fn dispatch_wizard_requests(&mut self) {
        let Some(request) = self.wizard.as_mut().and_then(|w| w.take_fetch_request()) else {
            return;
        };

        let tx = self.background_tx.clone();
        let client = self.client.clone();
        thread::spawn(move || {
            let result = client.get_images(&request.server, &request.endpoint);
            let _ = tx.send(BackgroundResult::ImagesLoaded {
                generation: request.generation,
                result,
            });
        });
    }

    /// Check for background operation results (call in event loop)
    pub fn check_background_results(&mut self) {
        // Non-blocking check for results
        while let Ok(result) = self.background_rx.try_recv() {
            match result {
                BackgroundResult::ImagesLoaded { generation, result } => match self.wizard {
                    Some(ref mut wizard) => wizard.images_loaded(generation, result),
                    None => debug!("Image list #{} arrived after the wizard closed", generation),
                },
            }
        }
    }

    // === Devices ===

    pub fn request_delete_device(&mut self) {
        if let Some(name) = self.selected_device().map(|d| d.name.clone()) {
            self.push_screen(Screen::Confirm(ConfirmAction::DeleteDevice(name)));
        }
    }

    pub fn delete_device(&mut self, name: &str) {
        match self.devices.remove(name) {
            Ok(true) => {
                let count = self.devices.devices().len();
                if self.selected_device >= count {
                    self.selected_device = count.saturating_sub(1);
                }
                self.set_status(format!("Deleted device: {}", name));
            }
            Ok(false) => self.set_status(format!("No device named {}", name)),
            Err(e) => self.show_error(format!("Failed to delete {}: {:#}", name, e)),
        }
    }

    // === File browser ===

    /// Open the file browser for a wizard browse button
    pub fn open_image_browser(&mut self, selector: SelectorId) {
        let Some(request) = self.wizard.as_ref().and_then(|w| w.browse(selector)) else {
            return;
        };
        self.file_browser_filter = Some(request.filter);
        self.browse_target = Some(request.selector);
        self.load_file_browser();
        self.push_screen(Screen::FileBrowser);
    }

    /// Load file browser entries for current directory
    pub fn load_file_browser(&mut self) {
        self.file_browser_entries.clear();
        self.file_browser_selected = 0;

        // Add parent directory entry if not at root
        if let Some(parent) = self.file_browser_dir.parent() {
            self.file_browser_entries.push(FileBrowserEntry {
                name: "..".to_string(),
                path: parent.to_path_buf(),
                is_dir: true,
            });
        }

        let filter = self.file_browser_filter;
        if let Ok(entries) = std::fs::read_dir(&self.file_browser_dir) {
            let mut dirs = Vec::new();
            let mut files = Vec::new();

            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    let name = entry.file_name().to_string_lossy().to_string();
                    // Skip hidden files
                    if name.starts_with('.') {
                        continue;
                    }
                    let entry = FileBrowserEntry {
                        name,
                        path: entry.path(),
                        is_dir: metadata.is_dir(),
                    };
                    if metadata.is_dir() {
                        dirs.push(entry);
                    } else if filter.map(|f| f.matches(&entry.name)).unwrap_or(true) {
                        files.push(entry);
                    }
                }
            }

            dirs.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

            self.file_browser_entries.extend(dirs);
            self.file_browser_entries.extend(files);
        }
    }

    /// Navigate into directory or select file in file browser
    pub fn file_browser_enter(&mut self) -> Option<PathBuf> {
        let entry = self.file_browser_entries.get(self.file_browser_selected)?;
        if entry.is_dir {
            self.file_browser_dir = entry.path.clone();
            self.load_file_browser();
            None
        } else {
            Some(entry.path.clone())
        }
    }

    /// Move selection up in file browser
    pub fn file_browser_prev(&mut self) {
        if self.file_browser_selected > 0 {
            self.file_browser_selected -= 1;
        }
    }

    /// Move selection down in file browser
    pub fn file_browser_next(&mut self) {
        if self.file_browser_selected < self.file_browser_entries.len().saturating_sub(1) {
            self.file_browser_selected += 1;
        }
    }

    /// Hand the browser result to the wizard; `None` means dismissed
    pub fn file_browser_done(&mut self, path: Option<PathBuf>) {
        if let (Some(target), Some(wizard)) = (self.browse_target.take(), self.wizard.as_mut()) {
            let path = path.map(|p| p.to_string_lossy().to_string()).unwrap_or_default();
            wizard.browse_finished(target, &path);
        }
        self.pop_screen();
    }
}
