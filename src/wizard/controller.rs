//! Device wizard state machine
//!
//! [`WizardCore`] holds everything common to device wizards: the page
//! sequence, server selection, image selectors, the image list fetch and
//! the queue of dialogs to show. A [`DeviceKind`] layers device-specific
//! pages, checks and the final settings on top of it.

use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::fetch::{Completion, FetchTracker};
use super::selector::{ImageSelector, ImageSource, PickerFilter, SelectorId};
use super::visibility::{self, Visibility, VisibilityInput};
use crate::client::{FetchError, ImageEntry};
use crate::devices::DeviceSettings;
use crate::servers::{Server, ServerAddress, ServerChoice, ServerRegistry};

/// Pages of a device wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardPage {
    Server,
    NameAndImage,
    Review,
}

impl WizardPage {
    pub fn title(&self) -> &'static str {
        match self {
            WizardPage::Server => "Server",
            WizardPage::NameAndImage => "Name and image",
            WizardPage::Review => "Review & Create",
        }
    }
}

/// Input problems that keep the wizard on the current page
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("There is no remote server registered for this type of VM in preferences")]
    NoRemoteServer,
    #[error("No remote server is selected")]
    NoRemoteSelected,
    #[error("{0} is already used, please choose another name")]
    DuplicateName(String),
    #[error("Please enter a name")]
    MissingName,
    #[error("Please select or enter an image")]
    MissingImage,
    #[error("The wizard is not on its last page")]
    NotFinished,
}

impl WizardError {
    /// Dialog title for this error
    pub fn title(&self) -> &'static str {
        match self {
            WizardError::NoRemoteServer | WizardError::NoRemoteSelected => "Remote server",
            WizardError::DuplicateName(_) | WizardError::MissingName => "Name",
            WizardError::MissingImage => "Image",
            WizardError::NotFinished => "Wizard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogLevel {
    Critical,
    Warning,
}

/// A modal message waiting to be shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub level: DialogLevel,
    pub title: String,
    pub message: String,
}

/// Image list request for the host to execute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub server: Server,
    pub endpoint: String,
}

/// Ask the host to open its file picker for a selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowseRequest {
    pub selector: SelectorId,
    pub filter: PickerFilter,
}

/// Host capabilities that shape the server page
#[derive(Debug, Clone, Copy)]
pub struct WizardEnv {
    pub local_available: bool,
    pub cloud_enabled: bool,
}

/// Values entered so far
#[derive(Debug, Clone)]
pub struct WizardState {
    pub page: WizardPage,
    history: Vec<WizardPage>,
    pub server_choice: ServerChoice,
    pub load_balance: bool,
    /// Items of the remote server chooser
    pub remote_choices: Vec<ServerAddress>,
    pub remote_index: usize,
    /// Server stored when the server page was validated
    pub server: Server,
    pub name: String,
}

pub struct WizardCore {
    pub state: WizardState,
    pages: &'static [WizardPage],
    servers: ServerRegistry,
    env: WizardEnv,
    selectors: Vec<ImageSelector>,
    fetch: FetchTracker,
    outbox: Option<FetchRequest>,
    dialogs: VecDeque<Dialog>,
}

impl WizardCore {
    fn new(pages: &'static [WizardPage], servers: ServerRegistry, env: WizardEnv) -> Self {
        let first = pages.first().copied().unwrap_or(WizardPage::Server);
        Self {
            state: WizardState {
                page: first,
                history: Vec::new(),
                server_choice: ServerChoice::Local,
                load_balance: false,
                remote_choices: Vec::new(),
                remote_index: 0,
                server: servers.local_server(),
                name: String::new(),
            },
            pages,
            servers,
            env,
            selectors: Vec::new(),
            fetch: FetchTracker::default(),
            outbox: None,
            dialogs: VecDeque::new(),
        }
    }

    /// Register an image selector group; it starts in "existing image" mode
    pub fn add_image_selector(&mut self, label: &str, picker: PickerFilter) -> SelectorId {
        let id = SelectorId(self.selectors.len());
        self.selectors.push(ImageSelector::new(id, label, picker));
        id
    }

    pub fn selectors(&self) -> &[ImageSelector] {
        &self.selectors
    }

    pub fn selector(&self, id: SelectorId) -> Option<&ImageSelector> {
        self.selectors.get(id.0)
    }

    pub fn servers(&self) -> &ServerRegistry {
        &self.servers
    }

    pub fn visibility(&self) -> Visibility {
        let sources: Vec<ImageSource> = self.selectors.iter().map(|s| s.source()).collect();
        visibility::compute(&VisibilityInput {
            server_choice: self.state.server_choice,
            load_balance: self.state.load_balance,
            local_available: self.env.local_available,
            cloud_enabled: self.env.cloud_enabled,
            sources: &sources,
        })
    }

    /// Text currently shown by the remote server chooser
    pub fn remote_label(&self) -> Option<String> {
        self.state
            .remote_choices
            .get(self.state.remote_index)
            .map(|addr| addr.to_string())
    }

    /// Ask for the image list at `endpoint` on the chosen server
    pub fn load_images_list(&mut self, endpoint: &str) {
        let generation = self.fetch.begin();
        info!(
            "Loading images from {} {} (request #{})",
            self.state.server, endpoint, generation
        );
        self.outbox = Some(FetchRequest {
            generation,
            server: self.state.server.clone(),
            endpoint: endpoint.to_string(),
        });
    }

    pub fn is_loading(&self) -> bool {
        self.fetch.is_loading()
    }

    pub fn show_error(&mut self, error: &WizardError) {
        warn!("{}: {}", error.title(), error);
        self.push_dialog(DialogLevel::Critical, error.title(), &error.to_string());
    }

    pub fn show_warning(&mut self, title: &str, message: &str) {
        self.push_dialog(DialogLevel::Warning, title, message);
    }

    fn push_dialog(&mut self, level: DialogLevel, title: &str, message: &str) {
        self.dialogs.push_back(Dialog {
            level,
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn initialize_page(&mut self, page: WizardPage) {
        if page == WizardPage::Server {
            self.state.remote_choices = self.servers.remote_servers().to_vec();
            if self.state.remote_index >= self.state.remote_choices.len() {
                self.state.remote_index = 0;
            }
        }
    }

    fn validate_page(&mut self, page: WizardPage) -> Result<(), WizardError> {
        if page != WizardPage::Server {
            return Ok(());
        }

        self.state.server = match self.state.server_choice {
            ServerChoice::Remote => {
                if !self.servers.has_remote_servers() {
                    return Err(WizardError::NoRemoteServer);
                }
                self.state
                    .remote_choices
                    .get(self.state.remote_index)
                    .cloned()
                    .map(Server::Remote)
                    .ok_or(WizardError::NoRemoteSelected)?
            }
            // Cloud devices are provisioned later; images come from the local server
            ServerChoice::Local | ServerChoice::Cloud => self.servers.local_server(),
        };
        debug!("Server set to {}", self.state.server);
        Ok(())
    }

    fn next_page(&self) -> Option<WizardPage> {
        let pos = self.pages.iter().position(|p| *p == self.state.page)?;
        self.pages.get(pos + 1).copied()
    }
}

/// Device-specific behaviour layered on top of [`WizardCore`]
pub trait DeviceKind {
    /// Pages in order; the first page is the server page
    fn pages(&self) -> &'static [WizardPage];

    /// Skip the server page and run on the local server
    fn forces_local_server(&self) -> bool {
        false
    }

    /// Register image selectors and other one-time setup
    fn setup(&mut self, _core: &mut WizardCore) {}

    /// Called after the base initialization of `page`
    fn initialize_page(&mut self, _page: WizardPage, _core: &mut WizardCore) {}

    /// Called after the base validation of `page` succeeded
    fn validate_page(&self, _page: WizardPage, _core: &WizardCore) -> Result<(), WizardError> {
        Ok(())
    }

    /// The path field of `selector` changed
    fn image_text_changed(&mut self, _selector: SelectorId, _text: &str) {}

    fn settings(&self, core: &WizardCore) -> Result<DeviceSettings, WizardError>;
}

pub struct DeviceWizard<K: DeviceKind> {
    core: WizardCore,
    kind: K,
}

impl<K: DeviceKind> DeviceWizard<K> {
    pub fn new(mut kind: K, servers: ServerRegistry, env: WizardEnv) -> Self {
        let mut core = WizardCore::new(kind.pages(), servers, env);
        kind.setup(&mut core);

        let mut wizard = Self { core, kind };
        if wizard.kind.forces_local_server() {
            wizard.core.state.server_choice = ServerChoice::Local;
            wizard.core.state.server = wizard.core.servers.local_server();
            if let Some(page) = wizard.core.next_page() {
                debug!("Local server forced, starting at {:?}", page);
                wizard.core.state.page = page;
            }
        }
        let start = wizard.core.state.page;
        wizard.initialize_page(start);
        wizard
    }

    pub fn core(&self) -> &WizardCore {
        &self.core
    }

    pub fn state(&self) -> &WizardState {
        &self.core.state
    }

    pub fn page(&self) -> WizardPage {
        self.core.state.page
    }

    /// 1-based position of the current page and the number of pages
    pub fn progress(&self) -> (usize, usize) {
        let pos = self
            .core
            .pages
            .iter()
            .position(|p| *p == self.core.state.page)
            .unwrap_or(0);
        (pos + 1, self.core.pages.len())
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn kind_mut(&mut self) -> &mut K {
        &mut self.kind
    }

    pub fn visibility(&self) -> Visibility {
        self.core.visibility()
    }

    pub fn is_last_page(&self) -> bool {
        self.core.next_page().is_none()
    }

    // === Dialogs and requests for the host ===

    pub fn pending_dialog(&self) -> Option<&Dialog> {
        self.core.dialogs.front()
    }

    pub fn take_dialog(&mut self) -> Option<Dialog> {
        self.core.dialogs.pop_front()
    }

    pub fn take_fetch_request(&mut self) -> Option<FetchRequest> {
        self.core.outbox.take()
    }

    pub fn is_loading(&self) -> bool {
        self.core.is_loading()
    }

    /// User dismissed the progress dialog
    pub fn cancel_loading(&mut self) {
        if self.core.fetch.cancel() {
            info!("Image list request canceled");
        }
    }

    // === Page sequencing ===

    pub fn initialize_page(&mut self, page: WizardPage) {
        self.core.initialize_page(page);
        self.kind.initialize_page(page, &mut self.core);
    }

    /// Validate the current page; errors are queued as dialogs
    pub fn validate_current_page(&mut self) -> bool {
        let page = self.core.state.page;
        let result = self
            .core
            .validate_page(page)
            .and_then(|_| self.kind.validate_page(page, &self.core));

        match result {
            Ok(()) => true,
            Err(e) => {
                self.core.show_error(&e);
                false
            }
        }
    }

    /// Validate and advance. Returns false if blocked or already on the last page.
    pub fn next(&mut self) -> bool {
        let Some(next) = self.core.next_page() else {
            return false;
        };
        if !self.validate_current_page() {
            return false;
        }

        self.core.state.history.push(self.core.state.page);
        self.core.state.page = next;
        self.initialize_page(next);
        true
    }

    /// Go back to the previous page, if any
    pub fn back(&mut self) -> bool {
        match self.core.state.history.pop() {
            Some(prev) => {
                self.core.state.page = prev;
                true
            }
            None => false,
        }
    }

    /// Validate the last page and assemble the settings
    pub fn finish(&mut self) -> Result<DeviceSettings, WizardError> {
        if !self.is_last_page() {
            return Err(WizardError::NotFinished);
        }
        let page = self.core.state.page;
        let result = self
            .core
            .validate_page(page)
            .and_then(|_| self.kind.validate_page(page, &self.core))
            .and_then(|_| self.kind.settings(&self.core));

        match result {
            Ok(settings) => {
                info!("Device {} configured", settings.name);
                Ok(settings)
            }
            Err(e) => {
                self.core.show_error(&e);
                Err(e)
            }
        }
    }

    // === Server page ===

    pub fn set_server_choice(&mut self, choice: ServerChoice) {
        let vis = self.core.visibility();
        if (choice == ServerChoice::Local && !vis.local_enabled)
            || (choice == ServerChoice::Cloud && !vis.cloud_visible)
        {
            return;
        }
        self.core.state.server_choice = choice;
    }

    pub fn set_load_balance(&mut self, enabled: bool) {
        self.core.state.load_balance = enabled;
    }

    pub fn select_remote(&mut self, index: usize) {
        if self.core.visibility().remote_chooser_enabled
            && index < self.core.state.remote_choices.len()
        {
            self.core.state.remote_index = index;
        }
    }

    // === Name and images ===

    pub fn set_name(&mut self, name: &str) {
        self.core.state.name = name.to_string();
    }

    /// Radio toggle between the image list and a manual path
    pub fn set_image_source(&mut self, id: SelectorId, source: ImageSource) {
        let Some(selector) = self.core.selectors.get_mut(id.0) else {
            return;
        };
        selector.set_source(source);
        let text = match source {
            ImageSource::Existing => match selector.current_entry() {
                Some(entry) => entry.filename.clone(),
                None => return,
            },
            ImageSource::Manual => String::new(),
        };
        self.set_image_text(id, &text);
    }

    /// Pick an entry of the image list
    pub fn select_image(&mut self, id: SelectorId, index: usize) {
        let filename = self
            .core
            .selectors
            .get_mut(id.0)
            .and_then(|s| s.select(index));
        if let Some(filename) = filename {
            self.set_image_text(id, &filename);
        }
    }

    /// Edit the path field
    pub fn set_image_text(&mut self, id: SelectorId, text: &str) {
        let changed = self
            .core
            .selectors
            .get_mut(id.0)
            .map(|s| s.set_text(text))
            .unwrap_or(false);
        if changed {
            self.kind.image_text_changed(id, text);
        }
    }

    /// Browse button; None when the button is hidden
    pub fn browse(&self, id: SelectorId) -> Option<BrowseRequest> {
        let vis = self.core.visibility();
        if !vis.selectors.get(id.0)?.browse {
            return None;
        }
        let selector = self.core.selector(id)?;
        Some(BrowseRequest {
            selector: id,
            filter: selector.picker(),
        })
    }

    /// The file picker returned; an empty path means it was dismissed
    pub fn browse_finished(&mut self, id: SelectorId, path: &str) {
        if path.is_empty() {
            return;
        }
        self.set_image_text(id, path);
    }

    // === Image list completion ===

    pub fn images_loaded(&mut self, generation: u64, result: Result<Vec<ImageEntry>, FetchError>) {
        match self.core.fetch.complete(generation) {
            Completion::Stale => {
                debug!("Dropping stale image list #{}", generation);
                return;
            }
            Completion::Canceled => {
                debug!("Dropping canceled image list #{}", generation);
                return;
            }
            Completion::Current => {}
        }

        let images = match result {
            Ok(images) => images,
            Err(e) => {
                warn!("Image list #{} failed: {}", generation, e);
                self.core.push_dialog(
                    DialogLevel::Critical,
                    "Images",
                    &format!("Error while getting the VMs: {}", e),
                );
                return;
            }
        };

        info!("Received {} images (request #{})", images.len(), generation);
        let shared: Arc<[ImageEntry]> = Arc::from(images);
        let mut copies = Vec::new();
        for selector in &mut self.core.selectors {
            selector.set_entries(shared.clone());
            if selector.source() == ImageSource::Existing {
                if let Some(entry) = selector.current_entry() {
                    copies.push((selector.id(), entry.filename.clone()));
                }
            }
        }
        for (id, filename) in copies {
            self.set_image_text(id, &filename);
        }
    }
}
