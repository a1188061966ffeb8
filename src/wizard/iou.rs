//! IOU (IOS on UNIX) device wizard
//!
//! IOU images come in two flavours: L2 images behave as multilayer
//! switches, L3 images as routers. The flavour decides every default of
//! the new device.

use tracing::debug;

use super::controller::{DeviceKind, WizardCore, WizardError, WizardPage};
use super::selector::{PickerFilter, SelectorId};
use crate::devices::{image_basename, Category, DeviceSettings};
use crate::servers::ServerChoice;
use crate::templates::{TemplateStore, IOU_L2_BASE_CONFIG, IOU_L3_BASE_CONFIG};

/// Endpoint listing the IOU images a compute server holds
pub const IOU_IMAGES_ENDPOINT: &str = "/iou/vms";

const IOU_PAGES: &[WizardPage] = &[
    WizardPage::Server,
    WizardPage::NameAndImage,
    WizardPage::Review,
];

const IOU_PICKER: PickerFilter = PickerFilter {
    title: "IOU image",
    extensions: &[".bin", ".image"],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IouImageType {
    #[default]
    L2,
    L3,
}

impl IouImageType {
    pub const ALL: [IouImageType; 2] = [IouImageType::L2, IouImageType::L3];

    pub fn label(&self) -> &'static str {
        match self {
            IouImageType::L2 => "L2 image",
            IouImageType::L3 => "L3 image",
        }
    }

    /// Guess the type from an image path ("l2" wins over "l3")
    pub fn from_path(path: &str) -> Option<Self> {
        if path.contains("l2") {
            Some(IouImageType::L2)
        } else if path.contains("l3") {
            Some(IouImageType::L3)
        } else {
            None
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            IouImageType::L2 => IouImageType::L3,
            IouImageType::L3 => IouImageType::L2,
        }
    }

    /// Symbol shown while the device is not hovered
    pub fn default_symbol(&self) -> &'static str {
        match self {
            IouImageType::L2 => ":/symbols/multilayer_switch.normal.svg",
            IouImageType::L3 => ":/symbols/router.normal.svg",
        }
    }

    pub fn defaults(&self, templates: &TemplateStore) -> IouDefaults {
        match self {
            IouImageType::L2 => IouDefaults {
                initial_config: templates.base_config(IOU_L2_BASE_CONFIG),
                default_symbol: self.default_symbol(),
                hover_symbol: ":/symbols/multilayer_switch.selected.svg",
                category: Category::Switches,
                ethernet_adapters: 4,
                serial_adapters: 0,
            },
            IouImageType::L3 => IouDefaults {
                initial_config: templates.base_config(IOU_L3_BASE_CONFIG),
                default_symbol: self.default_symbol(),
                hover_symbol: ":/symbols/router.selected.svg",
                category: Category::Routers,
                ethernet_adapters: 2,
                serial_adapters: 2,
            },
        }
    }
}

/// Settings that follow from the image type alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IouDefaults {
    pub initial_config: String,
    pub default_symbol: &'static str,
    pub hover_symbol: &'static str,
    pub category: Category,
    pub ethernet_adapters: u32,
    pub serial_adapters: u32,
}

pub struct IouDevice {
    image_type: IouImageType,
    existing_names: Vec<String>,
    templates: TemplateStore,
    use_local_server: bool,
    image_selector: Option<SelectorId>,
}

impl IouDevice {
    pub fn new(existing_names: Vec<String>, templates: TemplateStore, use_local_server: bool) -> Self {
        Self {
            image_type: IouImageType::default(),
            existing_names,
            templates,
            use_local_server,
            image_selector: None,
        }
    }

    /// IOU cannot run on a local Windows or macOS server
    pub fn local_supported(use_local_server: bool) -> bool {
        use_local_server || !(cfg!(target_os = "windows") || cfg!(target_os = "macos"))
    }

    pub fn image_type(&self) -> IouImageType {
        self.image_type
    }

    /// Explicit choice by the user; holds until the path is edited again
    pub fn set_image_type(&mut self, image_type: IouImageType) {
        self.image_type = image_type;
    }

    pub fn image_selector(&self) -> Option<SelectorId> {
        self.image_selector
    }

    fn image_path<'a>(&self, core: &'a WizardCore) -> &'a str {
        self.image_selector
            .and_then(|id| core.selector(id))
            .map(|s| s.text())
            .unwrap_or("")
    }

    fn resolve_server(&self, core: &WizardCore) -> Result<String, WizardError> {
        match core.state.server_choice {
            ServerChoice::Local => Ok("local".to_string()),
            ServerChoice::Remote if core.state.load_balance => core
                .servers()
                .first_remote()
                .map(|addr| addr.to_string())
                .ok_or(WizardError::NoRemoteServer),
            ServerChoice::Remote => core.remote_label().ok_or(WizardError::NoRemoteSelected),
            ServerChoice::Cloud => Ok("cloud".to_string()),
        }
    }
}

impl DeviceKind for IouDevice {
    fn pages(&self) -> &'static [WizardPage] {
        IOU_PAGES
    }

    fn forces_local_server(&self) -> bool {
        self.use_local_server
    }

    fn setup(&mut self, core: &mut WizardCore) {
        self.image_selector = Some(core.add_image_selector("IOU image", IOU_PICKER));
    }

    fn initialize_page(&mut self, page: WizardPage, core: &mut WizardCore) {
        if page != WizardPage::NameAndImage {
            return;
        }
        if core.state.server_choice != ServerChoice::Local {
            core.show_warning(
                "IOU image",
                "You have chosen to use a remote server, please provide the path to an IOU image located on this server!",
            );
        }
        core.load_images_list(IOU_IMAGES_ENDPOINT);
    }

    fn validate_page(&self, page: WizardPage, core: &WizardCore) -> Result<(), WizardError> {
        if page != WizardPage::NameAndImage {
            return Ok(());
        }

        let name = core.state.name.as_str();
        if name.is_empty() {
            return Err(WizardError::MissingName);
        }
        if self.image_path(core).is_empty() {
            return Err(WizardError::MissingImage);
        }
        if self.existing_names.iter().any(|n| n == name) {
            return Err(WizardError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    fn image_text_changed(&mut self, selector: SelectorId, text: &str) {
        if Some(selector) != self.image_selector {
            return;
        }
        if let Some(image_type) = IouImageType::from_path(text) {
            if image_type != self.image_type {
                debug!("Image path suggests {}", image_type.label());
            }
            self.image_type = image_type;
        }
    }

    fn settings(&self, core: &WizardCore) -> Result<DeviceSettings, WizardError> {
        let path = self.image_path(core).to_string();
        let defaults = self.image_type.defaults(&self.templates);

        Ok(DeviceSettings {
            name: core.state.name.clone(),
            image: image_basename(&path),
            path,
            initial_config: defaults.initial_config,
            ethernet_adapters: defaults.ethernet_adapters,
            serial_adapters: defaults.serial_adapters,
            default_symbol: defaults.default_symbol.to_string(),
            hover_symbol: defaults.hover_symbol.to_string(),
            category: defaults.category,
            server: self.resolve_server(core)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ImageEntry;
    use crate::servers::{Server, ServerAddress, ServerRegistry};
    use crate::wizard::controller::{DeviceWizard, DialogLevel, WizardEnv};
    use crate::wizard::selector::ImageSource;

    const ENV: WizardEnv = WizardEnv {
        local_available: true,
        cloud_enabled: true,
    };

    fn registry(remotes: &[(&str, u16)]) -> ServerRegistry {
        ServerRegistry::new(
            ServerAddress::new("127.0.0.1", 8000),
            remotes.iter().map(|(h, p)| ServerAddress::new(*h, *p)).collect(),
        )
    }

    fn iou_wizard(names: &[&str], remotes: &[(&str, u16)]) -> DeviceWizard<IouDevice> {
        let kind = IouDevice::new(
            names.iter().map(|n| n.to_string()).collect(),
            TemplateStore::embedded(),
            false,
        );
        DeviceWizard::new(kind, registry(remotes), ENV)
    }

    fn selector(w: &DeviceWizard<IouDevice>) -> SelectorId {
        w.kind().image_selector().unwrap()
    }

    /// Advance from the server page and answer the image request
    fn reach_image_page(w: &mut DeviceWizard<IouDevice>, images: &[&str]) {
        assert!(w.next());
        let request = w.take_fetch_request().unwrap();
        assert_eq!(request.endpoint, IOU_IMAGES_ENDPOINT);
        w.images_loaded(
            request.generation,
            Ok(images.iter().map(|f| ImageEntry::named(f)).collect()),
        );
    }

    #[test]
    fn test_type_defaults_are_fixed() {
        let templates = TemplateStore::embedded();

        let l2 = IouImageType::L2.defaults(&templates);
        assert_eq!(l2.category, Category::Switches);
        assert_eq!((l2.ethernet_adapters, l2.serial_adapters), (4, 0));
        assert_eq!(l2.default_symbol, ":/symbols/multilayer_switch.normal.svg");
        assert_eq!(l2.hover_symbol, ":/symbols/multilayer_switch.selected.svg");

        let l3 = IouImageType::L3.defaults(&templates);
        assert_eq!(l3.category, Category::Routers);
        assert_eq!((l3.ethernet_adapters, l3.serial_adapters), (2, 2));
        assert_eq!(l3.default_symbol, ":/symbols/router.normal.svg");
        assert_eq!(l3.hover_symbol, ":/symbols/router.selected.svg");
    }

    #[test]
    fn test_settings_depend_only_on_type() {
        for image_type in IouImageType::ALL {
            let expected = image_type.defaults(&TemplateStore::embedded());
            for (name, path) in [("R1", "/a/x.bin"), ("SW9", "other.image")] {
                let mut w = iou_wizard(&[], &[]);
                reach_image_page(&mut w, &[]);
                w.set_name(name);
                w.set_image_source(selector(&w), ImageSource::Manual);
                w.set_image_text(selector(&w), path);
                w.kind_mut().set_image_type(image_type);
                assert!(w.next());

                let settings = w.finish().unwrap();
                assert_eq!(settings.category, expected.category);
                assert_eq!(settings.ethernet_adapters, expected.ethernet_adapters);
                assert_eq!(settings.serial_adapters, expected.serial_adapters);
                assert_eq!(settings.default_symbol, expected.default_symbol);
                assert_eq!(settings.hover_symbol, expected.hover_symbol);
                assert_eq!(settings.initial_config, expected.initial_config);
            }
        }
    }

    #[test]
    fn test_from_path() {
        assert_eq!(IouImageType::from_path("i86bi-linux-l2.bin"), Some(IouImageType::L2));
        assert_eq!(IouImageType::from_path("i86bi-linux-l3.bin"), Some(IouImageType::L3));
        assert_eq!(IouImageType::from_path("l3-with-l2.bin"), Some(IouImageType::L2));
        // Case-sensitive
        assert_eq!(IouImageType::from_path("IOU-L3.bin"), None);
        assert_eq!(IouImageType::from_path("plain.bin"), None);
    }

    #[test]
    fn test_path_heuristic_selects_type() {
        let mut w = iou_wizard(&[], &[]);
        let id = selector(&w);
        w.set_image_source(id, ImageSource::Manual);

        w.set_image_text(id, "/images/i86bi-linux-l3.bin");
        assert_eq!(w.kind().image_type(), IouImageType::L3);

        // Explicit choice sticks until the next edit
        w.kind_mut().set_image_type(IouImageType::L2);
        assert_eq!(w.kind().image_type(), IouImageType::L2);

        w.set_image_text(id, "/images/i86bi-linux-l3-15.bin");
        assert_eq!(w.kind().image_type(), IouImageType::L3);

        w.set_image_text(id, "/images/i86bi-linux-l2.bin");
        assert_eq!(w.kind().image_type(), IouImageType::L2);

        // No hint: type unchanged
        w.set_image_text(id, "/images/unknown.bin");
        assert_eq!(w.kind().image_type(), IouImageType::L2);
    }

    #[test]
    fn test_duplicate_name_blocks() {
        let mut w = iou_wizard(&["R1", "R2"], &[]);
        reach_image_page(&mut w, &["i86bi-linux-l3.bin"]);

        w.set_name("R1");
        assert!(!w.next());
        assert_eq!(w.page(), WizardPage::NameAndImage);
        let dialog = w.take_dialog().unwrap();
        assert_eq!(dialog.level, DialogLevel::Critical);
        assert_eq!(dialog.message, "R1 is already used, please choose another name");

        w.set_name("r1");
        assert!(w.next());
        assert!(w.back());

        w.set_name("R3");
        assert!(w.next());
        assert_eq!(w.page(), WizardPage::Review);
    }

    #[test]
    fn test_mandatory_fields() {
        let mut w = iou_wizard(&[], &[]);
        reach_image_page(&mut w, &[]);

        assert!(!w.next());
        assert_eq!(w.take_dialog().unwrap().message, "Please enter a name");

        w.set_name("R1");
        assert!(!w.next());
        assert_eq!(w.take_dialog().unwrap().message, "Please select or enter an image");
    }

    #[test]
    fn test_remote_choice_warns_about_image_path() {
        let mut w = iou_wizard(&[], &[("10.0.0.5", 8000)]);
        w.set_server_choice(ServerChoice::Remote);
        assert!(w.next());

        let dialog = w.take_dialog().unwrap();
        assert_eq!(dialog.level, DialogLevel::Warning);
        assert_eq!(dialog.title, "IOU image");
        let request = w.take_fetch_request().unwrap();
        assert_eq!(request.server, Server::Remote(ServerAddress::new("10.0.0.5", 8000)));
    }

    #[test]
    fn test_local_choice_does_not_warn() {
        let mut w = iou_wizard(&[], &[]);
        assert!(w.next());
        assert!(w.pending_dialog().is_none());
    }

    #[test]
    fn test_end_to_end_local_existing_image() {
        let mut w = iou_wizard(&["R2"], &[]);
        reach_image_page(&mut w, &["vios-l2.bin", "vios-l3.bin"]);
        w.set_name("R1");
        assert!(w.next());

        let settings = w.finish().unwrap();
        assert_eq!(settings.name, "R1");
        assert_eq!(settings.path, "vios-l2.bin");
        assert_eq!(settings.image, "vios-l2.bin");
        assert_eq!(settings.server, "local");
        assert_eq!(settings.category, Category::Switches);
        assert_eq!(settings.ethernet_adapters, 4);
        assert_eq!(settings.serial_adapters, 0);
        assert_eq!(settings.default_symbol, ":/symbols/multilayer_switch.normal.svg");
        assert!(settings.initial_config.contains("hostname %h"));
    }

    #[test]
    fn test_selecting_l3_entry_switches_type() {
        let mut w = iou_wizard(&[], &[]);
        reach_image_page(&mut w, &["vios-l2.bin", "vios-l3.bin"]);
        let id = selector(&w);

        w.select_image(id, 1);
        assert_eq!(w.kind().image_type(), IouImageType::L3);
        w.set_name("R1");
        assert!(w.next());

        let settings = w.finish().unwrap();
        assert_eq!(settings.path, "vios-l3.bin");
        assert_eq!(settings.category, Category::Routers);
    }

    #[test]
    fn test_remote_server_tokens() {
        let remotes = [("10.0.0.5", 8000), ("10.0.0.6", 8001)];

        // Manual choice uses the chooser text
        let mut w = iou_wizard(&[], &remotes);
        w.set_server_choice(ServerChoice::Remote);
        w.select_remote(1);
        reach_image_page(&mut w, &["i86bi-l2.bin"]);
        w.set_name("SW1");
        assert!(w.next());
        assert_eq!(w.finish().unwrap().server, "10.0.0.6:8001");

        // Load balance picks the first registered server
        let mut w = iou_wizard(&[], &remotes);
        w.set_server_choice(ServerChoice::Remote);
        w.select_remote(1);
        w.set_load_balance(true);
        reach_image_page(&mut w, &["i86bi-l2.bin"]);
        w.set_name("SW1");
        assert!(w.next());
        assert_eq!(w.finish().unwrap().server, "10.0.0.5:8000");
    }

    #[test]
    fn test_cloud_server_token() {
        let mut w = iou_wizard(&[], &[]);
        w.set_server_choice(ServerChoice::Cloud);
        assert!(w.next());
        w.take_dialog();

        let id = selector(&w);
        w.set_image_source(id, ImageSource::Manual);
        w.set_image_text(id, "/images/i86bi-linux-l3.bin");
        w.set_name("R1");
        assert!(w.next());

        let settings = w.finish().unwrap();
        assert_eq!(settings.server, "cloud");
        assert_eq!(settings.image, "i86bi-linux-l3.bin");
    }

    #[test]
    fn test_cloud_choice_lists_local_images() {
        let mut w = iou_wizard(&[], &[("10.0.0.5", 8000)]);
        w.set_server_choice(ServerChoice::Cloud);
        assert!(w.next());

        let request = w.take_fetch_request().unwrap();
        assert_eq!(request.server, Server::Local(ServerAddress::new("127.0.0.1", 8000)));
        assert_eq!(request.endpoint, IOU_IMAGES_ENDPOINT);

        w.images_loaded(request.generation, Ok(vec![ImageEntry::named("i86bi-linux-l2.bin")]));
        let sel = w.core().selector(selector(&w)).unwrap();
        assert_eq!(sel.text(), "i86bi-linux-l2.bin");
        assert!(w
            .take_dialog()
            .into_iter()
            .all(|d| d.level == DialogLevel::Warning));
        assert!(w.take_dialog().is_none());
    }

    #[test]
    fn test_forced_local_server() {
        let kind = IouDevice::new(Vec::new(), TemplateStore::embedded(), true);
        let mut w = DeviceWizard::new(kind, registry(&[("10.0.0.5", 8000)]), ENV);

        assert_eq!(w.page(), WizardPage::NameAndImage);
        assert!(w.take_fetch_request().unwrap().server.is_local());
        assert!(w.pending_dialog().is_none());
    }

    #[test]
    fn test_local_supported_when_forced() {
        assert!(IouDevice::local_supported(true));
    }
}
