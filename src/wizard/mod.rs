//! Device creation wizards

pub mod controller;
pub mod fetch;
pub mod iou;
pub mod selector;
pub mod visibility;

pub use controller::{DeviceKind, DeviceWizard, DialogLevel, WizardEnv, WizardError, WizardPage};
pub use iou::{IouDevice, IouImageType, IOU_IMAGES_ENDPOINT};
pub use selector::{ImageSource, PickerFilter, SelectorId};
