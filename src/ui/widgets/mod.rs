pub mod device_list;
pub mod dialog;

pub use device_list::{build_visual_order, DeviceListWidget};
pub use dialog::{centered_rect, ConfirmDialog, MessageDialog, ProgressDialog};
