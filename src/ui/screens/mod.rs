pub mod device_list;
pub mod device_wizard;
pub mod help;
