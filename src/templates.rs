//! Base initial-config templates
//!
//! Defaults are embedded from assets/configs; a file with the same name in
//! the user's configs directory takes precedence.

use std::path::{Path, PathBuf};
use tracing::warn;

pub const IOU_L2_BASE_CONFIG: &str = "iou_l2_base_initial-config.txt";
pub const IOU_L3_BASE_CONFIG: &str = "iou_l3_base_initial-config.txt";

const EMBEDDED_TEMPLATES: &[(&str, &str)] = &[
    (
        IOU_L2_BASE_CONFIG,
        include_str!("../assets/configs/iou_l2_base_initial-config.txt"),
    ),
    (
        IOU_L3_BASE_CONFIG,
        include_str!("../assets/configs/iou_l3_base_initial-config.txt"),
    ),
];

/// Lookup of base initial-configs by template file name
#[derive(Debug, Clone)]
pub struct TemplateStore {
    user_dir: Option<PathBuf>,
}

impl TemplateStore {
    /// Embedded templates only
    pub fn embedded() -> Self {
        Self { user_dir: None }
    }

    /// Embedded templates, overridden by files in `dir`
    pub fn with_user_dir(dir: &Path) -> Self {
        Self {
            user_dir: Some(dir.to_path_buf()),
        }
    }

    /// Template text, or an empty string when no template exists
    pub fn base_config(&self, file_name: &str) -> String {
        if let Some(ref dir) = self.user_dir {
            let path = dir.join(file_name);
            if path.is_file() {
                match std::fs::read_to_string(&path) {
                    Ok(content) => return content,
                    Err(e) => warn!("Could not read base config {:?}: {}", path, e),
                }
            }
        }

        EMBEDDED_TEMPLATES
            .iter()
            .find(|(name, _)| *name == file_name)
            .map(|(_, content)| content.to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_templates() {
        let store = TemplateStore::embedded();
        let l2 = store.base_config(IOU_L2_BASE_CONFIG);
        let l3 = store.base_config(IOU_L3_BASE_CONFIG);

        assert!(l2.contains("hostname %h"));
        assert!(l2.contains("spanning-tree"));
        assert!(l3.contains("hostname %h"));
        assert!(!l3.contains("spanning-tree"));
    }

    #[test]
    fn test_unknown_template_is_empty() {
        assert_eq!(TemplateStore::embedded().base_config("nope.txt"), "");
    }

    #[test]
    fn test_user_file_overrides_embedded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(IOU_L3_BASE_CONFIG), "hostname custom\n").unwrap();

        let store = TemplateStore::with_user_dir(dir.path());
        assert_eq!(store.base_config(IOU_L3_BASE_CONFIG), "hostname custom\n");
        // No user file for L2: falls back to the embedded one
        assert!(store.base_config(IOU_L2_BASE_CONFIG).contains("spanning-tree"));
    }
}
