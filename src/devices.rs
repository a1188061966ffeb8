//! Configured devices
//!
//! The wizard produces a [`DeviceSettings`] record; records are kept in a
//! JSON registry so later wizards can refuse duplicate names.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Node category shown in the device palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Routers,
    Switches,
    EndDevices,
    SecurityDevices,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Routers => "routers",
            Category::Switches => "switches",
            Category::EndDevices => "end devices",
            Category::SecurityDevices => "security devices",
        };
        f.write_str(name)
    }
}

/// Final output of a device wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub name: String,
    /// Image path as entered (local path or path on the remote server)
    pub path: String,
    /// Basename of `path`
    pub image: String,
    pub initial_config: String,
    pub ethernet_adapters: u32,
    pub serial_adapters: u32,
    pub default_symbol: String,
    pub hover_symbol: String,
    pub category: Category,
    /// "local", "cloud" or "host:port"
    pub server: String,
}

/// Last path component, accepting both separators since the path may
/// live on another machine
pub fn image_basename(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

/// Devices stored on disk
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    path: PathBuf,
    devices: Vec<DeviceSettings>,
}

impl DeviceRegistry {
    /// Load the registry, starting empty if the file does not exist yet
    pub fn load(path: &Path) -> Result<Self> {
        let devices = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read devices from {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse devices from {:?}", path))?
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            devices,
        })
    }

    pub fn devices(&self) -> &[DeviceSettings] {
        &self.devices
    }

    /// Names of configured devices, for uniqueness checks
    pub fn names(&self) -> Vec<String> {
        self.devices.iter().map(|d| d.name.clone()).collect()
    }

    /// Exact, case-sensitive name lookup
    pub fn contains_name(&self, name: &str) -> bool {
        self.devices.iter().any(|d| d.name == name)
    }

    /// Add a device and persist the registry
    pub fn add(&mut self, settings: DeviceSettings) -> Result<()> {
        if self.contains_name(&settings.name) {
            anyhow::bail!("{} is already used, please choose another name", settings.name);
        }
        info!("Adding device {} ({})", settings.name, settings.server);
        let mut devices = self.devices.clone();
        devices.push(settings);
        self.write(&devices)?;
        self.devices = devices;
        Ok(())
    }

    /// Remove a device by name and persist the registry
    pub fn remove(&mut self, name: &str) -> Result<bool> {
        if !self.contains_name(name) {
            return Ok(false);
        }
        let devices: Vec<DeviceSettings> =
            self.devices.iter().filter(|d| d.name != name).cloned().collect();
        self.write(&devices)?;
        self.devices = devices;
        info!("Removed device {}", name);
        Ok(true)
    }

    /// Persist `devices`; the in-memory list is only replaced once this succeeds
    fn write(&self, devices: &[DeviceSettings]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        let content =
            serde_json::to_string_pretty(devices).context("Failed to serialize devices")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write devices to {:?}", self.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(name: &str) -> DeviceSettings {
        DeviceSettings {
            name: name.to_string(),
            path: "/images/i86bi-linux-l3.bin".to_string(),
            image: "i86bi-linux-l3.bin".to_string(),
            initial_config: String::new(),
            ethernet_adapters: 2,
            serial_adapters: 2,
            default_symbol: ":/symbols/router.normal.svg".to_string(),
            hover_symbol: ":/symbols/router.selected.svg".to_string(),
            category: Category::Routers,
            server: "local".to_string(),
        }
    }

    #[test]
    fn test_image_basename() {
        assert_eq!(image_basename("vios-l2.bin"), "vios-l2.bin");
        assert_eq!(image_basename("/home/user/IOU/vios-l2.bin"), "vios-l2.bin");
        assert_eq!(image_basename("C:\\IOU\\vios-l2.bin"), "vios-l2.bin");
        assert_eq!(image_basename(""), "");
    }

    #[test]
    fn test_category_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Category::Switches).unwrap(), "\"switches\"");
        assert_eq!(
            serde_json::to_string(&Category::SecurityDevices).unwrap(),
            "\"security_devices\""
        );
    }

    #[test]
    fn test_registry_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");

        let mut registry = DeviceRegistry::load(&path).unwrap();
        assert!(registry.devices().is_empty());

        registry.add(device("R1")).unwrap();
        registry.add(device("R2")).unwrap();

        let reloaded = DeviceRegistry::load(&path).unwrap();
        assert_eq!(reloaded.names(), vec!["R1".to_string(), "R2".to_string()]);
        assert_eq!(reloaded.devices()[0], device("R1"));
    }

    #[test]
    fn test_names_are_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = DeviceRegistry::load(&dir.path().join("devices.json")).unwrap();
        registry.add(device("R1")).unwrap();

        assert!(registry.contains_name("R1"));
        assert!(!registry.contains_name("r1"));
        assert!(registry.add(device("R1")).is_err());
    }

    #[test]
    fn test_remove() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("devices.json");
        let mut registry = DeviceRegistry::load(&path).unwrap();
        registry.add(device("R1")).unwrap();

        assert!(registry.remove("R1").unwrap());
        assert!(!registry.remove("R1").unwrap());
        assert!(DeviceRegistry::load(&path).unwrap().devices().is_empty());
    }

    #[test]
    fn test_failed_save_keeps_registry_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("devices.json");

        let mut registry = DeviceRegistry::load(&path).unwrap();
        let err = registry.add(device("R1")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to create directory"));
        assert!(registry.devices().is_empty());
        assert!(!registry.contains_name("R1"));

        // Once the path is writable the same device goes through
        std::fs::remove_file(&blocker).unwrap();
        registry.add(device("R1")).unwrap();
        assert_eq!(DeviceRegistry::load(&path).unwrap().names(), vec!["R1".to_string()]);
    }

    #[test]
    fn test_failed_remove_keeps_device() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        let path = nested.join("devices.json");
        let mut registry = DeviceRegistry::load(&path).unwrap();
        registry.add(device("R1")).unwrap();

        std::fs::remove_dir_all(&nested).unwrap();
        std::fs::write(&nested, "not a directory").unwrap();

        assert!(registry.remove("R1").is_err());
        assert!(registry.contains_name("R1"));
    }
}
