use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::servers::{ServerAddress, ServerRegistry};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Compute server running on this machine
    pub local_server: ServerAddress,
    /// Remote compute servers, in preference order
    pub remote_servers: Vec<ServerAddress>,
    /// Always run IOU devices on the local server (skips the server page)
    pub use_local_server: bool,
    /// Offer cloud-provisioned servers in the wizard
    pub enable_cloud: bool,
    /// Registry of configured devices (JSON)
    pub devices_path: PathBuf,
    /// Directory holding user base initial-config templates
    pub configs_path: PathBuf,
    /// Directory the image file browser opens in
    pub images_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        let config_dir = Self::config_dir();

        Self {
            local_server: ServerAddress::new("127.0.0.1", 8000),
            remote_servers: Vec::new(),
            use_local_server: false,
            enable_cloud: false,
            devices_path: config_dir.join("devices.json"),
            configs_path: config_dir.join("configs"),
            images_dir: home.join("IOU"),
        }
    }
}

impl Config {
    /// Load configuration from a specific file, falling back to defaults if it is missing
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", config_path))
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Directory holding config.toml, the device registry and the log file
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("device-wizard")
    }

    /// Get the configuration file path
    pub fn config_file_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Servers known to this configuration
    pub fn server_registry(&self) -> ServerRegistry {
        ServerRegistry::new(self.local_server.clone(), self.remote_servers.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.local_server, ServerAddress::new("127.0.0.1", 8000));
        assert!(config.remote_servers.is_empty());
        assert!(!config.use_local_server);
        assert!(!config.enable_cloud);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
use_local_server = true

[[remote_servers]]
host = "10.0.0.5"
port = 8000

[[remote_servers]]
host = "10.0.0.6"
port = 8001
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.use_local_server);
        assert_eq!(config.remote_servers.len(), 2);
        assert_eq!(config.remote_servers[1].to_string(), "10.0.0.6:8001");
        assert_eq!(config.local_server.port, 8000);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.enable_cloud = true;
        config.remote_servers.push(ServerAddress::new("lab.example.net", 3080));
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert!(reloaded.enable_cloud);
        assert_eq!(reloaded.remote_servers, config.remote_servers);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "use_local_server = [").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
