//! Compute servers
//!
//! A device runs on the local compute server, on one of the remote servers
//! registered in the configuration, or on a cloud-provisioned server.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Host/port pair of a compute server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Base URL for HTTP requests against this server
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for ServerAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("Expected host:port, got '{}'", s))?;
        if host.is_empty() {
            return Err(format!("Missing host in '{}'", s));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| format!("Invalid port in '{}'", s))?;
        Ok(Self::new(host, port))
    }
}

/// Where a device is going to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServerChoice {
    #[default]
    Local,
    Remote,
    Cloud,
}

impl ServerChoice {
    pub fn label(&self) -> &'static str {
        match self {
            ServerChoice::Local => "Local server",
            ServerChoice::Remote => "Remote server",
            ServerChoice::Cloud => "Cloud",
        }
    }
}

/// A resolved compute target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Server {
    Local(ServerAddress),
    Remote(ServerAddress),
    Cloud,
}

impl Server {
    /// Token stored in device settings: "local", "host:port" or "cloud"
    pub fn token(&self) -> String {
        match self {
            Server::Local(_) => "local".to_string(),
            Server::Remote(addr) => addr.to_string(),
            Server::Cloud => "cloud".to_string(),
        }
    }

    /// Network address, if the server is reachable directly
    pub fn address(&self) -> Option<&ServerAddress> {
        match self {
            Server::Local(addr) | Server::Remote(addr) => Some(addr),
            Server::Cloud => None,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Server::Local(_))
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Server::Local(addr) => write!(f, "local ({})", addr),
            Server::Remote(addr) => write!(f, "{}", addr),
            Server::Cloud => write!(f, "cloud"),
        }
    }
}

/// The local server plus the registered remote servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerRegistry {
    local: ServerAddress,
    remote: Vec<ServerAddress>,
}

impl ServerRegistry {
    pub fn new(local: ServerAddress, remote: Vec<ServerAddress>) -> Self {
        Self { local, remote }
    }

    pub fn local_server(&self) -> Server {
        Server::Local(self.local.clone())
    }

    /// Remote servers in registration order
    pub fn remote_servers(&self) -> &[ServerAddress] {
        &self.remote
    }

    pub fn has_remote_servers(&self) -> bool {
        !self.remote.is_empty()
    }

    /// First registered remote server
    pub fn first_remote(&self) -> Option<&ServerAddress> {
        self.remote.first()
    }

    /// Resolve a "local", "cloud" or "host:port" string
    pub fn resolve(&self, target: &str) -> Result<Server, String> {
        match target {
            "local" => Ok(self.local_server()),
            "cloud" => Ok(Server::Cloud),
            other => other.parse::<ServerAddress>().map(Server::Remote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ServerRegistry {
        ServerRegistry::new(
            ServerAddress::new("127.0.0.1", 8000),
            vec![
                ServerAddress::new("10.0.0.5", 8000),
                ServerAddress::new("10.0.0.6", 8001),
            ],
        )
    }

    #[test]
    fn test_tokens() {
        let reg = registry();
        assert_eq!(reg.local_server().token(), "local");
        assert_eq!(Server::Cloud.token(), "cloud");
        assert_eq!(
            Server::Remote(ServerAddress::new("10.0.0.5", 8000)).token(),
            "10.0.0.5:8000"
        );
    }

    #[test]
    fn test_parse_address() {
        let addr: ServerAddress = "lab.example.net:3080".parse().unwrap();
        assert_eq!(addr.host, "lab.example.net");
        assert_eq!(addr.port, 3080);
        assert_eq!(addr.base_url(), "http://lab.example.net:3080");

        assert!("no-port".parse::<ServerAddress>().is_err());
        assert!(":8000".parse::<ServerAddress>().is_err());
        assert!("host:99999".parse::<ServerAddress>().is_err());
    }

    #[test]
    fn test_first_remote_keeps_registration_order() {
        let reg = registry();
        assert_eq!(reg.first_remote().unwrap().to_string(), "10.0.0.5:8000");
    }

    #[test]
    fn test_resolve() {
        let reg = registry();
        assert!(reg.resolve("local").unwrap().is_local());
        assert_eq!(reg.resolve("cloud").unwrap(), Server::Cloud);
        assert_eq!(
            reg.resolve("10.0.0.6:8001").unwrap(),
            Server::Remote(ServerAddress::new("10.0.0.6", 8001))
        );
        assert!(reg.resolve("bogus").is_err());
    }
}
