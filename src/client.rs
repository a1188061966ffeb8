//! HTTP access to compute servers
//!
//! Compute servers list the images they can run at endpoints such as
//! `/iou/vms`. Errors come back as `{"message": "..."}`.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::servers::Server;

/// One image reported by a compute server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageEntry {
    pub filename: String,
    /// Every other field of the record (architecture, type hints, ...)
    #[serde(flatten)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl ImageEntry {
    #[cfg(test)]
    pub fn named(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            metadata: serde_json::Map::new(),
        }
    }
}

/// Failure while fetching an image list
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{message}")]
    Backend { status: u16, message: String },
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("cloud servers do not publish an image list")]
    CloudUnsupported,
    #[error("invalid image list: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Something that can list the images available on a server
pub trait ImageListClient {
    fn get_images(&self, server: &Server, endpoint: &str) -> Result<Vec<ImageEntry>, FetchError>;
}

/// Blocking reqwest client; meant to run on a background thread
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, FetchError> {
        let inner = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("device-wizard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { inner })
    }
}

impl ImageListClient for HttpClient {
    fn get_images(&self, server: &Server, endpoint: &str) -> Result<Vec<ImageEntry>, FetchError> {
        let addr = server.address().ok_or(FetchError::CloudUnsupported)?;
        let url = format!("{}{}", addr.base_url(), endpoint);
        debug!("GET {}", url);

        let response = self.inner.get(&url).send()?;
        let status = response.status();
        let body = response.text()?;
        parse_image_list(status.as_u16(), status.canonical_reason(), &body)
    }
}

/// Interpret a server response body as an image list or an error payload
pub fn parse_image_list(
    status: u16,
    reason: Option<&str>,
    body: &str,
) -> Result<Vec<ImageEntry>, FetchError> {
    if (200..300).contains(&status) {
        return Ok(serde_json::from_str(body)?);
    }

    let message = serde_json::from_str::<ErrorPayload>(body)
        .map(|p| p.message)
        .unwrap_or_else(|_| match reason {
            Some(reason) => format!("HTTP {} {}", status, reason),
            None => format!("HTTP {}", status),
        });
    Err(FetchError::Backend { status, message })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success_keeps_metadata() {
        let body = r#"[
            {"filename": "i86bi-linux-l2.bin", "path": "/images/IOU/i86bi-linux-l2.bin", "filesize": 1024},
            {"filename": "i86bi-linux-l3.bin"}
        ]"#;

        let images = parse_image_list(200, Some("OK"), body).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].filename, "i86bi-linux-l2.bin");
        assert_eq!(images[0].metadata["filesize"], 1024);
        assert!(images[1].metadata.is_empty());
    }

    #[test]
    fn test_parse_error_message() {
        let err = parse_image_list(409, Some("Conflict"), r#"{"message": "IOU is not installed"}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "IOU is not installed");
    }

    #[test]
    fn test_parse_error_without_payload() {
        let err = parse_image_list(502, Some("Bad Gateway"), "<html>").unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway");
    }

    #[test]
    fn test_parse_malformed_list() {
        let err = parse_image_list(200, Some("OK"), r#"{"filename": "x"}"#).unwrap_err();
        assert!(matches!(err, FetchError::Payload(_)));
    }

    #[test]
    fn test_cloud_has_no_image_list() {
        let client = HttpClient::new().unwrap();
        let err = client.get_images(&Server::Cloud, "/iou/vms").unwrap_err();
        assert!(matches!(err, FetchError::CloudUnsupported));
    }
}
