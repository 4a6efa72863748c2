//! Cast receivers
//!
//! Networked playback devices behind one trait. Chromecasts are driven
//! through the catt CLI, which is simpler than speaking the Cast protocol.

use std::fmt;
use std::net::IpAddr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

use crate::models::DeviceKind;

/// Errors from cast devices
#[derive(Debug, Error)]
pub enum CastError {
    #[error("catt not found. Install with: pip install catt")]
    CattNotFound,
    #[error("{action} failed: {message}")]
    CommandFailed { action: String, message: String },
    #[error("failed to run catt: {0}")]
    Io(#[from] std::io::Error),
}

/// Playback options passed along with the stream URL
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayOptions {
    pub title: String,
}

/// A discovered networked playback receiver
#[async_trait]
pub trait CastReceiver: Send + Sync + fmt::Debug {
    fn kind(&self) -> DeviceKind;
    fn name(&self) -> &str;
    /// Start playing `url` on the device
    async fn play(&self, url: &str, options: &PlayOptions) -> Result<(), CastError>;
    async fn stop(&self) -> Result<(), CastError>;
}

// =============================================================================
// Discovery
// =============================================================================

/// A device line from `catt scan`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredDevice {
    pub name: String,
    pub address: IpAddr,
    pub model: Option<String>,
}

impl fmt::Display for DiscoveredDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} ({}) @ {}", self.name, model, self.address),
            None => write!(f, "{} @ {}", self.name, self.address),
        }
    }
}

/// Parse `catt scan` output ("IP - Name - Model" per line)
pub fn parse_catt_scan(output: &str) -> Vec<DiscoveredDevice> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| {
            !line.is_empty() && !line.starts_with("Scanning") && !line.contains("No devices")
        })
        .filter_map(|line| {
            let parts: Vec<&str> = line.splitn(3, " - ").collect();
            if parts.len() < 2 {
                return None;
            }
            let address = parts[0].trim().parse::<IpAddr>().ok()?;
            Some(DiscoveredDevice {
                name: parts[1].trim().to_string(),
                address,
                model: parts.get(2).map(|m| m.trim().to_string()),
            })
        })
        .collect()
}

/// Run `catt scan`, reading stderr too since some catt versions print there
pub async fn discover(catt_path: &str) -> Result<Vec<DiscoveredDevice>, CastError> {
    let output = Command::new(catt_path)
        .arg("scan")
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CastError::CattNotFound,
            _ => CastError::Io(e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut devices = parse_catt_scan(&stdout);
    if devices.is_empty() {
        devices = parse_catt_scan(&String::from_utf8_lossy(&output.stderr));
    }
    debug!("catt scan found {} device(s)", devices.len());
    Ok(devices)
}

// =============================================================================
// catt Receiver
// =============================================================================

/// Chromecast controlled through catt
#[derive(Debug, Clone)]
pub struct CattReceiver {
    catt_path: String,
    device: String,
}

impl CattReceiver {
    pub fn new(device: impl Into<String>) -> Self {
        Self::with_path("catt", device)
    }

    /// Use a custom catt binary
    pub fn with_path(catt_path: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            catt_path: catt_path.into(),
            device: device.into(),
        }
    }

    async fn run(&self, action: &str, extra: &[&str]) -> Result<(), CastError> {
        let result = Command::new(&self.catt_path)
            .arg("-d")
            .arg(&self.device)
            .arg(action)
            .args(extra)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => CastError::CattNotFound,
                _ => CastError::Io(e),
            })?;

        if result.status.success() {
            Ok(())
        } else {
            Err(CastError::CommandFailed {
                action: action.to_string(),
                message: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            })
        }
    }
}

#[async_trait]
impl CastReceiver for CattReceiver {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Chromecast
    }

    fn name(&self) -> &str {
        &self.device
    }

    async fn play(&self, url: &str, options: &PlayOptions) -> Result<(), CastError> {
        info!("casting {} to {}", url, self.device);
        if options.title.is_empty() {
            self.run("cast", &[url]).await
        } else {
            self.run("cast", &["-t", &options.title, url]).await
        }
    }

    async fn stop(&self) -> Result<(), CastError> {
        info!("stopping playback on {}", self.device);
        self.run("stop", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_catt_scan() {
        let output = "Scanning Chromecasts...\n\
                      192.168.1.50 - Living Room TV - Google Inc. Chromecast\n\
                      192.168.1.51 - Kitchen\n\
                      garbage line\n";
        let devices = parse_catt_scan(output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "Living Room TV");
        assert_eq!(devices[0].model.as_deref(), Some("Google Inc. Chromecast"));
        assert_eq!(devices[1].model, None);
        assert_eq!(devices[1].to_string(), "Kitchen @ 192.168.1.51");
    }

    #[test]
    fn test_parse_catt_scan_no_devices() {
        assert!(parse_catt_scan("Scanning Chromecasts...\nNo devices found\n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_catt_binary() {
        let receiver = CattReceiver::with_path("/nonexistent/catt-binary", "TV");
        assert_eq!(receiver.kind(), DeviceKind::Chromecast);
        assert!(matches!(
            receiver.stop().await,
            Err(CastError::CattNotFound)
        ));
    }
}
