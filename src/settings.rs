//! Loading of the endpoint configuration from the persistent settings file.
//!
//! The file is a JSON object keyed by section name, each section mapping string keys to string
//! values:
//!
//! ```json
//! { "MDROID": { "DROK_DEVICE": "/dev/ttyUSB0", "MDROID_HOST": "http://localhost:5353" } }
//! ```

use crate::error::ConfigError;
use reqwest::Url;
use std::{collections::HashMap, path::Path};

/// Section holding the keys below.
pub const DEFAULT_SECTION: &str = "MDROID";
/// Serial device address of the regulation module.
pub const DEVICE_KEY: &str = "DROK_DEVICE";
/// Base URL of the monitoring service.
pub const HOST_KEY: &str = "MDROID_HOST";

/// The whole settings file.
pub type Settings = HashMap<String, HashMap<String, String>>;

/// Where to find the regulator and where to report to. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointConfig {
    pub device_address: String,
    pub monitor_host: Url,
}

/// Read and parse the settings file.
pub fn read_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

impl EndpointConfig {
    /// Load the endpoint configuration from `section` of the settings file at `path`.
    pub fn load(path: &Path, section: &str) -> Result<Self, ConfigError> {
        let settings = read_settings(path)?;
        log::info!("Using settings: {}", serde_json::to_string(&settings)?);
        Self::from_settings(&settings, section)
    }

    pub fn from_settings(settings: &Settings, section: &str) -> Result<Self, ConfigError> {
        let values = settings
            .get(section)
            .ok_or_else(|| ConfigError::MissingSection(section.to_string()))?;
        let lookup = |key: &'static str| {
            values
                .get(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ConfigError::MissingKey {
                    section: section.to_string(),
                    key,
                })
        };

        let device_address = lookup(DEVICE_KEY)?.trim().to_string();
        let host = lookup(HOST_KEY)?.trim();
        let monitor_host = Url::parse(host).map_err(|e| ConfigError::InvalidHost {
            value: host.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            device_address,
            monitor_host,
        })
    }
}
