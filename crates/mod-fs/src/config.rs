//! Configuration loading and saving

use crate::{Error, NormalizedPath, Result, io};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Host used to expand short mod names.
pub const DEFAULT_HOST: &str = "github.com";

/// Organisation used to expand single-segment mod names.
pub const DEFAULT_ORG: &str = "turbot";

/// Format-agnostic configuration store.
///
/// Format is detected from the file extension (`.toml` or `.json`).
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a file.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let content = io::read_text(path)?;
        let extension = path.extension().unwrap_or("");

        match extension.to_lowercase().as_str() {
            "toml" => toml::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_native(),
                format: "TOML".into(),
                message: e.to_string(),
            }),
            "json" => serde_json::from_str(&content).map_err(|e| Error::ConfigParse {
                path: path.to_native(),
                format: "JSON".into(),
                message: e.to_string(),
            }),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    /// Load configuration, falling back to `T::default()` for a missing file.
    pub fn load_or_default<T: DeserializeOwned + Default>(
        &self,
        path: &NormalizedPath,
    ) -> Result<T> {
        if !path.exists() {
            tracing::debug!(path = %path, "config file absent, using defaults");
            return Ok(T::default());
        }
        self.load(path)
    }

    /// Save configuration to a file atomically.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let extension = path.extension().unwrap_or("");

        let content = match extension.to_lowercase().as_str() {
            "toml" => toml::to_string_pretty(value).map_err(|e| Error::ConfigSerialize {
                path: path.to_native(),
                format: "TOML".into(),
                message: e.to_string(),
            })?,
            "json" => serde_json::to_string_pretty(value).map_err(|e| Error::ConfigSerialize {
                path: path.to_native(),
                format: "JSON".into(),
                message: e.to_string(),
            })?,
            _ => {
                return Err(Error::UnsupportedFormat {
                    extension: extension.to_string(),
                });
            }
        };

        io::write_atomic(path, content.as_bytes())
    }
}

/// Workspace settings from `.modctl/settings.toml`.
///
/// ```toml
/// default_host = "github.com"
/// default_org = "acme"
/// mirror = "/srv/mod-mirror"
///
/// [variables]
/// region = "eu-west-1"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host prefix for mod names given without one
    pub default_host: String,
    /// Organisation for mod names given as a single segment
    pub default_org: String,
    /// Local directory mirroring remote mod repositories by full name
    pub mirror: Option<PathBuf>,
    /// Values overriding `variable` defaults
    pub variables: BTreeMap<String, toml::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_host: DEFAULT_HOST.to_string(),
            default_org: DEFAULT_ORG.to_string(),
            mirror: None,
            variables: BTreeMap::new(),
        }
    }
}
