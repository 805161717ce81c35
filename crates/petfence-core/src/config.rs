//! Collar configuration management.
//!
//! Handles loading, saving, and validating the flat settings record:
//! - Bluetooth device to track (by name or hardware address)
//! - Perimeter radius
//! - Log-distance model calibration (reference power, path-loss exponent)
//! - Scan interval and optional external status URL
//!
//! The record is persisted as a JSON object whose keys are kept compatible
//! with existing `config.json` files (`DEVICE_NAME`, `PERIMETER_RADIUS_METERS`, ...).

use std::ffi::OsString;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::error::{PetfenceError, Result};

/// Name advertised by the collar out of the box.
pub const DEFAULT_DEVICE_NAME: &str = "COLEIRA_PET";

/// Identifier forwarded when neither a device name nor an address is set.
pub const UNKNOWN_PET_ID: &str = "unknown_collar";

static MAC_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2}:){5}[0-9A-Fa-f]{2}$").expect("MAC address pattern is valid")
});

/// Collar monitoring configuration.
///
/// Every key is optional in the file; absent keys take the value from
/// [`Config::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
#[schema(example = json!({
    "DEVICE_NAME": "COLEIRA_PET",
    "DEVICE_MAC_ADDRESS": null,
    "PERIMETER_RADIUS_METERS": 10.0,
    "TX_POWER_AT_1M": -59.0,
    "PATH_LOSS_EXPONENT_N": 2.0,
    "SCAN_INTERVAL_SECONDS": 5,
    "STATUS_UPDATE_URL": null
}))]
pub struct Config {
    /// Advertised name of the collar.
    #[serde(rename = "DEVICE_NAME")]
    pub device_name: Option<String>,

    /// Hardware address of the collar. Takes precedence over the name.
    #[serde(rename = "DEVICE_MAC_ADDRESS")]
    pub device_address: Option<String>,

    /// Geofence radius in meters.
    #[serde(rename = "PERIMETER_RADIUS_METERS")]
    pub perimeter_radius_m: f64,

    /// Expected RSSI at one meter, in dBm.
    #[serde(rename = "TX_POWER_AT_1M")]
    pub tx_power_at_1m: f64,

    /// Environmental attenuation factor (usually 2 to 4).
    #[serde(rename = "PATH_LOSS_EXPONENT_N")]
    pub path_loss_exponent: f64,

    /// Seconds between two monitor ticks.
    #[serde(rename = "SCAN_INTERVAL_SECONDS")]
    pub scan_interval_secs: u64,

    /// External collector receiving every published status.
    #[serde(rename = "STATUS_UPDATE_URL")]
    pub status_update_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_name: Some(DEFAULT_DEVICE_NAME.to_string()),
            device_address: None,
            perimeter_radius_m: 10.0,
            tx_power_at_1m: -59.0,
            path_loss_exponent: 2.0,
            scan_interval_secs: 5,
            status_update_url: None,
        }
    }
}

/// How the collar is identified during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceTarget {
    /// Match on the peripheral's hardware address.
    Address(String),
    /// Match on the peripheral's advertised name.
    Name(String),
}

impl DeviceTarget {
    /// The raw identifier being searched for.
    #[must_use]
    pub fn identifier(&self) -> &str {
        match self {
            Self::Address(value) | Self::Name(value) => value,
        }
    }

    /// Whether the identifier is a hardware address.
    #[must_use]
    pub const fn is_address(&self) -> bool {
        matches!(self, Self::Address(_))
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl Config {
    /// Resolve which device the monitor should look for.
    ///
    /// The address wins when both are configured. Blank values count as
    /// unset. Returns `None` when the collar is not configured at all.
    #[must_use]
    pub fn device_target(&self) -> Option<DeviceTarget> {
        if let Some(address) = non_blank(self.device_address.as_ref()) {
            return Some(DeviceTarget::Address(address.to_string()));
        }
        non_blank(self.device_name.as_ref()).map(|name| DeviceTarget::Name(name.to_string()))
    }

    /// Identifier sent to the external collector.
    #[must_use]
    pub fn pet_id(&self) -> &str {
        non_blank(self.device_name.as_ref())
            .or_else(|| non_blank(self.device_address.as_ref()))
            .unwrap_or(UNKNOWN_PET_ID)
    }

    /// The external status URL, if one is configured.
    #[must_use]
    pub fn status_url(&self) -> Option<&str> {
        non_blank(self.status_update_url.as_ref())
    }

    /// Check every field, reporting all problems at once.
    ///
    /// # Errors
    ///
    /// Returns [`PetfenceError::ConfigValidation`] listing each invalid field.
    pub fn validate(&self) -> Result<()> {
        let problems = self.clone().sanitize();
        if problems.is_empty() {
            Ok(())
        } else {
            Err(PetfenceError::ConfigValidation(problems.join("; ")))
        }
    }

    /// Reset every invalid field to its default and describe what was reset.
    fn sanitize(&mut self) -> Vec<String> {
        let defaults = Self::default();
        let mut problems = Vec::new();

        if let Err(err) = validate_radius(self.perimeter_radius_m) {
            problems.push(err.to_string());
            self.perimeter_radius_m = defaults.perimeter_radius_m;
        }
        if !self.tx_power_at_1m.is_finite() {
            problems.push("TX_POWER_AT_1M must be a finite number".to_string());
            self.tx_power_at_1m = defaults.tx_power_at_1m;
        }
        if !self.path_loss_exponent.is_finite() {
            problems.push("PATH_LOSS_EXPONENT_N must be a finite number".to_string());
            self.path_loss_exponent = defaults.path_loss_exponent;
        }
        if self.scan_interval_secs == 0 {
            problems.push("SCAN_INTERVAL_SECONDS must be at least 1".to_string());
            self.scan_interval_secs = defaults.scan_interval_secs;
        }
        if let Some(address) = non_blank(self.device_address.as_ref()) {
            if !is_valid_mac_address(address) {
                problems.push(format!(
                    "DEVICE_MAC_ADDRESS '{address}' must be in format XX:XX:XX:XX:XX:XX"
                ));
                self.device_address = None;
            }
        }
        if let Some(url) = self.status_url() {
            let problem = match url::Url::parse(url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => None,
                Ok(parsed) => Some(format!(
                    "STATUS_UPDATE_URL scheme '{}' is not http or https",
                    parsed.scheme()
                )),
                Err(e) => Some(format!("STATUS_UPDATE_URL '{url}' is invalid: {e}")),
            };
            if let Some(problem) = problem {
                problems.push(problem);
                self.status_update_url = None;
            }
        }

        problems
    }

    /// Build a record from a parsed file, key by key.
    ///
    /// A key whose value has the wrong type, or fails validation, falls back
    /// to its default without affecting the other keys. Unknown keys are
    /// ignored. Returns the record and a description of every fallback.
    fn from_document(document: &Map<String, Value>) -> (Self, Vec<String>) {
        let mut accepted = Map::new();
        let mut problems = Vec::new();

        for (key, value) in document {
            let mut candidate = accepted.clone();
            candidate.insert(key.clone(), value.clone());
            match serde_json::from_value::<Self>(Value::Object(candidate.clone())) {
                Ok(_) => accepted = candidate,
                Err(e) => problems.push(format!("{key} is not usable: {e}")),
            }
        }

        let mut config = serde_json::from_value::<Self>(Value::Object(accepted))
            .unwrap_or_default();
        problems.extend(config.sanitize());
        (config, problems)
    }
}

/// Validate a perimeter radius: it must be a finite, strictly positive number.
///
/// # Errors
///
/// Returns [`PetfenceError::InvalidRadius`] otherwise.
pub fn validate_radius(radius: f64) -> Result<f64> {
    if !radius.is_finite() {
        return Err(PetfenceError::InvalidRadius(format!(
            "{radius} is not a finite number"
        )));
    }
    if radius <= 0.0 {
        return Err(PetfenceError::InvalidRadius(format!(
            "radius must be positive, got {radius}"
        )));
    }
    Ok(radius)
}

/// Check that a string looks like a Bluetooth hardware address.
#[must_use]
pub fn is_valid_mac_address(address: &str) -> bool {
    MAC_ADDRESS_RE.is_match(address)
}

/// JSON file backing the [`Config`] record.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Create a store for the given file. Nothing is read until [`load`](Self::load).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, filling absent keys with defaults.
    ///
    /// Keys holding a value of the wrong type or an invalid value are logged
    /// and replaced by their defaults; the remaining keys are kept. When the
    /// file does not exist yet, the defaults are written to it and returned.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON object, or
    /// (for a missing file) the defaults cannot be written.
    pub fn load(&self) -> Result<Config> {
        let Some(document) = self.read_document()? else {
            info!(path = %self.path.display(), "No configuration file, writing defaults");
            let defaults = Config::default();
            self.save(&defaults)?;
            return Ok(defaults);
        };

        let (config, problems) = Config::from_document(&document);
        for problem in &problems {
            warn!(path = %self.path.display(), %problem, "Invalid configuration value, using its default");
        }
        debug!(path = %self.path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load the configuration, falling back to defaults on any failure.
    #[must_use]
    pub fn load_or_default(&self) -> Config {
        self.load().unwrap_or_else(|e| {
            warn!(path = %self.path.display(), error = %e, "Using default configuration");
            Config::default()
        })
    }

    /// Persist the full record.
    ///
    /// The JSON is written to a sibling temporary file and renamed over the
    /// target, so readers never see a partially written file.
    ///
    /// # Errors
    ///
    /// Returns [`PetfenceError::ConfigWrite`] if the file cannot be written.
    pub fn save(&self, config: &Config) -> Result<()> {
        self.write_json(config)
    }

    /// Store a new perimeter radius.
    ///
    /// Only `PERIMETER_RADIUS_METERS` is rewritten in the file; every other
    /// key is kept exactly as the user wrote it, including values that
    /// [`load`](Self::load) replaces with defaults. The file is then reloaded
    /// so the caller gets exactly what is now persisted.
    ///
    /// # Errors
    ///
    /// Returns [`PetfenceError::InvalidRadius`] without touching the file if the
    /// radius is invalid, [`PetfenceError::ConfigParse`] without touching it if
    /// the current file is not a JSON object, or a configuration error if
    /// saving or reloading fails.
    pub fn update_radius(&self, radius: f64) -> Result<Config> {
        let radius = validate_radius(radius)?;

        let mut document = match self.read_document()? {
            Some(document) => document,
            None => match serde_json::to_value(Config::default())? {
                Value::Object(document) => document,
                _ => Map::new(),
            },
        };
        document.insert("PERIMETER_RADIUS_METERS".to_string(), Value::from(radius));
        self.write_json(&document)?;

        let reloaded = self.load()?;
        info!(radius_m = reloaded.perimeter_radius_m, "Perimeter radius updated");
        Ok(reloaded)
    }

    /// Read the file as a raw JSON object. `None` when it does not exist.
    fn read_document(&self) -> Result<Option<Map<String, Value>>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PetfenceError::ConfigRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str(&content)? {
            Value::Object(document) => Ok(Some(document)),
            other => Err(PetfenceError::ConfigParse(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let write_error = |source: std::io::Error| PetfenceError::ConfigWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }

        let mut content = serde_json::to_string_pretty(value)?;
        content.push('\n');

        let tmp_path = self.temp_path();
        fs::write(&tmp_path, content).map_err(write_error)?;
        if let Err(source) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(write_error(source));
        }

        debug!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("config.json"), ToOwned::to_owned);
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
