//! Process settings.
//!
//! Settings are built with the `config` crate from built-in defaults
//! overlaid with `PETFENCE_*` environment variables. The collar
//! configuration itself lives in the JSON file at [`ServerSettings::config_path`].

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Prefix shared by every environment variable read here.
pub const ENV_PREFIX: &str = "PETFENCE";

/// Settings for the server process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP server binds to (`PETFENCE_BIND_ADDR`).
    pub bind_addr: SocketAddr,

    /// Path of the collar configuration file (`PETFENCE_CONFIG_PATH`).
    pub config_path: PathBuf,

    /// Serve HTTPS with a self-signed certificate (`PETFENCE_HTTPS`).
    pub https: bool,

    /// Production logging (`PETFENCE_PRODUCTION`).
    pub production: bool,

    /// Log filter used when `RUST_LOG` is unset (`PETFENCE_LOG_LEVEL`).
    pub log_level: String,

    /// Where production log files go (`PETFENCE_LOG_DIR`).
    pub log_dir: Option<PathBuf>,

    /// Length of one Bluetooth discovery pass (`PETFENCE_SCAN_TIMEOUT_SECS`).
    pub scan_timeout_secs: u64,
}

impl ServerSettings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its setting.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "0.0.0.0:5001")?
            .set_default("config_path", "config.json")?
            .set_default("https", false)?
            .set_default("production", false)?
            .set_default("log_level", "info")?
            .set_default("scan_timeout_secs", 3_i64)?
            .add_source(environment.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Discovery window passed to the scanner. Never shorter than one second.
    #[must_use]
    pub fn scan_window(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Map;

    fn settings_from(vars: &[(&str, &str)]) -> Result<ServerSettings, ConfigError> {
        let source: Map<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ServerSettings::from_environment(Environment::with_prefix(ENV_PREFIX).source(Some(source)))
    }

    #[test]
    fn test_defaults() {
        let settings = settings_from(&[]).unwrap();
        assert_eq!(settings.bind_addr, "0.0.0.0:5001".parse().unwrap());
        assert_eq!(settings.config_path, PathBuf::from("config.json"));
        assert!(!settings.https);
        assert!(!settings.production);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.log_dir, None);
        assert_eq!(settings.scan_window(), Duration::from_secs(3));
    }

    #[test]
    fn test_environment_overrides() {
        let settings = settings_from(&[
            ("PETFENCE_BIND_ADDR", "127.0.0.1:8080"),
            ("PETFENCE_CONFIG_PATH", "/etc/petfence/config.json"),
            ("PETFENCE_HTTPS", "true"),
            ("PETFENCE_PRODUCTION", "true"),
            ("PETFENCE_SCAN_TIMEOUT_SECS", "7"),
            ("PETFENCE_LOG_LEVEL", "petfence_core=debug"),
            ("PETFENCE_LOG_DIR", "/tmp/petfence-logs"),
        ])
        .unwrap();

        assert_eq!(settings.bind_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(
            settings.config_path,
            PathBuf::from("/etc/petfence/config.json")
        );
        assert!(settings.https);
        assert!(settings.production);
        assert_eq!(settings.log_level, "petfence_core=debug");
        assert_eq!(settings.log_dir, Some(PathBuf::from("/tmp/petfence-logs")));
        assert_eq!(settings.scan_window(), Duration::from_secs(7));
    }

    #[test]
    fn test_zero_scan_timeout_is_clamped() {
        let settings = settings_from(&[("PETFENCE_SCAN_TIMEOUT_SECS", "0")]).unwrap();
        assert_eq!(settings.scan_window(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_bind_addr() {
        assert!(settings_from(&[("PETFENCE_BIND_ADDR", "not an address")]).is_err());
    }
}
