//! Unified error types for the petfence core library.
//!
//! [`PetfenceError`] covers every failure mode of the system. Most of them are
//! never fatal: scan failures degrade to an unknown reading, forwarding
//! failures are logged and dropped, and unreadable configuration falls back to
//! defaults. The variants still carry enough context to be logged or surfaced
//! through the HTTP API.
//!
//! # Example
//!
//! ```rust
//! use petfence_core::error::{PetfenceError, Result};
//!
//! fn check_radius(radius: f64) -> Result<f64> {
//!     if radius <= 0.0 {
//!         return Err(PetfenceError::InvalidRadius(format!("{radius} is not positive")));
//!     }
//!     Ok(radius)
//! }
//!
//! assert!(check_radius(-1.0).is_err());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all petfence operations.
#[derive(Debug, Error)]
pub enum PetfenceError {
    // =========================================================================
    // BLUETOOTH ERRORS
    // =========================================================================
    /// No Bluetooth adapter was found on this system.
    #[error(
        "No Bluetooth adapter found. Ensure Bluetooth hardware is present and drivers are loaded."
    )]
    BluetoothAdapterNotFound,

    /// The Bluetooth adapter exists but could not be powered on.
    #[error("Bluetooth adapter is powered off. Run 'bluetoothctl power on' to enable.")]
    BluetoothAdapterPoweredOff,

    /// Device discovery failed.
    #[error("Bluetooth scan failed: {0}")]
    BluetoothScanFailed(String),

    /// The scan primitive did not return within its hard limit.
    #[error("Bluetooth scan timed out after {secs} seconds")]
    ScanTimeout {
        /// Seconds waited before giving up.
        secs: u64,
    },

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration {}: {source}", .path.display())]
    ConfigRead {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file could not be written.
    #[error("Failed to write configuration {}: {source}", .path.display())]
    ConfigWrite {
        /// File that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for the expected shape.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// The configuration parsed but holds invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),

    /// A perimeter radius update was rejected.
    #[error("Invalid perimeter radius: {0}")]
    InvalidRadius(String),

    // =========================================================================
    // FORWARDING ERRORS
    // =========================================================================
    /// The HTTP client used for forwarding could not be built.
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),

    /// The external collector could not be reached or refused the payload.
    #[error("Status forwarding failed: {0}")]
    ForwardingFailed(String),
}

/// A specialized [`Result`] type for petfence operations.
pub type Result<T> = std::result::Result<T, PetfenceError>;

impl From<serde_json::Error> for PetfenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigParse(err.to_string())
    }
}

impl PetfenceError {
    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigRead { .. }
                | Self::ConfigWrite { .. }
                | Self::ConfigParse(_)
                | Self::ConfigValidation(_)
        )
    }

    /// Returns `true` if the next monitor tick may succeed without intervention.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::BluetoothScanFailed(_) | Self::ScanTimeout { .. } | Self::ForwardingFailed(_)
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidRadius(_) => 400,

            Self::ConfigRead { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigParse(_)
            | Self::ConfigValidation(_) => 500,

            Self::ForwardingFailed(_) | Self::HttpClient(_) => 502,

            Self::BluetoothAdapterNotFound
            | Self::BluetoothAdapterPoweredOff
            | Self::BluetoothScanFailed(_)
            | Self::ScanTimeout { .. } => 503,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::BluetoothAdapterNotFound => "BLUETOOTH_ADAPTER_NOT_FOUND",
            Self::BluetoothAdapterPoweredOff => "BLUETOOTH_ADAPTER_POWERED_OFF",
            Self::BluetoothScanFailed(_) => "BLUETOOTH_SCAN_FAILED",
            Self::ScanTimeout { .. } => "SCAN_TIMEOUT",
            Self::ConfigRead { .. } => "CONFIG_READ_ERROR",
            Self::ConfigWrite { .. } => "CONFIG_WRITE_ERROR",
            Self::ConfigParse(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidation(_) => "CONFIG_VALIDATION_ERROR",
            Self::InvalidRadius(_) => "INVALID_RADIUS",
            Self::HttpClient(_) => "HTTP_CLIENT_ERROR",
            Self::ForwardingFailed(_) => "FORWARDING_FAILED",
        }
    }
}
