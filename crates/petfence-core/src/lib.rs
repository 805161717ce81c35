//! # petfence-core
//!
//! Core logic for the pet collar geofence monitor.
//!
//! This crate provides:
//! - Bluetooth discovery of the collar and RSSI lookup
//! - RSSI to distance estimation and perimeter classification
//! - Configuration loading, validation, and persistence
//! - The periodic monitoring loop and status forwarding
//!
//! ## Architecture
//!
//! - [`bluetooth`] - Scan backends and the collar scanner
//! - [`config`] - Configuration record and its JSON file store
//! - [`distance`] - Log-distance path-loss model
//! - [`monitor`] - Scan, classify, publish, forward
//! - [`reporter`] - HTTP forwarding of the status to a collector
//! - [`status`] - Published status records and shared cells
//! - [`error`] - Unified error type for the crate

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod bluetooth;
pub mod config;
pub mod distance;
pub mod error;
pub mod monitor;
pub mod reporter;
pub mod status;

#[cfg(feature = "bluetooth")]
pub use bluetooth::BluezBackend;
#[cfg(any(test, feature = "mock-bluetooth"))]
pub use bluetooth::MockBackend;
pub use bluetooth::{DeviceScanner, Peripheral, ScanBackend, UnavailableBackend};
pub use config::{Config, ConfigStore, DeviceTarget};
pub use distance::{estimate_distance, Perimeter};
pub use error::{PetfenceError, Result};
pub use monitor::{Monitor, SharedConfig};
pub use reporter::{ReportOutcome, StatusReporter};
pub use status::{PetStatus, ScanResult, SharedScan, SharedStatus};
