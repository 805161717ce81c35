//! Published collar status and the cells used to share it.
//!
//! The monitor is the only writer. Readers (HTTP handlers) always get a full
//! copy, never a half-updated record.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

/// Message shown before the first tick completes.
pub const WAITING_MESSAGE: &str = "Waiting for first reading...";

/// Latest known state of the collar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "dentro_do_perimetro": true,
    "distancia_aproximada_metros": 2.0,
    "rssi": -65,
    "ultimo_contato_timestamp": 1_760_000_000.5,
    "mensagem": "Inside perimeter (2.00m <= 10m)."
}))]
pub struct PetStatus {
    /// `true` inside, `false` outside or not detected, `null` unknown.
    #[serde(rename = "dentro_do_perimetro")]
    pub inside_perimeter: Option<bool>,

    /// Estimated distance in meters, rounded to centimeters.
    #[serde(rename = "distancia_aproximada_metros")]
    pub distance_m: Option<f64>,

    /// Last RSSI reading in dBm.
    pub rssi: Option<i16>,

    /// Epoch seconds of the last contact.
    #[serde(rename = "ultimo_contato_timestamp")]
    pub last_contact: Option<f64>,

    /// Human-readable summary.
    #[serde(rename = "mensagem")]
    pub message: String,
}

impl Default for PetStatus {
    fn default() -> Self {
        Self {
            inside_perimeter: None,
            distance_m: None,
            rssi: None,
            last_contact: None,
            message: WAITING_MESSAGE.to_string(),
        }
    }
}

/// Outcome of the most recent scan attempt, kept for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ScanResult {
    /// RSSI of the collar, if it was found.
    pub rssi: Option<i16>,

    /// Epoch seconds of the attempt. `null` until the first scan.
    pub timestamp: Option<f64>,
}

/// Shared cell replaced whole by its single writer.
#[derive(Debug, Default)]
pub struct SnapshotCell<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for SnapshotCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SnapshotCell<T> {
    /// Create a cell holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    /// Replace the current value.
    pub async fn publish(&self, value: T) {
        *self.inner.write().await = value;
    }

    /// Copy of the current value.
    pub async fn snapshot(&self) -> T {
        self.inner.read().await.clone()
    }
}

/// Status shared between the monitor and the API.
pub type SharedStatus = SnapshotCell<PetStatus>;

/// Last scan shared between the scanner and the API.
pub type SharedScan = SnapshotCell<ScanResult>;

/// Seconds since the Unix epoch with millisecond precision.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn epoch_seconds(at: DateTime<Utc>) -> f64 {
    at.timestamp_millis() as f64 / 1000.0
}
