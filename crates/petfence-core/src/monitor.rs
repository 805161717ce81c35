//! Periodic collar monitoring.
//!
//! Every tick the monitor scans for the collar, estimates its distance,
//! classifies it against the perimeter, publishes the result, and forwards it
//! to the external collector when one is configured.
//!
//! The configuration is read from the shared record at the start of each
//! tick, so a radius change made through the API applies on the next tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::bluetooth::{DeviceScanner, ScanBackend};
use crate::config::Config;
use crate::distance::{estimate_distance, round_distance, Perimeter};
use crate::reporter::StatusReporter;
use crate::status::{epoch_seconds, PetStatus, SharedStatus};

/// Configuration shared between the monitor and the API.
pub type SharedConfig = Arc<RwLock<Config>>;

/// Message published while no collar is configured.
pub const NOT_CONFIGURED_MESSAGE: &str = "Error: device not configured.";

/// Owns the collar status and drives the scan loop.
pub struct Monitor<B> {
    config: SharedConfig,
    scanner: DeviceScanner<B>,
    reporter: StatusReporter,
    published: SharedStatus,
    current: PetStatus,
}

impl<B: ScanBackend> Monitor<B> {
    /// Create a monitor publishing into `published`.
    pub fn new(
        config: SharedConfig,
        scanner: DeviceScanner<B>,
        reporter: StatusReporter,
        published: SharedStatus,
    ) -> Self {
        Self {
            config,
            scanner,
            reporter,
            published,
            current: PetStatus::default(),
        }
    }

    /// The status computed by the latest tick.
    pub const fn status(&self) -> &PetStatus {
        &self.current
    }

    /// Run one tick and return how long to wait before the next one.
    pub async fn tick(&mut self) -> Duration {
        let config = self.config.read().await.clone();

        let next = self.evaluate(&config).await;
        info!(
            rssi = ?next.rssi,
            distance_m = ?next.distance_m,
            inside = ?next.inside_perimeter,
            message = %next.message,
            "Collar status updated"
        );

        self.published.publish(next.clone()).await;
        self.current = next;
        self.reporter.report(&config, &self.current).await;

        Duration::from_secs(config.scan_interval_secs.max(1))
    }

    /// Tick until `shutdown` resolves.
    ///
    /// A tick or sleep in progress when shutdown fires is abandoned; the
    /// published status is always a complete record.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Collar monitor started");

        loop {
            let interval = tokio::select! {
                () = &mut shutdown => break,
                interval = self.tick() => interval,
            };
            tokio::select! {
                () = &mut shutdown => break,
                () = tokio::time::sleep(interval) => {}
            }
        }

        info!("Collar monitor stopped");
    }

    async fn evaluate(&self, config: &Config) -> PetStatus {
        let now = epoch_seconds(Utc::now());

        let Some(target) = config.device_target() else {
            error!("Collar name or address not configured, check the configuration file");
            return PetStatus {
                inside_perimeter: None,
                distance_m: None,
                rssi: None,
                last_contact: Some(now),
                message: NOT_CONFIGURED_MESSAGE.to_string(),
            };
        };

        match self.scanner.scan(&target).await {
            Some(rssi) => status_from_reading(config, rssi, now),
            // A collar that cannot be heard is treated as outside the perimeter.
            None => PetStatus {
                inside_perimeter: Some(false),
                distance_m: None,
                rssi: None,
                last_contact: self.current.last_contact.or(Some(now)),
                message: format!("Collar '{target}' not detected in the last scan."),
            },
        }
    }
}

fn status_from_reading(config: &Config, rssi: i16, now: f64) -> PetStatus {
    let distance = estimate_distance(
        Some(rssi),
        Some(config.tx_power_at_1m),
        Some(config.path_loss_exponent),
    );
    let radius = config.perimeter_radius_m;
    let perimeter = Perimeter::classify(distance, radius);

    let message = match (perimeter, distance) {
        (Perimeter::Inside, Some(d)) => format!("Inside perimeter ({d:.2}m <= {radius}m)."),
        (Perimeter::Outside, Some(d)) => format!("Outside perimeter ({d:.2}m > {radius}m)."),
        _ => "Could not compute distance (RSSI available, but the estimate failed).".to_string(),
    };

    PetStatus {
        inside_perimeter: perimeter.as_flag(),
        distance_m: distance.map(round_distance),
        rssi: Some(rssi),
        last_contact: Some(now),
        message,
    }
}
