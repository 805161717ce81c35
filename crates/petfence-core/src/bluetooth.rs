//! Bluetooth Low Energy scanning and collar lookup.
//!
//! This module provides functionality to:
//! - Run a bounded discovery pass through a [`ScanBackend`]
//! - Find the collar among the discovered peripherals by address or name
//! - Keep the last scan outcome for diagnostics
//!
//! A failed scan is never fatal: [`DeviceScanner::scan`] logs it and reports
//! an unknown reading.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, warn};

use crate::config::DeviceTarget;
use crate::error::{PetfenceError, Result};
use crate::status::{epoch_seconds, ScanResult, SharedScan};

#[cfg(feature = "bluetooth")]
pub use bluez::BluezBackend;
#[cfg(any(test, feature = "mock-bluetooth"))]
pub use mock::MockBackend;

/// Length of one discovery pass.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(3);

/// Extra time granted to a backend past its window before the pass is abandoned.
const SCAN_GRACE: Duration = Duration::from_secs(5);

/// A peripheral seen during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peripheral {
    /// Advertised name, if any.
    pub name: Option<String>,
    /// Hardware address (`XX:XX:XX:XX:XX:XX`).
    pub address: String,
    /// Signal strength in dBm, if reported.
    pub rssi: Option<i16>,
}

/// Source of discovery passes.
pub trait ScanBackend: Send + Sync {
    /// Discover reachable peripherals for roughly `window`.
    fn discover(&self, window: Duration) -> impl Future<Output = Result<Vec<Peripheral>>> + Send;
}

/// Backend used when the binary has no Bluetooth support compiled in.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBackend;

impl ScanBackend for UnavailableBackend {
    async fn discover(&self, _window: Duration) -> Result<Vec<Peripheral>> {
        Err(PetfenceError::BluetoothAdapterNotFound)
    }
}

fn is_target(peripheral: &Peripheral, target: &DeviceTarget) -> bool {
    match target {
        DeviceTarget::Address(address) => peripheral.address.eq_ignore_ascii_case(address.trim()),
        DeviceTarget::Name(name) => peripheral
            .name
            .as_deref()
            .is_some_and(|advertised| {
                advertised.trim().to_uppercase() == name.trim().to_uppercase()
            }),
    }
}

/// RSSI of the first peripheral matching `target`, in backend order.
#[must_use]
pub fn find_rssi(peripherals: &[Peripheral], target: &DeviceTarget) -> Option<i16> {
    peripherals
        .iter()
        .find(|p| is_target(p, target))
        .and_then(|p| p.rssi)
}

/// Looks for the collar with a [`ScanBackend`].
#[derive(Debug)]
pub struct DeviceScanner<B> {
    backend: B,
    window: Duration,
    last_scan: SharedScan,
}

impl<B: ScanBackend> DeviceScanner<B> {
    /// Create a scanner that records every attempt into `last_scan`.
    pub fn new(backend: B, last_scan: SharedScan) -> Self {
        Self {
            backend,
            window: DEFAULT_SCAN_WINDOW,
            last_scan,
        }
    }

    /// Override the discovery window.
    #[must_use]
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Cell holding the outcome of the latest attempt.
    pub const fn last_scan(&self) -> &SharedScan {
        &self.last_scan
    }

    /// Run one discovery pass and return the collar's RSSI.
    ///
    /// Returns `None` if the collar was not seen or the scan failed.
    pub async fn scan(&self, target: &DeviceTarget) -> Option<i16> {
        let attempted_at = epoch_seconds(Utc::now());
        debug!(target = %target, by_address = target.is_address(), "Scanning for collar");

        let rssi = match self.discover().await {
            Ok(peripherals) => {
                let rssi = find_rssi(&peripherals, target);
                if rssi.is_none() {
                    debug!(seen = peripherals.len(), target = %target, "Collar not found");
                }
                rssi
            }
            Err(e) if e.is_recoverable() => {
                warn!(error = %e, target = %target, "Bluetooth scan failed");
                None
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), target = %target, "Bluetooth unavailable");
                None
            }
        };

        self.last_scan
            .publish(ScanResult {
                rssi,
                timestamp: Some(attempted_at),
            })
            .await;
        rssi
    }

    async fn discover(&self) -> Result<Vec<Peripheral>> {
        let limit = self.window + SCAN_GRACE;
        tokio::time::timeout(limit, self.backend.discover(self.window))
            .await
            .map_err(|_| PetfenceError::ScanTimeout {
                secs: limit.as_secs(),
            })?
    }
}

#[cfg(feature = "bluetooth")]
mod bluez {
    use std::time::Duration;

    use bluer::{Adapter, AdapterEvent, Session};
    use futures::{pin_mut, StreamExt};
    use tracing::{debug, info};

    use super::{Peripheral, ScanBackend};
    use crate::error::{PetfenceError, Result};

    /// BlueZ backend talking to the default adapter over D-Bus.
    pub struct BluezBackend {
        _session: Session,
        adapter: Adapter,
    }

    impl BluezBackend {
        /// Connect to BlueZ and power the default adapter on if needed.
        ///
        /// # Errors
        ///
        /// Returns an error if there is no adapter or it cannot be powered.
        pub async fn new() -> Result<Self> {
            let session = Session::new()
                .await
                .map_err(|e| PetfenceError::BluetoothScanFailed(e.to_string()))?;
            let adapter = session
                .default_adapter()
                .await
                .map_err(|_| PetfenceError::BluetoothAdapterNotFound)?;

            if !adapter.is_powered().await.unwrap_or(false) {
                adapter
                    .set_powered(true)
                    .await
                    .map_err(|_| PetfenceError::BluetoothAdapterPoweredOff)?;
            }

            info!(adapter = adapter.name(), "Bluetooth adapter ready");
            Ok(Self {
                _session: session,
                adapter,
            })
        }
    }

    impl ScanBackend for BluezBackend {
        async fn discover(&self, window: Duration) -> Result<Vec<Peripheral>> {
            let events = self
                .adapter
                .discover_devices()
                .await
                .map_err(|e| PetfenceError::BluetoothScanFailed(e.to_string()))?;
            pin_mut!(events);

            let mut seen = Vec::new();
            let _ = tokio::time::timeout(window, async {
                while let Some(event) = events.next().await {
                    if let AdapterEvent::DeviceAdded(address) = event {
                        if !seen.contains(&address) {
                            seen.push(address);
                        }
                    }
                }
            })
            .await;

            let mut peripherals = Vec::with_capacity(seen.len());
            for address in seen {
                let device = match self.adapter.device(address) {
                    Ok(device) => device,
                    Err(e) => {
                        debug!(%address, error = %e, "Skipping vanished device");
                        continue;
                    }
                };
                peripherals.push(Peripheral {
                    name: device.name().await.ok().flatten(),
                    address: address.to_string(),
                    rssi: device.rssi().await.ok().flatten(),
                });
            }
            Ok(peripherals)
        }
    }
}

#[cfg(any(test, feature = "mock-bluetooth"))]
mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::time::Duration;

    use super::{Peripheral, ScanBackend};
    use crate::error::{PetfenceError, Result};

    #[derive(Debug, Clone)]
    enum Scripted {
        Found(Vec<Peripheral>),
        Failure(String),
    }

    /// Scripted backend for tests and hardware-free runs.
    ///
    /// Clones share the same script, so a test can keep a handle and change
    /// what the next pass returns.
    #[derive(Debug, Clone)]
    pub struct MockBackend {
        script: Arc<Mutex<Scripted>>,
        calls: Arc<AtomicUsize>,
    }

    impl MockBackend {
        /// Every pass returns `peripherals`.
        #[must_use]
        pub fn new(peripherals: Vec<Peripheral>) -> Self {
            Self {
                script: Arc::new(Mutex::new(Scripted::Found(peripherals))),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        /// Every pass fails with `message`.
        #[must_use]
        pub fn failing(message: impl Into<String>) -> Self {
            let backend = Self::new(Vec::new());
            backend.fail_with(message);
            backend
        }

        /// A peripheral with the given fields.
        #[must_use]
        pub fn peripheral(name: Option<&str>, address: &str, rssi: Option<i16>) -> Peripheral {
            Peripheral {
                name: name.map(str::to_string),
                address: address.to_string(),
                rssi,
            }
        }

        /// Make the following passes return `peripherals`.
        pub fn set_peripherals(&self, peripherals: Vec<Peripheral>) {
            *self.script.lock().unwrap_or_else(PoisonError::into_inner) =
                Scripted::Found(peripherals);
        }

        /// Make the following passes fail.
        pub fn fail_with(&self, message: impl Into<String>) {
            *self.script.lock().unwrap_or_else(PoisonError::into_inner) =
                Scripted::Failure(message.into());
        }

        /// Number of passes run so far.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ScanBackend for MockBackend {
        async fn discover(&self, _window: Duration) -> Result<Vec<Peripheral>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let scripted = self
                .script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            match scripted {
                Scripted::Found(peripherals) => Ok(peripherals),
                Scripted::Failure(message) => Err(PetfenceError::BluetoothScanFailed(message)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Peripheral> {
        vec![
            MockBackend::peripheral(None, "11:22:33:44:55:66", Some(-90)),
            MockBackend::peripheral(Some("  coleira_pet "), "AA:BB:CC:DD:EE:FF", Some(-65)),
            MockBackend::peripheral(Some("COLEIRA_PET"), "AA:BB:CC:DD:EE:00", Some(-40)),
        ]
    }

    fn scanner(backend: MockBackend) -> DeviceScanner<MockBackend> {
        DeviceScanner::new(backend, SharedScan::new(ScanResult::default()))
    }

    #[test]
    fn test_match_by_name_is_trimmed_and_case_insensitive() {
        let target = DeviceTarget::Name("Coleira_Pet".to_string());
        assert_eq!(find_rssi(&sample(), &target), Some(-65));
    }

    #[test]
    fn test_match_by_address_is_case_insensitive() {
        let target = DeviceTarget::Address("aa:bb:cc:dd:ee:00".to_string());
        assert_eq!(find_rssi(&sample(), &target), Some(-40));
    }

    #[test]
    fn test_address_target_ignores_names() {
        let target = DeviceTarget::Address("COLEIRA_PET".to_string());
        assert_eq!(find_rssi(&sample(), &target), None);
    }

    #[test]
    fn test_unnamed_peripherals_never_match_names() {
        let peripherals = vec![MockBackend::peripheral(None, "11:22:33:44:55:66", Some(-50))];
        let target = DeviceTarget::Name(String::new());
        assert_eq!(find_rssi(&peripherals, &target), None);
    }

    #[tokio::test]
    async fn test_scan_records_last_result() {
        let scanner = scanner(MockBackend::new(sample()));
        let rssi = scanner
            .scan(&DeviceTarget::Address("11:22:33:44:55:66".to_string()))
            .await;
        assert_eq!(rssi, Some(-90));

        let last = scanner.last_scan().snapshot().await;
        assert_eq!(last.rssi, Some(-90));
        assert!(last.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_scan_failure_degrades_to_unknown() {
        let backend = MockBackend::failing("org.bluez.Error.NotReady");
        let scanner = scanner(backend.clone());

        let rssi = scanner.scan(&DeviceTarget::Name("REX".to_string())).await;
        assert_eq!(rssi, None);
        assert_eq!(backend.calls(), 1);

        let last = scanner.last_scan().snapshot().await;
        assert_eq!(last.rssi, None);
        assert!(last.timestamp.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_backend_degrades_to_unknown() {
        let scanner = DeviceScanner::new(UnavailableBackend, SharedScan::new(ScanResult::default()))
            .with_window(Duration::from_millis(10));
        assert_eq!(scanner.scan(&DeviceTarget::Name("REX".to_string())).await, None);
    }

    // Built by default; `--no-default-features` drops it.
    #[cfg(feature = "bluetooth")]
    #[test]
    fn test_bluez_backend_plugs_into_the_scanner() {
        fn scanner_for<B: ScanBackend>(_: Option<DeviceScanner<B>>) {}
        scanner_for::<BluezBackend>(None);
    }
}
