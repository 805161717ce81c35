//! Application state shared across handlers.

use std::sync::Arc;

use petfence_core::{Config, ConfigStore, SharedConfig, SharedScan, SharedStatus};
use tokio::sync::{RwLockReadGuard, RwLockWriteGuard};

/// Shared application state.
///
/// The configuration, status, and last-scan cells are the same ones the
/// monitor holds, so handlers always see what the monitor publishes.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SharedConfig,
    store: ConfigStore,
    status: SharedStatus,
    last_scan: SharedScan,
}

impl AppState {
    /// Create new application state around the monitor's shared cells.
    #[must_use]
    pub fn new(
        config: SharedConfig,
        store: ConfigStore,
        status: SharedStatus,
        last_scan: SharedScan,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                status,
                last_scan,
            }),
        }
    }

    /// Get read access to config.
    pub async fn config(&self) -> RwLockReadGuard<'_, Config> {
        self.inner.config.read().await
    }

    /// Get write access to config.
    ///
    /// Holding the guard serializes concurrent updates.
    pub async fn config_mut(&self) -> RwLockWriteGuard<'_, Config> {
        self.inner.config.write().await
    }

    /// File store backing the configuration.
    #[must_use]
    pub fn store(&self) -> &ConfigStore {
        &self.inner.store
    }

    /// Status published by the monitor.
    #[must_use]
    pub fn status(&self) -> &SharedStatus {
        &self.inner.status
    }

    /// Outcome of the latest scan attempt.
    #[must_use]
    pub fn last_scan(&self) -> &SharedScan {
        &self.inner.last_scan
    }
}
