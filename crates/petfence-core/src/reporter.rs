//! Forwarding of the collar status to an external collector.
//!
//! Each published status is POSTed once as JSON. Nothing is retried and no
//! failure is propagated; the outcome is only logged.

use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{PetfenceError, Result};
use crate::status::{epoch_seconds, PetStatus};

/// Upper bound for one forwarding request.
pub const FORWARD_TIMEOUT: Duration = Duration::from_secs(10);

/// Body sent to the collector.
#[derive(Debug, Serialize)]
pub struct StatusPayload<'a> {
    /// Epoch seconds at which the payload was built.
    pub timestamp: f64,
    /// Collar identifier, see [`Config::pet_id`].
    pub pet_id: &'a str,
    /// The status being forwarded.
    pub status: &'a PetStatus,
}

/// What happened to a forwarding attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    /// No collector URL is configured.
    Skipped,
    /// The collector answered 200 or 201.
    Delivered(u16),
    /// The collector answered with any other status code.
    Rejected(u16),
    /// The request never completed.
    Failed(String),
}

/// HTTP client for the external collector.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    client: reqwest::Client,
}

impl StatusReporter {
    /// Create a reporter with the default 10 second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`PetfenceError::HttpClient`] if the client cannot be built.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FORWARD_TIMEOUT)
            .build()
            .map_err(|e| PetfenceError::HttpClient(e.to_string()))?;
        Ok(Self::from_client(client))
    }

    /// Wrap an already configured client.
    #[must_use]
    pub const fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Forward `status` to the URL configured in `config`, if any.
    pub async fn report(&self, config: &Config, status: &PetStatus) -> ReportOutcome {
        let Some(url) = config.status_url() else {
            debug!("No status URL configured, not forwarding");
            return ReportOutcome::Skipped;
        };

        let payload = StatusPayload {
            timestamp: epoch_seconds(Utc::now()),
            pet_id: config.pet_id(),
            status,
        };

        match self.client.post(url).json(&payload).send().await {
            Ok(response) => {
                let code = response.status();
                if code == StatusCode::OK || code == StatusCode::CREATED {
                    info!(%url, status = code.as_u16(), "Status forwarded");
                    ReportOutcome::Delivered(code.as_u16())
                } else {
                    let body = response.text().await.unwrap_or_default();
                    warn!(%url, status = code.as_u16(), %body, "Collector rejected status");
                    ReportOutcome::Rejected(code.as_u16())
                }
            }
            Err(e) => {
                let err = PetfenceError::ForwardingFailed(e.to_string());
                warn!(%url, error = %err, "Could not reach collector");
                ReportOutcome::Failed(e.to_string())
            }
        }
    }
}
