//! Position reporting sinks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use courier_core::{CourierError, PositionSample, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

/// Body sent per watch sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl From<&PositionSample> for PositionReport {
    fn from(sample: &PositionSample) -> Self {
        Self {
            latitude: sample.point.latitude,
            longitude: sample.point.longitude,
            timestamp: sample.timestamp,
        }
    }
}

/// External receiver of live courier positions.
///
/// Calls are fire-and-forget from the tracking session's point of view; a
/// failed report never affects tracking.
#[async_trait]
pub trait PositionReporter: Send + Sync {
    async fn report(&self, sample: &PositionSample) -> Result<()>;
}

/// POSTs each position as JSON to a fixed URL
#[derive(Debug, Clone)]
pub struct HttpPositionReporter {
    url: String,
    client: Client,
    bearer: Option<String>,
}

impl HttpPositionReporter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CourierError::network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
            bearer: None,
        })
    }

    /// Authenticate reports with a bearer token
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }
}

#[async_trait]
impl PositionReporter for HttpPositionReporter {
    async fn report(&self, sample: &PositionSample) -> Result<()> {
        let mut request = self.client.post(&self.url).json(&PositionReport::from(sample));
        if let Some(token) = &self.bearer {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CourierError::network(format!("position report failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CourierError::network(format!(
                "position report rejected ({})",
                response.status()
            )));
        }

        debug!(sequence = sample.sequence, "Position reported");
        Ok(())
    }
}

/// Logs positions instead of sending them
#[derive(Debug, Default)]
pub struct LogPositionReporter;

#[async_trait]
impl PositionReporter for LogPositionReporter {
    async fn report(&self, sample: &PositionSample) -> Result<()> {
        info!(
            sequence = sample.sequence,
            latitude = sample.point.latitude,
            longitude = sample.point.longitude,
            "Courier position"
        );
        Ok(())
    }
}
