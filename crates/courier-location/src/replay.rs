//! Replays a recorded path as if it came from a device sensor.

use crate::provider::{LocationProvider, PositionUpdates};
use async_trait::async_trait;
use courier_core::geo::decode_polyline;
use courier_core::{CourierError, GeoPoint, Result, SubscriptionHandle};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Replay file contents: either a list of points or an encoded polyline.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplayFile {
    Points(Vec<GeoPoint>),
    Polyline { polyline: String },
}

/// Location provider that emits a fixed path at a fixed interval.
///
/// Permission is always granted. The one-shot position is the first point. A
/// subscription emits every point once, then stays open and silent until it is
/// released.
#[derive(Debug)]
pub struct ReplayLocationProvider {
    points: Vec<GeoPoint>,
    interval: Duration,
    feeds: Mutex<HashMap<SubscriptionHandle, JoinHandle<()>>>,
}

impl ReplayLocationProvider {
    /// Create a provider replaying `points`
    pub fn new(points: Vec<GeoPoint>, interval: Duration) -> Result<Self> {
        for point in &points {
            point.validate()?;
        }
        Ok(Self {
            points,
            interval,
            feeds: Mutex::new(HashMap::new()),
        })
    }

    /// Create a provider replaying a decoded polyline
    pub fn from_polyline(encoded: &str, interval: Duration) -> Result<Self> {
        Self::new(decode_polyline(encoded)?, interval)
    }

    /// Load a replay file: a JSON array of `{latitude, longitude}` or `{"polyline": "..."}`
    pub fn from_file<P: AsRef<Path>>(path: P, interval: Duration) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CourierError::validation(format!("cannot read replay file {}: {}", path.display(), e))
        })?;
        let parsed: ReplayFile = serde_json::from_str(&contents).map_err(|e| {
            CourierError::decode(format!("invalid replay file {}: {}", path.display(), e))
        })?;

        match parsed {
            ReplayFile::Points(points) => Self::new(points, interval),
            ReplayFile::Polyline { polyline } => Self::from_polyline(&polyline, interval),
        }
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    /// Number of subscriptions currently feeding
    pub fn open_feeds(&self) -> usize {
        self.feeds.lock().len()
    }
}

#[async_trait]
impl LocationProvider for ReplayLocationProvider {
    async fn request_permission(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<GeoPoint> {
        self.points
            .first()
            .copied()
            .ok_or_else(|| CourierError::position_unavailable("replay path is empty"))
    }

    fn subscribe(&self, handle: SubscriptionHandle) -> Result<PositionUpdates> {
        let (tx, rx) = mpsc::channel(self.points.len().max(1));
        let points = self.points.clone();
        let interval = self.interval.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            for point in points {
                ticker.tick().await;
                if tx.send(Ok(point)).await.is_err() {
                    return;
                }
            }
            // Hold the feed open until released
            tx.closed().await;
        });

        debug!(subscription = %handle, "Replay feed opened");
        self.feeds.lock().insert(handle, task);
        Ok(rx)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        if let Some(task) = self.feeds.lock().remove(&handle) {
            task.abort();
            debug!(subscription = %handle, "Replay feed released");
        }
    }
}
