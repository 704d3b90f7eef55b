//! Location tracker with a single active watch.
//!
//! The tracker gates every position operation on a granted permission, stamps
//! samples with a sequence that only grows, and guarantees that no callback of
//! a stopped watch runs after `stop_watching` returns.

use crate::provider::LocationProvider;
use courier_core::{
    CourierError, GeoPoint, PositionSample, PositionSource, Result, SubscriptionHandle,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};

/// Configuration for the location tracker
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Upper bound on a one-shot position fetch
    pub position_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            position_timeout: Duration::from_secs(15),
        }
    }
}

impl From<&courier_core::config::TrackingConfig> for TrackerConfig {
    fn from(config: &courier_core::config::TrackingConfig) -> Self {
        Self {
            position_timeout: config.position_timeout(),
        }
    }
}

/// The single open watch.
struct ActiveWatch {
    handle: SubscriptionHandle,
    /// Cleared before the watch is torn down. Held for reading while a callback
    /// runs, so clearing it waits out any callback in flight.
    open: Arc<RwLock<bool>>,
    task: JoinHandle<()>,
}

/// Permission-gated access to courier positions.
///
/// Holds at most one watch subscription at a time: starting a new watch stops the
/// previous one first. Every sample the tracker hands out (watch or one-shot)
/// carries a sequence number from one counter that only ever increases.
pub struct LocationTracker {
    provider: Arc<dyn LocationProvider>,
    config: TrackerConfig,
    permission_granted: AtomicBool,
    last_sequence: Arc<AtomicU64>,
    active: Arc<Mutex<Option<ActiveWatch>>>,
}

impl LocationTracker {
    /// Create a tracker over `provider`
    pub fn new(provider: Arc<dyn LocationProvider>, config: TrackerConfig) -> Self {
        Self {
            provider,
            config,
            permission_granted: AtomicBool::new(false),
            last_sequence: Arc::new(AtomicU64::new(0)),
            active: Arc::new(Mutex::new(None)),
        }
    }

    /// Ask the provider for location permission and remember the answer.
    ///
    /// Must return `true` before any position operation succeeds.
    #[instrument(skip(self))]
    pub async fn request_permission(&self) -> bool {
        let granted = self.provider.request_permission().await;
        self.permission_granted.store(granted, Ordering::Release);

        if granted {
            debug!("Location permission granted");
        } else {
            warn!("Location permission denied");
        }
        granted
    }

    /// Whether the last permission request succeeded
    pub fn has_permission(&self) -> bool {
        self.permission_granted.load(Ordering::Acquire)
    }

    fn ensure_permission(&self) -> Result<()> {
        if self.has_permission() {
            Ok(())
        } else {
            Err(CourierError::permission_denied(
                "location permission has not been granted",
            ))
        }
    }

    /// Fetch the current position once.
    ///
    /// # Errors
    /// * `PermissionDenied` if permission was never granted
    /// * `PositionUnavailable` on provider failure or after `position_timeout`
    #[instrument(skip(self))]
    pub async fn get_current_position(&self) -> Result<GeoPoint> {
        self.ensure_permission()?;

        match timeout(self.config.position_timeout, self.provider.current_position()).await {
            Ok(Ok(point)) => Ok(point),
            Ok(Err(e)) => Err(match e {
                CourierError::PositionUnavailable(_) | CourierError::PermissionDenied(_) => e,
                other => CourierError::position_unavailable(other.detail().to_string()),
            }),
            Err(_) => Err(CourierError::position_unavailable(format!(
                "no position fix within {}s",
                self.config.position_timeout.as_secs()
            ))),
        }
    }

    /// Fetch the current position once, stamped as a one-shot sample.
    pub async fn sample_current_position(&self) -> Result<PositionSample> {
        let point = self.get_current_position().await?;
        Ok(PositionSample::new(
            point,
            next_sequence(&self.last_sequence),
            PositionSource::OneShot,
        ))
    }

    /// Start a continuous position watch.
    ///
    /// `on_update` receives every sample in provider order. `on_error` is called at
    /// most once, when the provider reports an error or ends the stream; the watch
    /// is closed and its subscription released before it runs. Neither callback
    /// runs once [`stop_watching`](Self::stop_watching) has returned. Callbacks
    /// must not stop the watch themselves.
    ///
    /// Any watch already open is stopped first. Must be called within a Tokio runtime.
    ///
    /// # Errors
    /// * `PermissionDenied` if permission was never granted
    /// * whatever the provider returns when the subscription cannot be opened
    pub fn watch_position<U, E>(&self, on_update: U, on_error: E) -> Result<SubscriptionHandle>
    where
        U: Fn(PositionSample) + Send + Sync + 'static,
        E: FnOnce(CourierError) + Send + 'static,
    {
        self.ensure_permission()?;

        let mut active = self.active.lock();
        if let Some(previous) = active.take() {
            info!(subscription = %previous.handle, "Replacing active position watch");
            self.close(previous);
        }

        let handle = SubscriptionHandle::new();
        let mut updates = self.provider.subscribe(handle)?;
        let open = Arc::new(RwLock::new(true));

        let task = {
            let open = Arc::clone(&open);
            let last_sequence = Arc::clone(&self.last_sequence);
            let slot = Arc::clone(&self.active);
            let provider = Arc::clone(&self.provider);

            tokio::spawn(async move {
                let failure = loop {
                    match updates.recv().await {
                        Some(Ok(point)) => {
                            let gate = open.read();
                            if !*gate {
                                return;
                            }
                            let sample = PositionSample::new(
                                point,
                                next_sequence(&last_sequence),
                                PositionSource::Watch,
                            );
                            on_update(sample);
                        }
                        Some(Err(e)) => break e,
                        None => break CourierError::position_unavailable("position stream ended"),
                    }
                };

                // Only report the failure if this watch is still the current one
                {
                    let mut slot = slot.lock();
                    match slot.as_ref() {
                        Some(watch) if watch.handle == handle => {
                            *watch.open.write() = false;
                            slot.take();
                            provider.unsubscribe(handle);
                        }
                        _ => return,
                    }
                }

                warn!(subscription = %handle, error = %failure, "Position watch failed");
                on_error(failure);
            })
        };

        info!(subscription = %handle, "Position watch started");
        *active = Some(ActiveWatch { handle, open, task });

        Ok(handle)
    }

    /// Stop the active watch and release its sensor subscription.
    ///
    /// Calling this with no active watch is a no-op.
    pub fn stop_watching(&self) {
        let previous = self.active.lock().take();
        match previous {
            Some(watch) => {
                info!(subscription = %watch.handle, "Position watch stopped");
                self.close(watch);
            }
            None => debug!("stop_watching called with no active watch"),
        }
    }

    fn close(&self, watch: ActiveWatch) {
        *watch.open.write() = false;
        watch.task.abort();
        self.provider.unsubscribe(watch.handle);
    }

    /// Whether a watch is currently open
    pub fn is_watching(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Handle of the open watch, if any
    pub fn active_subscription(&self) -> Option<SubscriptionHandle> {
        self.active.lock().as_ref().map(|watch| watch.handle)
    }

    /// Sequence number of the most recent sample handed out (0 if none)
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        if let Some(watch) = self.active.lock().take() {
            self.close(watch);
        }
    }
}

fn next_sequence(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::AcqRel) + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::PositionUpdates;
    use async_trait::async_trait;
    use courier_core::ErrorKind;
    use std::collections::HashMap;
    use tokio::sync::mpsc;

    struct MockProvider {
        permission: bool,
        position: Result<GeoPoint>,
        fix_delay: Duration,
        senders: Mutex<HashMap<SubscriptionHandle, mpsc::Sender<Result<GeoPoint>>>>,
        released: Mutex<Vec<SubscriptionHandle>>,
    }

    impl MockProvider {
        fn new(permission: bool) -> Self {
            Self {
                permission,
                position: Ok(point(10.7769, 106.7009)),
                fix_delay: Duration::ZERO,
                senders: Mutex::new(HashMap::new()),
                released: Mutex::new(Vec::new()),
            }
        }

        fn sender(&self, handle: SubscriptionHandle) -> mpsc::Sender<Result<GeoPoint>> {
            self.senders.lock().get(&handle).cloned().unwrap()
        }
    }

    #[async_trait]
    impl LocationProvider for MockProvider {
        async fn request_permission(&self) -> bool {
            self.permission
        }

        async fn current_position(&self) -> Result<GeoPoint> {
            tokio::time::sleep(self.fix_delay).await;
            self.position.clone()
        }

        fn subscribe(&self, handle: SubscriptionHandle) -> Result<PositionUpdates> {
            let (tx, rx) = mpsc::channel(16);
            self.senders.lock().insert(handle, tx);
            Ok(rx)
        }

        fn unsubscribe(&self, handle: SubscriptionHandle) {
            self.senders.lock().remove(&handle);
            self.released.lock().push(handle);
        }
    }

    fn point(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    async fn granted_tracker(provider: Arc<MockProvider>) -> LocationTracker {
        let tracker = LocationTracker::new(provider, TrackerConfig::default());
        assert!(tracker.request_permission().await);
        tracker
    }

    #[tokio::test]
    async fn test_operations_require_permission() {
        let tracker =
            LocationTracker::new(Arc::new(MockProvider::new(true)), TrackerConfig::default());

        let err = tracker.get_current_position().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);

        let err = tracker.watch_position(|_| {}, |_| {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
        assert!(!tracker.is_watching());
    }

    #[tokio::test]
    async fn test_refused_permission() {
        let tracker =
            LocationTracker::new(Arc::new(MockProvider::new(false)), TrackerConfig::default());
        assert!(!tracker.request_permission().await);

        let err = tracker.get_current_position().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PermissionDenied);
    }

    #[tokio::test]
    async fn test_current_position() {
        let tracker = granted_tracker(Arc::new(MockProvider::new(true))).await;
        let here = tracker.get_current_position().await.unwrap();
        assert_eq!(here, point(10.7769, 106.7009));

        let sample = tracker.sample_current_position().await.unwrap();
        assert_eq!(sample.source, PositionSource::OneShot);
        assert_eq!(sample.sequence, 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_position_unavailable() {
        let mut provider = MockProvider::new(true);
        provider.position = Err(CourierError::network("location service unreachable"));
        let tracker = granted_tracker(Arc::new(provider)).await;

        let err = tracker.get_current_position().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PositionUnavailable);
        assert!(err.detail().contains("unreachable"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_current_position_timeout() {
        let mut provider = MockProvider::new(true);
        provider.fix_delay = Duration::from_secs(60);
        let tracker = granted_tracker(Arc::new(provider)).await;

        let err = tracker.get_current_position().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PositionUnavailable);
    }

    #[tokio::test]
    async fn test_watch_delivers_ordered_samples() {
        let provider = Arc::new(MockProvider::new(true));
        let tracker = granted_tracker(Arc::clone(&provider)).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = tracker
            .watch_position(move |sample| tx.send(sample).unwrap(), |_| {})
            .unwrap();
        assert_eq!(tracker.active_subscription(), Some(handle));

        let feed = provider.sender(handle);
        feed.send(Ok(point(10.0, 106.0))).await.unwrap();
        feed.send(Ok(point(10.1, 106.1))).await.unwrap();

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.source, PositionSource::Watch);
        assert_eq!(first.point, point(10.0, 106.0));
        assert!(second.sequence > first.sequence);
        assert_eq!(tracker.last_sequence(), second.sequence);
    }

    #[tokio::test]
    async fn test_stop_watching_is_idempotent() {
        let provider = Arc::new(MockProvider::new(true));
        let tracker = granted_tracker(Arc::clone(&provider)).await;

        // No watch yet: no-op
        tracker.stop_watching();
        assert!(provider.released.lock().is_empty());

        let handle = tracker.watch_position(|_| {}, |_| {}).unwrap();
        tracker.stop_watching();
        tracker.stop_watching();

        assert_eq!(*provider.released.lock(), vec![handle]);
        assert!(!tracker.is_watching());
    }

    #[tokio::test]
    async fn test_new_watch_replaces_previous() {
        let provider = Arc::new(MockProvider::new(true));
        let tracker = granted_tracker(Arc::clone(&provider)).await;

        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let first = tracker
            .watch_position(move |s| old_tx.send(s).unwrap(), |_| {})
            .unwrap();
        let old_feed = provider.sender(first);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let second = tracker
            .watch_position(move |s| tx.send(s).unwrap(), |_| {})
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(*provider.released.lock(), vec![first]);
        assert_eq!(tracker.active_subscription(), Some(second));

        // The old subscription is gone; nothing more reaches its callback
        let _ = old_feed.send(Ok(point(1.0, 1.0))).await;
        provider.sender(second).send(Ok(point(2.0, 2.0))).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().point, point(2.0, 2.0));
        assert!(old_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_error_closes_watch() {
        let provider = Arc::new(MockProvider::new(true));
        let tracker = granted_tracker(Arc::clone(&provider)).await;

        let (err_tx, err_rx) = tokio::sync::oneshot::channel();
        let handle = tracker
            .watch_position(|_| {}, move |e| {
                let _ = err_tx.send(e);
            })
            .unwrap();

        provider
            .sender(handle)
            .send(Err(CourierError::position_unavailable("gps disabled")))
            .await
            .unwrap();

        let err = err_rx.await.unwrap();
        assert_eq!(err.kind(), ErrorKind::PositionUnavailable);
        assert!(!tracker.is_watching());
        assert_eq!(*provider.released.lock(), vec![handle]);

        // Already closed: stopping again releases nothing further
        tracker.stop_watching();
        assert_eq!(provider.released.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_sequences_continue_across_watches() {
        let provider = Arc::new(MockProvider::new(true));
        let tracker = granted_tracker(Arc::clone(&provider)).await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let tx2 = tx.clone();
        let first = tracker.watch_position(move |s| tx.send(s).unwrap(), |_| {}).unwrap();
        provider.sender(first).send(Ok(point(1.0, 1.0))).await.unwrap();
        let a = rx.recv().await.unwrap();

        let second = tracker.watch_position(move |s| tx2.send(s).unwrap(), |_| {}).unwrap();
        provider.sender(second).send(Ok(point(2.0, 2.0))).await.unwrap();
        let b = rx.recv().await.unwrap();

        assert!(b.sequence > a.sequence);
    }
}
