//! Delivery map controller.
//!
//! Ties one delivery's map together: acquires a position, requests the route
//! pickup → delivery, and runs at most one live tracking session. Route
//! requests are tagged with an increasing sequence; a response that is not the
//! latest one when it lands is dropped, and stopping tracking invalidates every
//! request still in flight.

use crate::engine::MapEngine;
use crate::metrics::{MapMetrics, MetricsSnapshot};
use crate::renderer::{MapRenderer, RenderState};
use crate::reporter::PositionReporter;
use courier_core::config::{AppConfig, MapConfig};
use courier_core::{
    CourierError, GeoPoint, PositionSample, Result, Route, SubscriptionHandle, TravelMode,
};
use courier_location::LocationTracker;
use courier_route::RouteService;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Controller configuration
#[derive(Debug, Clone, Default)]
pub struct ControllerConfig {
    pub mode: TravelMode,
    pub map: MapConfig,
}

impl From<&AppConfig> for ControllerConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            mode: config.routing.mode,
            map: config.map.clone(),
        }
    }
}

/// Snapshot of the live tracking session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingSession {
    pub active: bool,
    pub last_applied_sequence: Option<u64>,
    pub subscription: Option<SubscriptionHandle>,
    /// Error that closed the last session, if it ended on its own
    pub last_error: Option<CourierError>,
}

/// Result of [`DeliveryMapController::activate`]
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    /// Courier position, or the pickup point when no fix was available
    pub position: GeoPoint,
    /// `true` when `position` is the pickup fallback
    pub degraded: bool,
    /// `None` if the route request was superseded or cancelled
    pub route: Option<Route>,
}

#[derive(Debug, Default)]
struct SessionSlot {
    active: bool,
    subscription: Option<SubscriptionHandle>,
    last_error: Option<CourierError>,
    /// Bumped on every start/stop; callbacks from older sessions are ignored
    epoch: u64,
}

/// Orchestrates position, route and map state for one active delivery.
///
/// Owns the single tracking session and the current route. Route requests are
/// tagged with an increasing sequence number and a response is applied only if
/// no newer request was issued (and tracking was not stopped) meanwhile.
pub struct DeliveryMapController {
    tracker: Arc<LocationTracker>,
    routes: RouteService,
    reporter: Arc<dyn PositionReporter>,
    renderer: Arc<Mutex<MapRenderer>>,
    metrics: Arc<MapMetrics>,
    mode: TravelMode,
    endpoints: Mutex<Option<(GeoPoint, GeoPoint)>>,
    latest_route_request: AtomicU64,
    session: Arc<Mutex<SessionSlot>>,
}

impl DeliveryMapController {
    pub fn new(
        tracker: Arc<LocationTracker>,
        routes: RouteService,
        engine: Arc<dyn MapEngine>,
        reporter: Arc<dyn PositionReporter>,
        config: ControllerConfig,
    ) -> Self {
        let metrics = Arc::new(MapMetrics::new());
        let renderer = MapRenderer::new(engine, config.map, Arc::clone(&metrics));

        Self {
            tracker,
            routes,
            reporter,
            renderer: Arc::new(Mutex::new(renderer)),
            metrics,
            mode: config.mode,
            endpoints: Mutex::new(None),
            latest_route_request: AtomicU64::new(0),
            session: Arc::new(Mutex::new(SessionSlot::default())),
        }
    }

    /// Start showing the delivery from `pickup` to `delivery`.
    ///
    /// Acquires permission, takes one position fix (falling back to the pickup
    /// point when none is available), then computes the pickup to delivery
    /// route. Any tracking session from a previous delivery is closed first.
    ///
    /// # Errors
    /// * `Validation` for out-of-range endpoints
    /// * `PermissionDenied` if location permission is refused
    /// * `Network` / `Decode` from the route request
    #[instrument(skip(self, pickup, delivery), fields(pickup = %pickup, delivery = %delivery))]
    pub async fn activate(&self, pickup: GeoPoint, delivery: GeoPoint) -> Result<Activation> {
        pickup.validate()?;
        delivery.validate()?;
        self.stop_tracking();

        if !self.tracker.request_permission().await {
            return Err(CourierError::permission_denied(
                "location permission was refused",
            ));
        }

        let fix = match self.tracker.sample_current_position().await {
            Ok(sample) => Some(sample),
            Err(CourierError::PositionUnavailable(detail)) => {
                warn!(%detail, "No position fix, using pickup point");
                None
            }
            Err(e) => return Err(e),
        };

        {
            let mut renderer = self.renderer.lock();
            renderer.clear_route();
            renderer.set_endpoints(pickup, delivery);
            if let Some(sample) = fix {
                renderer.apply_position(sample);
            }
        }
        *self.endpoints.lock() = Some((pickup, delivery));

        let route = self.compute_route(pickup, delivery).await?;
        let activation = Activation {
            position: fix.map(|s| s.point).unwrap_or(pickup),
            degraded: fix.is_none(),
            route,
        };

        info!(
            degraded = activation.degraded,
            routed = activation.route.is_some(),
            "Delivery activated"
        );
        Ok(activation)
    }

    /// Request a route and apply it unless superseded.
    ///
    /// Returns `Ok(None)` when a newer request was issued, or tracking was
    /// stopped, before this one completed. Errors from a superseded request
    /// are dropped as well.
    pub async fn compute_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Option<Route>> {
        let request_seq = self.latest_route_request.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(request_seq, "Route requested");

        let result = self
            .routes
            .compute_route(origin, destination, self.mode)
            .await;

        let mut renderer = self.renderer.lock();
        if self.latest_route_request.load(Ordering::SeqCst) != request_seq {
            drop(renderer);
            self.metrics.record_route_discarded();
            debug!(request_seq, "Stale route response discarded");
            return Ok(None);
        }

        let route = result?;
        renderer.set_route(route.clone());
        Ok(Some(route))
    }

    /// Recompute the route for the active delivery
    pub async fn refresh_route(&self) -> Result<Option<Route>> {
        let (pickup, delivery) = self.active_endpoints()?;
        self.compute_route(pickup, delivery).await
    }

    /// Open the tracking session.
    ///
    /// Each sample goes to the renderer and to the position reporter. A
    /// reporter failure is logged and counted only. A provider error closes
    /// the session and is kept as `last_error`.
    pub fn start_tracking(&self) -> Result<SubscriptionHandle> {
        self.active_endpoints()?;

        let mut slot = self.session.lock();
        slot.epoch += 1;
        let epoch = slot.epoch;

        let on_update = {
            let renderer = Arc::clone(&self.renderer);
            let reporter = Arc::clone(&self.reporter);
            let metrics = Arc::clone(&self.metrics);
            move |sample: PositionSample| {
                renderer.lock().apply_position(sample);

                let reporter = Arc::clone(&reporter);
                let metrics = Arc::clone(&metrics);
                tokio::spawn(async move {
                    if let Err(e) = reporter.report(&sample).await {
                        warn!(sequence = sample.sequence, error = %e, "Position report failed");
                        metrics.record_report_failed();
                    }
                });
            }
        };

        let on_error = {
            let session = Arc::clone(&self.session);
            move |err: CourierError| {
                let mut slot = session.lock();
                if slot.epoch != epoch {
                    return;
                }
                error!(error = %err, "Tracking session closed");
                slot.active = false;
                slot.subscription = None;
                slot.last_error = Some(err);
            }
        };

        match self.tracker.watch_position(on_update, on_error) {
            Ok(handle) => {
                slot.active = true;
                slot.subscription = Some(handle);
                slot.last_error = None;
                info!(subscription = %handle, "Tracking started");
                Ok(handle)
            }
            Err(e) => {
                slot.active = false;
                slot.subscription = None;
                Err(e)
            }
        }
    }

    /// Close the tracking session and drop any in-flight route request.
    ///
    /// No position or route callback is observed after this returns.
    /// Idempotent.
    pub fn stop_tracking(&self) {
        self.invalidate_routes();

        let mut slot = self.session.lock();
        slot.epoch += 1;
        self.tracker.stop_watching();
        if slot.active {
            info!("Tracking stopped");
        }
        slot.active = false;
        slot.subscription = None;
    }

    /// Stop tracking and forget the delivery
    pub fn deactivate(&self) {
        self.stop_tracking();
        *self.endpoints.lock() = None;
        self.renderer.lock().clear_route();
        info!("Delivery deactivated");
    }

    pub fn tracking_session(&self) -> TrackingSession {
        let slot = self.session.lock();
        TrackingSession {
            active: slot.active,
            last_applied_sequence: self.renderer.lock().state().last_applied_sequence,
            subscription: slot.subscription,
            last_error: slot.last_error.clone(),
        }
    }

    pub fn current_route(&self) -> Option<Route> {
        self.renderer.lock().route().cloned()
    }

    pub fn render_state(&self) -> RenderState {
        self.renderer.lock().state().clone()
    }

    pub fn center_on_route(&self) -> bool {
        self.renderer.lock().center_on_route()
    }

    pub fn center_on_current_position(&self) -> bool {
        self.renderer.lock().center_on_current_position()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn tracker(&self) -> &Arc<LocationTracker> {
        &self.tracker
    }

    fn active_endpoints(&self) -> Result<(GeoPoint, GeoPoint)> {
        let endpoints = *self.endpoints.lock();
        endpoints.ok_or_else(|| CourierError::validation("no active delivery, call activate first"))
    }

    /// Make every outstanding route request stale.
    ///
    /// Taken under the renderer lock so a response cannot slip in between its
    /// staleness check and applying the route.
    fn invalidate_routes(&self) {
        let _renderer = self.renderer.lock();
        self.latest_route_request.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for DeliveryMapController {
    fn drop(&mut self) {
        self.tracker.stop_watching();
    }
}
