//! Shared mock collaborators for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use courier_assignment::{
    AssignmentBackend, AssignmentStatus, Session, ShippingAssignment, StatusUpdate,
};
use courier_core::{CourierError, GeoPoint, PositionSample, Result, SubscriptionHandle};
use courier_location::{LocationProvider, PositionUpdates};
use courier_map::PositionReporter;
use courier_route::provider::{
    DirectionsRequest, DirectionsResponse, EncodedPath, ProviderLeg, ProviderRoute, TextValue,
};
use courier_route::RoutingProvider;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

/// Get the path to test fixtures
pub fn fixtures_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("tests").join("fixtures")
}

pub fn point(lat: f64, lng: f64) -> GeoPoint {
    GeoPoint::new(lat, lng).unwrap()
}

/// Yield until `condition` holds, failing after a generous bound
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Routing
// ============================================================================

/// Provider response with one route from origin to destination
pub fn directions(
    request: &DirectionsRequest,
    distance: &str,
    duration: &str,
) -> DirectionsResponse {
    DirectionsResponse {
        routes: vec![ProviderRoute {
            legs: vec![ProviderLeg {
                distance: Some(TextValue {
                    text: distance.to_string(),
                    value: None,
                }),
                duration: Some(TextValue {
                    text: duration.to_string(),
                    value: None,
                }),
            }],
            overview_polyline: Some(EncodedPath {
                points: courier_core::geo::encode_polyline(&[request.origin, request.destination]),
            }),
        }],
    }
}

/// Answers every request immediately with a fixed distance/duration
pub struct InstantRoutingProvider {
    pub distance: String,
    pub duration: String,
}

impl InstantRoutingProvider {
    pub fn new(distance: &str, duration: &str) -> Self {
        Self {
            distance: distance.to_string(),
            duration: duration.to_string(),
        }
    }
}

#[async_trait]
impl RoutingProvider for InstantRoutingProvider {
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse> {
        Ok(directions(request, &self.distance, &self.duration))
    }
}

type PendingDirections = (DirectionsRequest, oneshot::Sender<Result<DirectionsResponse>>);

/// Holds every request open until the test resolves it
#[derive(Default)]
pub struct GatedRoutingProvider {
    pending: Mutex<Vec<PendingDirections>>,
}

impl GatedRoutingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.lock().len()
    }

    /// Take the gates in request order
    pub fn take(&self) -> Vec<PendingDirections> {
        std::mem::take(&mut *self.pending.lock())
    }
}

#[async_trait]
impl RoutingProvider for GatedRoutingProvider {
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().push((*request, tx));
        rx.await
            .unwrap_or_else(|_| Err(CourierError::network("request dropped")))
    }
}

// ============================================================================
// Location
// ============================================================================

/// Location provider driven by the test through per-subscription senders
pub struct ScriptedLocationProvider {
    permission: bool,
    position: Mutex<Result<GeoPoint>>,
    feeds: Mutex<HashMap<SubscriptionHandle, mpsc::Sender<Result<GeoPoint>>>>,
    released: Mutex<Vec<SubscriptionHandle>>,
}

impl ScriptedLocationProvider {
    pub fn new(permission: bool, position: Result<GeoPoint>) -> Self {
        Self {
            permission,
            position: Mutex::new(position),
            feeds: Mutex::new(HashMap::new()),
            released: Mutex::new(Vec::new()),
        }
    }

    pub fn feed(&self, handle: SubscriptionHandle) -> mpsc::Sender<Result<GeoPoint>> {
        self.feeds
            .lock()
            .get(&handle)
            .cloned()
            .expect("no open feed for handle")
    }

    pub fn released(&self) -> Vec<SubscriptionHandle> {
        self.released.lock().clone()
    }
}

#[async_trait]
impl LocationProvider for ScriptedLocationProvider {
    async fn request_permission(&self) -> bool {
        self.permission
    }

    async fn current_position(&self) -> Result<GeoPoint> {
        self.position.lock().clone()
    }

    fn subscribe(&self, handle: SubscriptionHandle) -> Result<PositionUpdates> {
        let (tx, rx) = mpsc::channel(32);
        self.feeds.lock().insert(handle, tx);
        Ok(rx)
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.feeds.lock().remove(&handle);
        self.released.lock().push(handle);
    }
}

// ============================================================================
// Position reporting
// ============================================================================

/// Records reported samples; can be told to reject them
#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<PositionSample>>,
    reject: bool,
}

impl RecordingReporter {
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Default::default()
        }
    }

    pub fn reports(&self) -> Vec<PositionSample> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl PositionReporter for RecordingReporter {
    async fn report(&self, sample: &PositionSample) -> Result<()> {
        self.reports.lock().push(*sample);
        if self.reject {
            Err(CourierError::network("sink unavailable"))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Assignment backend
// ============================================================================

pub const COURIER_ID: &str = "staff-7";

pub fn assignment(id: &str, status: AssignmentStatus) -> ShippingAssignment {
    let now = Utc::now();
    ShippingAssignment {
        id: id.to_string(),
        order_id: format!("order-{}", id),
        status,
        courier_id: (status != AssignmentStatus::Pending).then(|| COURIER_ID.to_string()),
        is_cod_collected: false,
        is_cod_transferred: false,
        total_amount: None,
        shipping_fee: None,
        failure_reason: None,
        note: None,
        cod_collect_date: None,
        delivered_date: None,
        returned_date: None,
        created_at: now,
        updated_at: now,
    }
}

/// Backend keeping assignments in memory and applying confirmed updates
#[derive(Default)]
pub struct InMemoryBackend {
    store: Mutex<HashMap<String, ShippingAssignment>>,
    failure: Mutex<Option<CourierError>>,
    calls: Mutex<usize>,
}

impl InMemoryBackend {
    pub fn with(assignments: impl IntoIterator<Item = ShippingAssignment>) -> Self {
        let backend = Self::default();
        for a in assignments {
            backend.store.lock().insert(a.id.clone(), a);
        }
        backend
    }

    /// Fail every call with `err` from now on
    pub fn fail_with(&self, err: CourierError) {
        *self.failure.lock() = Some(err);
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }

    pub fn stored(&self, id: &str) -> Option<ShippingAssignment> {
        self.store.lock().get(id).cloned()
    }

    fn enter(&self) -> Result<()> {
        *self.calls.lock() += 1;
        match self.failure.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn get(&self, id: &str) -> Result<ShippingAssignment> {
        self.stored(id)
            .ok_or_else(|| CourierError::validation(format!("shipping log {} not found", id)))
    }
}

#[async_trait]
impl AssignmentBackend for InMemoryBackend {
    async fn available(&self, _session: &Session) -> Result<Vec<ShippingAssignment>> {
        self.enter()?;
        Ok(self
            .store
            .lock()
            .values()
            .filter(|a| a.courier_id.is_none())
            .cloned()
            .collect())
    }

    async fn my_deliveries(&self, _session: &Session) -> Result<Vec<ShippingAssignment>> {
        self.enter()?;
        Ok(self
            .store
            .lock()
            .values()
            .filter(|a| a.is_assigned_to(COURIER_ID))
            .cloned()
            .collect())
    }

    async fn detail(&self, _session: &Session, id: &str) -> Result<ShippingAssignment> {
        self.enter()?;
        self.get(id)
    }

    async fn by_order(
        &self,
        _session: &Session,
        order_id: &str,
    ) -> Result<Vec<ShippingAssignment>> {
        self.enter()?;
        Ok(self
            .store
            .lock()
            .values()
            .filter(|a| a.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn assign_to_me(&self, _session: &Session, id: &str) -> Result<ShippingAssignment> {
        self.enter()?;
        let mut a = self.get(id)?;
        if a.courier_id.is_some() {
            return Err(CourierError::conflict(format!(
                "shipping log {} is already assigned",
                id
            )));
        }
        a.status = AssignmentStatus::Assigned;
        a.courier_id = Some(COURIER_ID.to_string());
        a.updated_at = Utc::now();
        self.store.lock().insert(id.to_string(), a.clone());
        Ok(a)
    }

    async fn update_status(
        &self,
        _session: &Session,
        id: &str,
        update: &StatusUpdate,
    ) -> Result<ShippingAssignment> {
        self.enter()?;
        let mut a = self.get(id)?;
        let now = Utc::now();
        a.status = update.status;
        a.note = update.note.clone().or(a.note);
        a.failure_reason = update.unexpected_case.clone().or(a.failure_reason);
        if let Some(collected) = update.is_cod_collected {
            a.is_cod_collected = collected;
            if collected {
                a.cod_collect_date = Some(now);
            }
        }
        if update.total_amount.is_some() {
            a.total_amount = update.total_amount;
        }
        match update.status {
            AssignmentStatus::Delivered => a.delivered_date = Some(now),
            AssignmentStatus::Returned => a.returned_date = Some(now),
            _ => {}
        }
        a.updated_at = now;
        self.store.lock().insert(id.to_string(), a.clone());
        Ok(a)
    }
}
