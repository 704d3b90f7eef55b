//! Renderable map state and the commands that push it to a [`MapEngine`].
//!
//! [`MapEngine`]: crate::engine::MapEngine

use crate::engine::{MapCommand, MapEngine, MarkerKind};
use crate::metrics::MapMetrics;
use courier_core::config::MapConfig;
use courier_core::{GeoBounds, GeoPoint, PositionSample, Route};
use std::sync::Arc;
use tracing::{debug, trace};

/// Where the camera was last pointed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraTarget {
    Bounds { bounds: GeoBounds, padding_px: f64 },
    Point { center: GeoPoint, zoom: f64 },
}

/// Renderable map state for one delivery
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderState {
    pub pickup: Option<GeoPoint>,
    pub delivery: Option<GeoPoint>,
    pub courier: Option<GeoPoint>,
    pub route: Option<Route>,
    pub camera: Option<CameraTarget>,
    /// Sequence of the last sample applied to the courier marker
    pub last_applied_sequence: Option<u64>,
}

/// Holds map state and pushes changes to a [`MapEngine`].
///
/// The courier marker only moves forward: a sample is applied only if its
/// sequence is greater than the last applied one.
pub struct MapRenderer {
    engine: Arc<dyn MapEngine>,
    config: MapConfig,
    metrics: Arc<MapMetrics>,
    state: RenderState,
}

impl MapRenderer {
    pub fn new(engine: Arc<dyn MapEngine>, config: MapConfig, metrics: Arc<MapMetrics>) -> Self {
        Self {
            engine,
            config,
            metrics,
            state: RenderState::default(),
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn route(&self) -> Option<&Route> {
        self.state.route.as_ref()
    }

    /// Place pickup and delivery markers and frame both
    pub fn set_endpoints(&mut self, pickup: GeoPoint, delivery: GeoPoint) {
        self.state.pickup = Some(pickup);
        self.state.delivery = Some(delivery);
        self.engine.push(MapCommand::PlaceMarker {
            kind: MarkerKind::Pickup,
            point: pickup,
        });
        self.engine.push(MapCommand::PlaceMarker {
            kind: MarkerKind::Delivery,
            point: delivery,
        });
        self.center_on_route();
    }

    /// Replace the route overlay and fit the camera to pickup, delivery and
    /// every route point.
    pub fn set_route(&mut self, route: Route) {
        debug!(points = route.points.len(), "Route overlay replaced");
        self.engine.push(MapCommand::DrawRoute {
            points: route.points.clone(),
        });
        self.state.route = Some(route);
        self.center_on_route();
    }

    /// Remove the route overlay, if any
    pub fn clear_route(&mut self) {
        if self.state.route.take().is_some() {
            self.engine.push(MapCommand::ClearRoute);
        }
    }

    /// Move the courier marker to `sample` unless it is older than the last
    /// applied sample.
    ///
    /// Returns whether the sample was applied.
    pub fn apply_position(&mut self, sample: PositionSample) -> bool {
        if let Some(last) = self.state.last_applied_sequence {
            if sample.sequence <= last {
                trace!(sequence = sample.sequence, last, "Stale position discarded");
                self.metrics.record_position_discarded();
                return false;
            }
        }

        self.state.courier = Some(sample.point);
        self.state.last_applied_sequence = Some(sample.sequence);
        self.engine.push(MapCommand::PlaceMarker {
            kind: MarkerKind::Courier,
            point: sample.point,
        });
        self.metrics.record_position_applied();
        true
    }

    /// Frame pickup, delivery and the route.
    ///
    /// Returns `false` when there is nothing to frame.
    pub fn center_on_route(&mut self) -> bool {
        let route_points = self.state.route.iter().flat_map(|r| r.points.iter());
        let points = self
            .state
            .pickup
            .iter()
            .chain(self.state.delivery.iter())
            .chain(route_points);

        match GeoBounds::from_points(points) {
            Some(bounds) => {
                self.point_camera(CameraTarget::Bounds {
                    bounds,
                    padding_px: self.config.fit_padding_px,
                });
                true
            }
            None => false,
        }
    }

    /// Fly to the courier marker.
    ///
    /// Returns `false` when no position has been applied yet.
    pub fn center_on_current_position(&mut self) -> bool {
        match self.state.courier {
            Some(center) => {
                self.point_camera(CameraTarget::Point {
                    center,
                    zoom: self.config.focus_zoom,
                });
                true
            }
            None => false,
        }
    }

    fn point_camera(&mut self, target: CameraTarget) {
        self.state.camera = Some(target);
        self.engine.push(match target {
            CameraTarget::Bounds { bounds, padding_px } => {
                MapCommand::FitBounds { bounds, padding_px }
            }
            CameraTarget::Point { center, zoom } => MapCommand::FlyTo { center, zoom },
        });
    }
}
