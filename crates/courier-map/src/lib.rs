//! # courier-map
//!
//! Live delivery map: render state, the map engine sink, position reporting,
//! and the controller that keeps one delivery's route and courier position in
//! sync.
//!
//! ## Architecture
//!
//! ```text
//! LocationTracker ──samples──┐
//!                            ├──> DeliveryMapController ──> MapRenderer ──> MapEngine
//! RouteService ────routes────┘            │
//!                                         └──> PositionReporter (fire-and-forget)
//! ```
//!
//! Ordering is explicit: position samples carry a monotonic sequence that the
//! renderer never lets go backwards, and route requests carry a request
//! sequence so a slow response cannot overwrite a newer route.

pub mod controller;
pub mod engine;
pub mod metrics;
pub mod renderer;
pub mod reporter;

pub use controller::{Activation, ControllerConfig, DeliveryMapController, TrackingSession};
pub use engine::{LogMapEngine, MapCommand, MapEngine, MarkerKind, RecordingMapEngine};
pub use metrics::{MapMetrics, MetricsSnapshot};
pub use renderer::{CameraTarget, MapRenderer, RenderState};
pub use reporter::{HttpPositionReporter, LogPositionReporter, PositionReport, PositionReporter};
