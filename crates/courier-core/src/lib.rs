//! # Courier Core
//!
//! Core types, geographic math, error handling, and configuration for the
//! courier delivery core.
//!
//! This crate provides the foundational building blocks shared by every other
//! crate in the workspace:
//!
//! - **Types**: `GeoPoint`, `Route`, `PositionSample`, `TravelMode` and the
//!   `SubscriptionHandle` used by position watches.
//! - **Geo**: polyline decoding/encoding, haversine distance, bounding boxes.
//! - **Errors**: the `CourierError` taxonomy every component surfaces to callers.
//! - **Configuration**: YAML configuration with environment variable overrides.
//!
//! ## Example
//!
//! ```
//! use courier_core::geo::decode_polyline;
//!
//! let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//! assert_eq!(points.len(), 3);
//! assert!((points[0].latitude - 38.5).abs() < 1e-5);
//! ```

pub mod config;
pub mod error;
pub mod geo;
pub mod types;

// Re-export commonly used types for convenience
pub use config::AppConfig;
pub use error::{ConfigError, CourierError, ErrorKind, Result};
pub use geo::GeoBounds;
pub use types::{
    GeoPoint, PositionSample, PositionSource, Route, RouteMetric, SubscriptionHandle, TravelMode,
};
