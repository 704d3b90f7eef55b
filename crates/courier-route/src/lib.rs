//! # courier-route
//!
//! Route computation against an external directions provider.
//!
//! - **provider**: the [`RoutingProvider`] trait and the provider's wire types
//! - **goong**: [`GoongRoutingProvider`], an HTTP provider for Goong-style
//!   `Direction` endpoints
//! - **service**: [`RouteService`], which issues one request per call and turns the
//!   response into a [`courier_core::Route`], decoding the encoded path atomically
//!
//! ## Example
//!
//! ```rust,no_run
//! use courier_core::{GeoPoint, TravelMode};
//! use courier_route::{GoongRoutingProvider, RouteService};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let provider = GoongRoutingProvider::new(
//!     "https://rsapi.goong.io",
//!     Some("key".into()),
//!     Duration::from_secs(15),
//! )?;
//! let service = RouteService::new(Arc::new(provider));
//!
//! let pickup = GeoPoint::new(10.7769, 106.7009)?;
//! let delivery = GeoPoint::new(10.7626, 106.6826)?;
//! let route = service.compute_route(pickup, delivery, TravelMode::Bike).await?;
//! println!("{} points", route.points.len());
//! # Ok(())
//! # }
//! ```

pub mod goong;
pub mod provider;
pub mod service;

pub use goong::GoongRoutingProvider;
pub use provider::{DirectionsRequest, DirectionsResponse, RoutingProvider};
pub use service::RouteService;
