//! # courier-location
//!
//! Courier position acquisition on top of a platform location provider.
//!
//! - **provider**: the [`LocationProvider`] trait a platform sensor implements
//! - **tracker**: [`LocationTracker`], which enforces the permission gate, stamps
//!   samples with monotonic sequence numbers, and keeps at most one watch open
//! - **replay**: [`ReplayLocationProvider`], a provider that replays a recorded
//!   path, used for simulation and demos
//!
//! ## Example
//!
//! ```rust,no_run
//! use courier_location::{LocationTracker, ReplayLocationProvider, TrackerConfig};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn run() -> courier_core::Result<()> {
//! let provider = ReplayLocationProvider::from_polyline(
//!     "_p~iF~ps|U_ulLnnqC_mqNvxq`@",
//!     Duration::from_secs(1),
//! )?;
//! let tracker = LocationTracker::new(Arc::new(provider), TrackerConfig::default());
//!
//! if tracker.request_permission().await {
//!     let here = tracker.get_current_position().await?;
//!     println!("courier at {}", here);
//! }
//! # Ok(())
//! # }
//! ```

pub mod provider;
pub mod replay;
pub mod tracker;

pub use provider::{LocationProvider, PositionUpdates};
pub use replay::ReplayLocationProvider;
pub use tracker::{LocationTracker, TrackerConfig};
