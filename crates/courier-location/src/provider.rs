//! Position source abstraction.

use async_trait::async_trait;
use courier_core::{GeoPoint, Result, SubscriptionHandle};
use tokio::sync::mpsc::Receiver;

/// Stream of raw positions from a sensor subscription.
///
/// The provider keeps the sending half; an `Err` item or a closed channel ends
/// the subscription.
pub type PositionUpdates = Receiver<Result<GeoPoint>>;

/// Platform location source.
///
/// Implementations wrap the device sensor (or a replay of one). They are not
/// expected to enforce permission or ordering themselves; [`crate::LocationTracker`]
/// does that.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Prompt for (or look up) location permission.
    ///
    /// # Returns
    /// `true` if position access is granted
    async fn request_permission(&self) -> bool;

    /// Fetch a single position.
    ///
    /// Fails with `PositionUnavailable` when the sensor is disabled or cannot fix.
    async fn current_position(&self) -> Result<GeoPoint>;

    /// Open a continuous sensor subscription identified by `handle`.
    ///
    /// Positions arrive at provider cadence until [`unsubscribe`](Self::unsubscribe)
    /// is called for the same handle.
    fn subscribe(&self, handle: SubscriptionHandle) -> Result<PositionUpdates>;

    /// Release the sensor subscription for `handle`.
    fn unsubscribe(&self, handle: SubscriptionHandle);
}
