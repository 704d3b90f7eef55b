//! Route computation on top of a routing provider.

use crate::provider::{DirectionsRequest, RoutingProvider};
use courier_core::geo::decode_polyline;
use courier_core::{CourierError, GeoPoint, Result, Route, RouteMetric, TravelMode};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Computes routes through a [`RoutingProvider`].
///
/// Stateless apart from the provider; every call is one independent request.
/// Deciding whether a result is still wanted is the caller's job.
#[derive(Clone)]
pub struct RouteService {
    provider: Arc<dyn RoutingProvider>,
}

impl RouteService {
    pub fn new(provider: Arc<dyn RoutingProvider>) -> Self {
        Self { provider }
    }

    /// Compute a route from `origin` to `destination`.
    ///
    /// The first route of the response is used. Its encoded path is decoded
    /// atomically and must yield at least two points. Distance and duration are
    /// the first leg's values, passed through verbatim; either is `None` when
    /// the provider omitted it.
    ///
    /// # Errors
    /// * `Validation` if either endpoint is out of range
    /// * `Network` if the provider request fails
    /// * `Decode` if the response has no usable route
    #[instrument(
        skip(self, origin, destination),
        fields(origin = %origin, destination = %destination)
    )]
    pub async fn compute_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
    ) -> Result<Route> {
        origin.validate()?;
        destination.validate()?;

        let request = DirectionsRequest {
            origin,
            destination,
            mode,
        };
        let response = self.provider.directions(&request).await?;

        let first = response
            .routes
            .into_iter()
            .next()
            .ok_or_else(|| CourierError::decode("provider returned no routes"))?;

        let encoded = first
            .overview_polyline
            .map(|path| path.points)
            .ok_or_else(|| CourierError::decode("route has no encoded path"))?;

        let points = decode_polyline(&encoded)?;
        if points.len() < 2 {
            return Err(CourierError::decode(format!(
                "route path has {} point(s), need at least 2",
                points.len()
            )));
        }

        let (distance, duration) = match first.legs.into_iter().next() {
            Some(leg) => (
                leg.distance.map(RouteMetric::from),
                leg.duration.map(RouteMetric::from),
            ),
            None => (None, None),
        };

        debug!(
            points = points.len(),
            distance = distance.as_ref().map(|m| m.text.as_str()).unwrap_or("-"),
            duration = duration.as_ref().map(|m| m.text.as_str()).unwrap_or("-"),
            "Route computed"
        );

        Ok(Route {
            points,
            distance,
            duration,
            mode,
        })
    }
}
