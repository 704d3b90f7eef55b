//! Routing provider trait and the directions wire format.

use async_trait::async_trait;
use courier_core::{GeoPoint, Result, RouteMetric, TravelMode};
use serde::{Deserialize, Serialize};

/// A single directions request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DirectionsRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub mode: TravelMode,
}

// ============================================================================
// Provider response types
// ============================================================================

/// Directions response as returned by the provider.
///
/// Only the fields the core reads are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DirectionsResponse {
    #[serde(default)]
    pub routes: Vec<ProviderRoute>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderRoute {
    #[serde(default)]
    pub legs: Vec<ProviderLeg>,
    #[serde(default)]
    pub overview_polyline: Option<EncodedPath>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProviderLeg {
    #[serde(default)]
    pub distance: Option<TextValue>,
    #[serde(default)]
    pub duration: Option<TextValue>,
}

/// Display text plus optional numeric value, e.g. `{"text": "5.2 km", "value": 5200}`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TextValue {
    pub text: String,
    #[serde(default)]
    pub value: Option<f64>,
}

impl From<TextValue> for RouteMetric {
    fn from(tv: TextValue) -> Self {
        RouteMetric {
            text: tv.text,
            value: tv.value,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncodedPath {
    pub points: String,
}

/// External directions provider.
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Issue one directions request.
    ///
    /// # Returns
    /// * `Ok(response)` with the provider's routes (possibly none)
    /// * `Err(Network)` on request failure or timeout
    /// * `Err(Decode)` if the response body is not a directions document
    async fn directions(&self, request: &DirectionsRequest) -> Result<DirectionsResponse>;
}
