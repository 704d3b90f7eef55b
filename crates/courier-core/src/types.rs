//! Core types for the courier delivery core.
//!
//! This module defines the value types that flow between the location, routing,
//! and map components: geographic points, computed routes, and position samples.

use crate::error::{CourierError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A geographic coordinate in degrees.
///
/// Immutable value type. Construct through [`GeoPoint::new`] to get finiteness and
/// range checks.
///
/// # Examples
///
/// ```
/// use courier_core::types::GeoPoint;
///
/// let pickup = GeoPoint::new(10.7769, 106.7009).unwrap();
/// assert_eq!(pickup.to_string(), "10.77690,106.70090");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl GeoPoint {
    /// Creates a point, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        point.validate()?;
        Ok(point)
    }

    /// Checks finiteness and degree ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.latitude.is_finite() || !self.longitude.is_finite() {
            return Err(CourierError::validation(format!(
                "coordinates must be finite, got ({}, {})",
                self.latitude, self.longitude
            )));
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(CourierError::validation(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(CourierError::validation(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        Ok(())
    }

    /// Returns true if both coordinates are within `tolerance` degrees of `other`.
    pub fn approx_eq(&self, other: &GeoPoint, tolerance: f64) -> bool {
        (self.latitude - other.latitude).abs() <= tolerance
            && (self.longitude - other.longitude).abs() <= tolerance
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.latitude, self.longitude)
    }
}

/// Parses `"lat,lng"`.
impl FromStr for GeoPoint {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| CourierError::validation(format!("expected 'lat,lng', got '{}'", s)))?;
        let latitude = lat
            .trim()
            .parse::<f64>()
            .map_err(|e| CourierError::validation(format!("invalid latitude '{}': {}", lat, e)))?;
        let longitude = lng
            .trim()
            .parse::<f64>()
            .map_err(|e| CourierError::validation(format!("invalid longitude '{}': {}", lng, e)))?;
        GeoPoint::new(latitude, longitude)
    }
}

/// Travel mode requested from the routing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Car,
    /// Motorbike, the default courier vehicle
    #[default]
    Bike,
    Taxi,
    Truck,
}

impl TravelMode {
    /// Returns the provider's `vehicle` query value.
    pub fn as_vehicle(&self) -> &'static str {
        match self {
            TravelMode::Car => "car",
            TravelMode::Bike => "bike",
            TravelMode::Taxi => "taxi",
            TravelMode::Truck => "truck",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_vehicle())
    }
}

impl FromStr for TravelMode {
    type Err = CourierError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "car" => Ok(TravelMode::Car),
            "bike" => Ok(TravelMode::Bike),
            "taxi" => Ok(TravelMode::Taxi),
            "truck" => Ok(TravelMode::Truck),
            other => Err(CourierError::validation(format!(
                "unknown travel mode '{}'",
                other
            ))),
        }
    }
}

/// A distance or duration as reported by the routing provider.
///
/// `text` is the provider's display string, kept verbatim ("5.2 km", "15 phút").
/// `value` is the numeric meters/seconds when the provider supplies one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteMetric {
    pub text: String,
    pub value: Option<f64>,
}

/// A computed route between two points.
///
/// Immutable once produced; a new route fully replaces the old one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Decoded path, at least two points, in path order
    pub points: Vec<GeoPoint>,
    /// Distance of the first leg, unset when the provider omitted it
    pub distance: Option<RouteMetric>,
    /// Duration of the first leg, unset when the provider omitted it
    pub duration: Option<RouteMetric>,
    pub mode: TravelMode,
}

impl Route {
    /// Numeric distance in meters, if reported.
    pub fn distance_meters(&self) -> Option<f64> {
        self.distance.as_ref().and_then(|m| m.value)
    }

    /// Numeric duration in seconds, if reported.
    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration.as_ref().and_then(|m| m.value)
    }

    pub fn origin(&self) -> Option<&GeoPoint> {
        self.points.first()
    }

    pub fn destination(&self) -> Option<&GeoPoint> {
        self.points.last()
    }
}

/// Where a position sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    /// Continuous watch subscription
    Watch,
    /// One-shot position fetch
    OneShot,
}

/// A courier position stamped with a monotonic sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub point: GeoPoint,
    /// Strictly increasing per tracker; used to drop out-of-order updates
    pub sequence: u64,
    pub source: PositionSource,
    pub timestamp: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(point: GeoPoint, sequence: u64, source: PositionSource) -> Self {
        Self {
            point,
            sequence,
            source,
            timestamp: Utc::now(),
        }
    }
}

/// Handle identifying one position watch subscription.
///
/// Wraps a UUID v4; a fresh handle is issued for each `watch_position` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionHandle(Uuid);

impl SubscriptionHandle {
    /// Creates a new random handle.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
