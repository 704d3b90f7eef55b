//! Geographic math: encoded polyline handling, distances, and bounding boxes.
//!
//! Polylines use the signed delta encoding at 1e-5 precision: every coordinate is
//! the difference from the previous one, zig-zag folded into an unsigned value and
//! emitted as little-endian 5-bit groups offset by 63, with bit 0x20 marking
//! continuation.

use crate::error::{CourierError, Result};
use crate::types::GeoPoint;
use serde::{Deserialize, Serialize};

/// Fixed-point scale of the encoded polyline format.
pub const POLYLINE_PRECISION: f64 = 1e5;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const CHUNK_OFFSET: i64 = 63;
const CONTINUATION_BIT: i64 = 0x20;
const VALUE_MASK: i64 = 0x1f;
/// Longest shift a single coordinate may use before it stops fitting in 32 bits.
const MAX_SHIFT: u32 = 30;

/// Decodes an encoded polyline into points, in path order.
///
/// Decoding is all-or-nothing: any malformed character, truncated coordinate, or
/// out-of-range result fails the whole call and no partial output is returned.
/// An empty input decodes to an empty sequence.
pub fn decode_polyline(encoded: &str) -> Result<Vec<GeoPoint>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::with_capacity(bytes.len() / 4);
    let mut index = 0usize;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while index < bytes.len() {
        let dlat = next_delta(bytes, &mut index)?;
        if index >= bytes.len() {
            return Err(CourierError::decode(format!(
                "truncated path: latitude at byte {} has no longitude",
                index
            )));
        }
        let dlng = next_delta(bytes, &mut index)?;

        lat = lat
            .checked_add(dlat)
            .ok_or_else(|| CourierError::decode("latitude accumulator overflow"))?;
        lng = lng
            .checked_add(dlng)
            .ok_or_else(|| CourierError::decode("longitude accumulator overflow"))?;

        let point = GeoPoint {
            latitude: lat as f64 / POLYLINE_PRECISION,
            longitude: lng as f64 / POLYLINE_PRECISION,
        };
        point
            .validate()
            .map_err(|e| CourierError::decode(format!("point {}: {}", points.len(), e.detail())))?;
        points.push(point);
    }

    Ok(points)
}

/// Reads one zig-zag encoded signed delta starting at `index`.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64> {
    let mut result: i64 = 0;
    let mut shift: u32 = 0;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(CourierError::decode(format!(
                "truncated path: unterminated value at byte {}",
                *index
            )));
        };
        let chunk = byte as i64 - CHUNK_OFFSET;
        if !(0..64).contains(&chunk) {
            return Err(CourierError::decode(format!(
                "invalid character {:?} at byte {}",
                byte as char, *index
            )));
        }
        *index += 1;

        result |= (chunk & VALUE_MASK) << shift;
        if chunk & CONTINUATION_BIT == 0 {
            break;
        }
        shift += 5;
        if shift > MAX_SHIFT {
            return Err(CourierError::decode(format!(
                "value too long ending at byte {}",
                *index
            )));
        }
    }

    Ok(if result & 1 != 0 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

/// Encodes points into a polyline string. Inverse of [`decode_polyline`].
pub fn encode_polyline(points: &[GeoPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat: i64 = 0;
    let mut prev_lng: i64 = 0;

    for point in points {
        let lat = (point.latitude * POLYLINE_PRECISION).round() as i64;
        let lng = (point.longitude * POLYLINE_PRECISION).round() as i64;
        push_delta(&mut out, lat - prev_lat);
        push_delta(&mut out, lng - prev_lng);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn push_delta(out: &mut String, delta: i64) {
    let mut value = if delta < 0 { !(delta << 1) } else { delta << 1 };
    while value >= CONTINUATION_BIT {
        out.push(((CONTINUATION_BIT | (value & VALUE_MASK)) + CHUNK_OFFSET) as u8 as char);
        value >>= 5;
    }
    out.push((value + CHUNK_OFFSET) as u8 as char);
}

/// Great-circle distance between two points in meters.
pub fn haversine_distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lng = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// Arithmetic midpoint, good enough for initial camera placement over city distances.
pub fn midpoint(a: &GeoPoint, b: &GeoPoint) -> GeoPoint {
    GeoPoint {
        latitude: (a.latitude + b.latitude) / 2.0,
        longitude: (a.longitude + b.longitude) / 2.0,
    }
}

/// Total length of a path in meters.
pub fn path_length_meters(points: &[GeoPoint]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance_meters(&pair[0], &pair[1]))
        .sum()
}

/// Axis-aligned latitude/longitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub south_west: GeoPoint,
    pub north_east: GeoPoint,
}

impl GeoBounds {
    /// Degenerate box around a single point.
    pub fn around(point: GeoPoint) -> Self {
        Self {
            south_west: point,
            north_east: point,
        }
    }

    /// Smallest box covering all points; `None` for an empty input.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a GeoPoint>,
    {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self::around(first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    /// Grows the box to include `point`.
    pub fn extend(&mut self, point: &GeoPoint) {
        self.south_west.latitude = self.south_west.latitude.min(point.latitude);
        self.south_west.longitude = self.south_west.longitude.min(point.longitude);
        self.north_east.latitude = self.north_east.latitude.max(point.latitude);
        self.north_east.longitude = self.north_east.longitude.max(point.longitude);
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        (self.south_west.latitude..=self.north_east.latitude).contains(&point.latitude)
            && (self.south_west.longitude..=self.north_east.longitude).contains(&point.longitude)
    }

    pub fn center(&self) -> GeoPoint {
        midpoint(&self.south_west, &self.north_east)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    fn p(lat: f64, lng: f64) -> GeoPoint {
        GeoPoint::new(lat, lng).unwrap()
    }

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode_polyline(REFERENCE).unwrap();
        let expected = [p(38.5, -120.2), p(40.7, -120.95), p(43.252, -126.453)];

        assert_eq!(points.len(), expected.len());
        for (got, want) in points.iter().zip(expected.iter()) {
            assert!(got.approx_eq(want, 1e-5), "{} != {}", got, want);
        }
    }

    #[test]
    fn test_encode_reference_polyline() {
        let points = [p(38.5, -120.2), p(40.7, -120.95), p(43.252, -126.453)];
        assert_eq!(encode_polyline(&points), REFERENCE);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_polyline("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_truncated_value() {
        // Drop the final terminating chunk
        let truncated = &REFERENCE[..REFERENCE.len() - 1];
        let err = decode_polyline(truncated).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_decode_missing_longitude() {
        // "_p~iF" is a complete latitude with nothing after it
        let err = decode_polyline("_p~iF").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.detail().contains("longitude"));
    }

    #[test]
    fn test_decode_invalid_character() {
        let err = decode_polyline("_p~iF ps|U").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(err.detail().contains("invalid character"));
    }

    #[test]
    fn test_decode_overlong_value() {
        let err = decode_polyline("~~~~~~~~~~~~~~~?").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_decode_out_of_range_latitude() {
        let encoded = encode_polyline(&[GeoPoint {
            latitude: 95.0,
            longitude: 0.0,
        }]);
        let err = decode_polyline(&encoded).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }

    #[test]
    fn test_haversine_distance() {
        // Ben Thanh market to District 5, roughly 2.5 km apart
        let a = p(10.7769, 106.7009);
        let b = p(10.7626, 106.6826);
        let d = haversine_distance_meters(&a, &b);
        assert!((d - 2554.0).abs() < 15.0, "distance was {}", d);
        assert_eq!(haversine_distance_meters(&a, &a), 0.0);
    }

    #[test]
    fn test_path_length() {
        let a = p(10.0, 106.0);
        let b = p(10.01, 106.0);
        let c = p(10.02, 106.0);
        let total = path_length_meters(&[a, b, c]);
        assert!((total - haversine_distance_meters(&a, &c)).abs() < 1.0);
        assert_eq!(path_length_meters(&[a]), 0.0);
    }

    #[test]
    fn test_bounds() {
        let points = [p(10.7769, 106.7009), p(10.7626, 106.6826), p(10.77, 106.69)];
        let bounds = GeoBounds::from_points(&points).unwrap();

        assert_eq!(bounds.south_west, p(10.7626, 106.6826));
        assert_eq!(bounds.north_east, p(10.7769, 106.7009));
        assert!(points.iter().all(|pt| bounds.contains(pt)));
        assert!(!bounds.contains(&p(10.8, 106.69)));
        assert!(bounds.center().approx_eq(&p(10.76975, 106.69175), 1e-9));

        assert!(GeoBounds::from_points(std::iter::empty::<&GeoPoint>()).is_none());
    }
}
