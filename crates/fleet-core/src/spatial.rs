//! Spatial math for the simulator and formation layout.
//!
//! The simulator deliberately uses a flat-earth approximation
//! (`FLAT_METERS_PER_DEG` for both axes), which is good enough for
//! the few kilometers a simulated drone covers.

use crate::models::ZoneBounds;

/// Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree used by the flat-earth approximation.
pub const FLAT_METERS_PER_DEG: f64 = 111_000.0;

/// Calculate distance between two points in meters using Haversine formula.
///
/// # Arguments
/// * `lat1`, `lon1` - First point coordinates in decimal degrees
/// * `lat2`, `lon2` - Second point coordinates in decimal degrees
///
/// # Returns
/// Distance in meters
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Flat-earth distance in meters: degree delta scaled by `FLAT_METERS_PER_DEG`.
pub fn planar_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    (dlat * dlat + dlon * dlon).sqrt() * FLAT_METERS_PER_DEG
}

/// Convert meters to degrees under the flat-earth approximation.
pub fn meters_to_flat_deg(meters: f64) -> f64 {
    meters / FLAT_METERS_PER_DEG
}

/// Flat-earth bearing from point 1 to point 2 in degrees, 0 = north, 90 = east.
///
/// Result is normalized to [0, 360).
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    normalize_heading(dlon.atan2(dlat).to_degrees())
}

/// Wrap any angle in degrees into [0, 360).
pub fn normalize_heading(heading_deg: f64) -> f64 {
    let wrapped = heading_deg.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Signed shortest turn from `from_deg` to `to_deg`, in (-180, 180].
pub fn heading_delta(from_deg: f64, to_deg: f64) -> f64 {
    let mut diff = to_deg - from_deg;
    if diff.abs() > 180.0 {
        diff = if diff > 0.0 { diff - 360.0 } else { diff + 360.0 };
    }
    diff
}

/// Approximate area of a zone rectangle in km².
pub fn zone_area_km2(bounds: &ZoneBounds) -> f64 {
    const EARTH_RADIUS_KM: f64 = EARTH_RADIUS_M / 1000.0;

    let dlat = (bounds.north - bounds.south).to_radians();
    let dlon = (bounds.east - bounds.west).to_radians();
    let mean_lat = ((bounds.north + bounds.south) / 2.0).to_radians();

    let width = EARTH_RADIUS_KM * dlon * mean_lat.cos();
    let height = EARTH_RADIUS_KM * dlat;
    (width * height).abs()
}
