//! Continental-US geofilter.
//!
//! Every incoming location passes through [`is_within_bounds`] before it
//! reaches rendering. The box is a fixed approximation: Alaska, Hawaii and
//! territories fall outside it and are dropped along with non-US points.
//!
//! Bounds source: http://answers.google.com/answers/threadview?id=149284

use geo::{coord, Rect};

use crate::models::GeoPoint;

pub const NORTH_LAT: f64 = 49.3457868; // top
pub const SOUTH_LAT: f64 = 24.7433195; // bottom
pub const WEST_LNG: f64 = -124.7844079; // left
pub const EAST_LNG: f64 = -66.9513812; // right

/// Inclusive continental-US bounding box test.
///
/// NaN coordinates fail every comparison and are rejected.
pub fn is_within_bounds(point: &GeoPoint) -> bool {
    SOUTH_LAT <= point.lat
        && point.lat <= NORTH_LAT
        && WEST_LNG <= point.lng
        && point.lng <= EAST_LNG
}

/// Keep only the points inside the box, in their original order
pub fn filter_locations(points: &[GeoPoint]) -> Vec<GeoPoint> {
    points.iter().copied().filter(is_within_bounds).collect()
}

/// The bounding box as a `geo` envelope (x = lng, y = lat)
pub fn continental_us() -> Rect<f64> {
    Rect::new(
        coord! { x: WEST_LNG, y: SOUTH_LAT },
        coord! { x: EAST_LNG, y: NORTH_LAT },
    )
}
