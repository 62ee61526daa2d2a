//! # Geographic Utilities
//!
//! Core geographic computation for live GPS tracks.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_distance`] | Great-circle distance between two GPS points |
//! | [`track_length`] | Total length of a GPS track in meters |
//!
//! ## Algorithm Notes
//!
//! The haversine formula calculates the great-circle distance between two
//! points on a sphere. It's the standard method for GPS distance calculation,
//! accurate to within 0.3% for most practical applications. All functions
//! expect WGS84 coordinates (latitude/longitude in degrees), which is the
//! standard used by GPS receivers and mapping services.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)

use crate::GpsPoint;
use geo::{Distance, Haversine, Point};

/// Calculate the great-circle distance between two GPS points using the
/// Haversine formula.
///
/// Returns the distance in meters along the Earth's surface (assuming a
/// spherical Earth with radius 6,371 km).
///
/// # Example
///
/// ```rust
/// use session_tracker::{geo_utils, GpsPoint};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_distance(&london, &paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Haversine::distance(point1, point2)
}

/// Calculate the total length of a GPS track in meters.
///
/// Sums the haversine distance between consecutive points. Empty or
/// single-point tracks return 0.0. This pairwise running sum is insensitive
/// to point reordering but sensitive to GPS jitter: no smoothing or outlier
/// rejection is applied, so noisy fixes inflate the total.
///
/// # Example
///
/// ```rust
/// use session_tracker::{geo_utils, GpsPoint};
///
/// let track = vec![
///     GpsPoint::new(51.5074, -0.1278),
///     GpsPoint::new(51.5080, -0.1290),
///     GpsPoint::new(51.5090, -0.1300),
/// ];
///
/// let length = geo_utils::track_length(&track);
/// println!("Track is {:.0} meters long", length);
/// ```
pub fn track_length(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_distance(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = GpsPoint::new(51.5074, -0.1278);
        assert_eq!(haversine_distance(&p, &p), 0.0);
    }

    #[test]
    fn test_haversine_distance_known_value() {
        // London to Paris is approximately 344 km
        let london = GpsPoint::new(51.5074, -0.1278);
        let paris = GpsPoint::new(48.8566, 2.3522);
        let dist = haversine_distance(&london, &paris);
        assert!(approx_eq(dist, 343_560.0, 5000.0)); // Within 5km
    }

    #[test]
    fn test_haversine_distance_adjacent_fixes() {
        // Two consecutive fixes on Westminster Bridge, ~13m apart
        let a = GpsPoint::new(51.5007, -0.1246);
        let b = GpsPoint::new(51.5008, -0.1247);
        let dist = haversine_distance(&a, &b);
        assert!(dist > 12.0 && dist < 14.0, "got {dist}");
    }

    #[test]
    fn test_track_length_empty() {
        let empty: Vec<GpsPoint> = vec![];
        assert_eq!(track_length(&empty), 0.0);
    }

    #[test]
    fn test_track_length_single_point() {
        let single = vec![GpsPoint::new(51.5074, -0.1278)];
        assert_eq!(track_length(&single), 0.0);
    }

    #[test]
    fn test_track_length_is_pairwise_sum() {
        let track = vec![
            GpsPoint::new(51.5074, -0.1278),
            GpsPoint::new(51.5080, -0.1290),
            GpsPoint::new(51.5090, -0.1300),
        ];
        let expected = haversine_distance(&track[0], &track[1])
            + haversine_distance(&track[1], &track[2]);
        assert!(approx_eq(track_length(&track), expected, 1e-9));
    }
}
