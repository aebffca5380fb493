//! Geodesic distance.

use geo::{Distance, Haversine, Point};

/// Haversine distance in meters between two `[lon, lat]` coordinates.
pub fn haversine_m(a: [f64; 2], b: [f64; 2]) -> f64 {
    Haversine.distance(Point::new(a[0], a[1]), Point::new(b[0], b[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_distance() {
        // Paris to London is roughly 344 km
        let paris = [2.3522, 48.8566];
        let london = [-0.1276, 51.5074];
        let d = haversine_m(paris, london);
        assert!(d > 339_000.0 && d < 349_000.0, "got {}", d);
    }

    #[test]
    fn test_zero_distance() {
        let p = [-73.968, 40.785];
        assert!(haversine_m(p, p) < 1e-6);
    }
}
