//! Geographic helpers.

/// Earth's mean radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two lat/lon positions.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_distance() {
        // One thousandth of a degree of latitude is ~111 m
        let d = haversine_distance(51.5074, -0.1278, 51.5084, -0.1278);
        assert!((d - 111.2).abs() < 1.0, "got {}", d);
        assert_eq!(haversine_distance(10.0, 20.0, 10.0, 20.0), 0.0);
    }
}
