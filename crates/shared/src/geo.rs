/// Mean earth radius in kilometers, used for haversine distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Equatorial radius in meters, used when offsetting coordinates.
const OFFSET_SPHERE_RADIUS_M: f64 = 6378137.0;

/// Distance moved north and east by `geo_offsets`.
const OFFSET_METERS: f64 = 2000.0;

/// Great-circle distance in kilometers between two points given in decimal degrees.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let dlon = lon2 - lon1;
    let dlat = lat2 - lat1;
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();
    c * EARTH_RADIUS_KM
}

/// Shortest distance in kilometers from a point to the great circle that
/// contains the meridian at `meridian_lon` (and its antimeridian).
pub fn cross_track_to_meridian(lat: f64, lon: f64, meridian_lon: f64) -> f64 {
    let s = (lat.to_radians().cos() * (lon - meridian_lon).to_radians().sin()).abs();
    s.min(1.0).asin() * EARTH_RADIUS_KM
}

/// Meridian arc length in kilometers between two latitudes.
pub fn latitude_arc(lat1: f64, lat2: f64) -> f64 {
    (lat1 - lat2).abs().to_radians() * EARTH_RADIUS_KM
}

/// Degree offsets that move a point 2 km north and 2 km east.
///
/// Based on the spherical approximation. An offset that would push the point
/// outside [-90, 90] latitude or [-180, 180] longitude is reported as 0.
pub fn geo_offsets(lat: f64, lon: f64) -> (f64, f64) {
    let d_lat = OFFSET_METERS / OFFSET_SPHERE_RADIUS_M;
    let d_lon = OFFSET_METERS / (OFFSET_SPHERE_RADIUS_M * lat.to_radians().cos());

    let mut lat_offset = d_lat.to_degrees();
    let mut lon_offset = d_lon.to_degrees();

    if !(-90.0..=90.0).contains(&(lat + lat_offset)) {
        lat_offset = 0.0;
    }
    if !lon_offset.is_finite() || !(-180.0..=180.0).contains(&(lon + lon_offset)) {
        lon_offset = 0.0;
    }

    (lat_offset, lon_offset)
}

/// True when `lat` is a finite latitude in [-90, 90].
pub fn is_valid_latitude(lat: f64) -> bool {
    lat.is_finite() && (-90.0..=90.0).contains(&lat)
}

/// True when `lon` is a finite longitude in [-180, 180].
pub fn is_valid_longitude(lon: f64) -> bool {
    lon.is_finite() && (-180.0..=180.0).contains(&lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_same_point_is_zero() {
        assert!(haversine_distance(51.5, -0.11, 51.5, -0.11).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_is_symmetric() {
        let a = haversine_distance(51.515366, -0.1109577, 48.8566, 2.3522);
        let b = haversine_distance(48.8566, 2.3522, 51.515366, -0.1109577);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_haversine_london_paris() {
        // Roughly 343 km between central London and central Paris
        let d = haversine_distance(51.5074, -0.1278, 48.8566, 2.3522);
        assert!(d > 340.0 && d < 346.0, "got {d}");
    }

    #[test]
    fn test_haversine_one_degree_of_latitude() {
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.195).abs() < 0.01);
    }

    #[test]
    fn test_haversine_antipodes() {
        let d = haversine_distance(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_latitude_arc_matches_haversine_on_meridian() {
        let arc = latitude_arc(10.0, 25.0);
        let d = haversine_distance(10.0, 42.0, 25.0, 42.0);
        assert!((arc - d).abs() < 1e-6);
    }

    #[test]
    fn test_cross_track_on_meridian_is_zero() {
        assert!(cross_track_to_meridian(45.0, 10.0, 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_cross_track_never_exceeds_parallel_distance() {
        let xt = cross_track_to_meridian(60.0, 0.0, 90.0);
        let along_parallel = haversine_distance(60.0, 0.0, 60.0, 90.0);
        assert!(xt < along_parallel);
        // sin(d) = cos(60) * sin(90) = 0.5, so d = 30 degrees
        assert!((xt - 30f64.to_radians() * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_geo_offsets_at_equator() {
        let (dlat, dlon) = geo_offsets(0.0, 0.0);
        assert!((dlat - 0.017966).abs() < 1e-5);
        assert!((dlon - 0.017966).abs() < 1e-5);
    }

    #[test]
    fn test_geo_offsets_widen_with_latitude() {
        let (_, dlon_equator) = geo_offsets(0.0, 10.0);
        let (_, dlon_north) = geo_offsets(60.0, 10.0);
        assert!((dlon_north - 2.0 * dlon_equator).abs() < 1e-6);
    }

    #[test]
    fn test_geo_offsets_clamped_at_edges() {
        let (dlat, _) = geo_offsets(89.999, 0.0);
        assert_eq!(dlat, 0.0);
        let (_, dlon) = geo_offsets(0.0, 179.999);
        assert_eq!(dlon, 0.0);
        let (_, dlon_pole) = geo_offsets(90.0, 0.0);
        assert_eq!(dlon_pole, 0.0);
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(is_valid_latitude(-90.0));
        assert!(is_valid_latitude(51.5));
        assert!(!is_valid_latitude(90.5));
        assert!(!is_valid_latitude(f64::NAN));
        assert!(is_valid_longitude(180.0));
        assert!(!is_valid_longitude(-180.1));
        assert!(!is_valid_longitude(f64::INFINITY));
    }
}
