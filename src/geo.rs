//! Great-circle distance and campus geofence evaluation.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Quezon City campus center.
pub const CAMPUS_CENTER: Point = Point {
    latitude: 14.7198,
    longitude: 121.0449,
};

/// Campus geofence radius in meters.
pub const GEOFENCE_RADIUS_METERS: f64 = 500.0;

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub latitude: f64,
    pub longitude: f64,
}

impl Point {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

pub fn validate_point(p: &Point) -> Result<(), String> {
    if !(-90.0..=90.0).contains(&p.latitude) {
        return Err("latitude out of range".to_string());
    }
    if !(-180.0..=180.0).contains(&p.longitude) {
        return Err("longitude out of range".to_string());
    }
    Ok(())
}

/// Great-circle distance between two coordinates in meters (Haversine).
pub fn haversine_distance_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_METERS * c
}

pub fn distance_between(a: Point, b: Point) -> f64 {
    haversine_distance_meters(a.latitude, a.longitude, b.latitude, b.longitude)
}

/// Whether `point` lies within `radius_meters` of `center`.  A point exactly
/// on the boundary counts as inside.
pub fn is_inside(point: Point, center: Point, radius_meters: f64) -> bool {
    distance_between(point, center) <= radius_meters
}

/// Whether `point` is inside the campus geofence.
pub fn is_inside_campus(point: Point) -> bool {
    is_inside(point, CAMPUS_CENTER, GEOFENCE_RADIUS_METERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Move north by this many degrees of latitude to travel one meter.
    const DEG_LAT_PER_METER: f64 = 1.0 / 111_195.0;

    #[test]
    fn zero_distance_at_same_point() {
        let d = distance_between(CAMPUS_CENTER, CAMPUS_CENTER);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn known_distance_is_close() {
        // Campus center to a point ~1.1 km north-east (rough check).
        let p = Point::new(14.7285, 121.0510);
        let d = distance_between(CAMPUS_CENTER, p);
        assert!(d > 900.0 && d < 1400.0, "unexpected distance {d}");
    }

    #[test]
    fn boundary_is_inside() {
        // Walk north until the distance equals the radius, then confirm the
        // comparison is inclusive on that exact value.
        let on_boundary = Point::new(
            CAMPUS_CENTER.latitude + GEOFENCE_RADIUS_METERS * DEG_LAT_PER_METER,
            CAMPUS_CENTER.longitude,
        );
        let d = distance_between(on_boundary, CAMPUS_CENTER);
        assert!(is_inside(on_boundary, CAMPUS_CENTER, d));
        assert!(!is_inside(on_boundary, CAMPUS_CENTER, d - 0.001));
    }

    #[test]
    fn outside_point_is_outside() {
        let far = Point::new(
            CAMPUS_CENTER.latitude + 600.0 * DEG_LAT_PER_METER,
            CAMPUS_CENTER.longitude,
        );
        assert!(!is_inside_campus(far));
        let near = Point::new(
            CAMPUS_CENTER.latitude + 100.0 * DEG_LAT_PER_METER,
            CAMPUS_CENTER.longitude,
        );
        assert!(is_inside_campus(near));
    }

    #[test]
    fn validates_coordinate_ranges() {
        assert!(validate_point(&Point::new(14.7, 121.0)).is_ok());
        assert!(validate_point(&Point::new(91.0, 0.0)).is_err());
        assert!(validate_point(&Point::new(0.0, -181.0)).is_err());
    }
}
