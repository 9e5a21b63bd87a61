//! Great-circle distance on a spherical Earth (haversine formula)

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance in meters between two coordinates given in decimal degrees
///
/// ```text
/// a = sin²(Δφ/2) + cos(φ1)·cos(φ2)·sin²(Δλ/2)
/// c = 2·atan2(√a, √(1−a))
/// d = R · c
/// ```
///
/// # Examples
///
/// ```
/// use thermora_node::gps::geo::calculate_distance;
///
/// // One degree of longitude on the equator
/// let d = calculate_distance(0.0, 0.0, 0.0, 1.0);
/// assert!((d - 111_195.0).abs() < 1.0);
/// ```
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lon = (d_lon / 2.0).sin();
    let a = sin_d_lat * sin_d_lat
        + lat1.to_radians().cos() * lat2.to_radians().cos() * sin_d_lon * sin_d_lon;

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c * 1000.0
}
