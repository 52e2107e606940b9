//! Spherical (web) mercator, EPSG:3857.
//!
//! Uses the WGS84 semi-major axis as the sphere radius.

use std::f64::consts::PI;

/// WGS84 semi-major axis in meters.
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Latitude where the square web mercator world ends.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Convert longitude/latitude in degrees to mercator meters.
///
/// Latitudes beyond [`MAX_LATITUDE`] are clamped so the poles map onto the
/// square world edge instead of infinity.
pub fn lonlat_to_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * ((PI / 4.0) + (lat.to_radians() / 2.0)).tan().ln();
    (x, y)
}

/// Convert mercator meters to longitude/latitude in degrees.
pub fn mercator_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
