//! Spherical Web Mercator (EPSG:3857) forward projection.
//!
//! Intersection tests run in projected metres rather than raw degrees so
//! that large polygons behave the way they look on the map.

use geo::{Coord, MapCoords, MultiPolygon, Polygon};

/// WGS84 semi-major axis used by EPSG:3857.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Latitude beyond which Web Mercator diverges; inputs are clamped to it.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Projects a lon/lat coordinate (degrees) to EPSG:3857 metres.
#[must_use]
pub fn to_web_mercator(c: Coord<f64>) -> Coord<f64> {
    let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    Coord {
        x: EARTH_RADIUS_M * c.x.to_radians(),
        y: EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln(),
    }
}

#[must_use]
pub fn project_polygon(polygon: &Polygon<f64>) -> Polygon<f64> {
    polygon.map_coords(to_web_mercator)
}

#[must_use]
pub fn project_multi_polygon(multi_polygon: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    multi_polygon.map_coords(to_web_mercator)
}
