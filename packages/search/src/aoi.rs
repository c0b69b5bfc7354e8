//! Area-of-interest wire codec and polygon construction.
//!
//! The map client sends the drawn ring as `lon lat,lon lat,...`,
//! percent-encoded into a single query parameter, or the literal `null`
//! when nothing is drawn.

use geo::{LineString, Polygon};
use study_explorer_search_models::{Aoi, Coordinate};
use thiserror::Error;

/// Wire value meaning "no area of interest".
pub const NO_AOI: &str = "null";

/// Minimum coordinates in a closed ring (a triangle plus its closing point).
pub const MIN_RING_COORDINATES: usize = 4;

/// Errors produced while decoding or validating an AOI.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AoiError {
    /// The parameter was present but empty.
    #[error("AOI coordinates are empty")]
    Empty,

    /// Percent-decoding failed (invalid UTF-8 after decoding).
    #[error("AOI coordinates are not valid percent-encoded UTF-8: {message}")]
    Encoding {
        /// Decoder error message.
        message: String,
    },

    /// A coordinate pair did not contain exactly two numbers.
    #[error("AOI coordinate pair {index} ('{pair}') is not a 'lon lat' pair")]
    MalformedPair {
        /// Zero-based pair index.
        index: usize,
        /// The offending text.
        pair: String,
    },

    /// A coordinate was NaN/infinite or outside WGS84 bounds.
    #[error("AOI coordinate {index} ({lon}, {lat}) is outside valid longitude/latitude bounds")]
    OutOfRange {
        /// Zero-based coordinate index.
        index: usize,
        /// Longitude as parsed.
        lon: f64,
        /// Latitude as parsed.
        lat: f64,
    },

    /// Fewer than [`MIN_RING_COORDINATES`] coordinates.
    #[error("AOI ring has {count} coordinates, at least {MIN_RING_COORDINATES} are required")]
    TooFewCoordinates {
        /// Number of coordinates received.
        count: usize,
    },

    /// First and last coordinates differ.
    #[error("AOI ring is not closed")]
    NotClosed,
}

/// Decodes the `coordinates` query parameter.
///
/// A missing parameter and the literal `null` both mean [`Aoi::All`].
///
/// # Errors
///
/// Returns [`AoiError`] if the encoding is malformed or the ring is not a
/// valid closed ring.
pub fn decode_aoi(raw: Option<&str>) -> Result<Aoi, AoiError> {
    let Some(raw) = raw else {
        return Ok(Aoi::All);
    };
    if raw == NO_AOI {
        return Ok(Aoi::All);
    }

    let decoded = urlencoding::decode(raw).map_err(|e| AoiError::Encoding {
        message: e.to_string(),
    })?;
    let decoded = decoded.trim();
    if decoded.is_empty() {
        return Err(AoiError::Empty);
    }
    if decoded == NO_AOI {
        return Ok(Aoi::All);
    }

    let ring = decoded
        .split(',')
        .enumerate()
        .map(|(index, pair)| parse_pair(index, pair))
        .collect::<Result<Vec<_>, _>>()?;

    validate_ring(&ring)?;

    Ok(Aoi::Ring(ring))
}

fn parse_pair(index: usize, pair: &str) -> Result<Coordinate, AoiError> {
    let malformed = || AoiError::MalformedPair {
        index,
        pair: pair.to_string(),
    };

    let mut parts = pair.split_whitespace();
    let (Some(lon), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };
    let lon: f64 = lon.parse().map_err(|_| malformed())?;
    let lat: f64 = lat.parse().map_err(|_| malformed())?;

    Ok(Coordinate::new(lon, lat))
}

/// Checks that `ring` is a closed ring of in-range WGS84 coordinates.
///
/// The ring is never re-closed or simplified.
///
/// # Errors
///
/// Returns [`AoiError`] describing the first violation found.
pub fn validate_ring(ring: &[Coordinate]) -> Result<(), AoiError> {
    for (index, c) in ring.iter().enumerate() {
        let in_range = c.lon.is_finite()
            && c.lat.is_finite()
            && (-180.0..=180.0).contains(&c.lon)
            && (-90.0..=90.0).contains(&c.lat);
        if !in_range {
            return Err(AoiError::OutOfRange {
                index,
                lon: c.lon,
                lat: c.lat,
            });
        }
    }

    if ring.len() < MIN_RING_COORDINATES {
        return Err(AoiError::TooFewCoordinates { count: ring.len() });
    }

    if ring.first() != ring.last() {
        return Err(AoiError::NotClosed);
    }

    Ok(())
}

/// Encodes an AOI into its wire form.
#[must_use]
pub fn encode_aoi(aoi: &Aoi) -> String {
    match aoi {
        Aoi::All => NO_AOI.to_string(),
        Aoi::Ring(ring) => {
            let joined = ring
                .iter()
                .map(|c| format!("{} {}", c.lon, c.lat))
                .collect::<Vec<_>>()
                .join(",");
            urlencoding::encode(&joined).into_owned()
        }
    }
}

/// Builds an EPSG:4326 polygon from the AOI, `None` for [`Aoi::All`].
#[must_use]
pub fn to_polygon(aoi: &Aoi) -> Option<Polygon<f64>> {
    match aoi {
        Aoi::All => None,
        Aoi::Ring(ring) => {
            let exterior: LineString<f64> = ring.iter().map(|c| (c.lon, c.lat)).collect();
            Some(Polygon::new(exterior, vec![]))
        }
    }
}

/// Converts a polygon's exterior ring back into an AOI, as used when the
/// area comes from a `GeoJSON` file rather than the wire.
///
/// # Errors
///
/// Returns [`AoiError`] if the exterior ring is not a valid AOI ring.
pub fn from_polygon(polygon: &Polygon<f64>) -> Result<Aoi, AoiError> {
    let ring: Vec<Coordinate> = polygon
        .exterior()
        .coords()
        .map(|c| Coordinate::new(c.x, c.y))
        .collect();
    validate_ring(&ring)?;
    Ok(Aoi::Ring(ring))
}
