//! Coordinate handling: decimal/DMS parsing, haversine distance, and the
//! planar point-to-segment approximation used for road proximity.

use crate::types::SearchError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per degree of latitude, also used to express small buffers in
/// degrees.
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Bounding-box buffer around a road segment before the projection math
/// runs. Points farther out than this are "obviously too far".
pub const ROAD_PROXIMITY_BUFFER_M: f64 = 100.0;

/// A WGS-84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(SearchError::InvalidCoordinate(format!(
                "latitude {} out of range (-90..90)",
                self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(SearchError::InvalidCoordinate(format!(
                "longitude {} out of range (-180..180)",
                self.lon
            )));
        }
        Ok(())
    }

    /// Haversine great-circle distance in meters.
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let d_lat = (other.lat - self.lat).to_radians();
        let d_lon = (other.lon - self.lon).to_radians();
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();

        let a = (d_lat * 0.5).sin().powi(2)
            + lat1.cos() * lat2.cos() * (d_lon * 0.5).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

/// Which coordinate axis a string is parsed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Lat,
    Lon,
}

impl Axis {
    fn limit(self) -> f64 {
        match self {
            Self::Lat => 90.0,
            Self::Lon => 180.0,
        }
    }

    /// (positive, negative) hemisphere letters for this axis.
    fn hemispheres(self) -> (char, char) {
        match self {
            Self::Lat => ('N', 'S'),
            Self::Lon => ('E', 'W'),
        }
    }
}

/// Parse a single coordinate value in decimal ("40.446", "-79.982",
/// "79.982 W") or DMS form ("40°26'46\"N", "79 58 56 W").
pub fn parse_coordinate(input: &str, axis: Axis) -> Result<f64, SearchError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidCoordinate("empty string".into()));
    }

    // A trailing hemisphere letter fixes the sign.
    let (positive, negative) = axis.hemispheres();
    let (body, hemisphere_sign) = match trimmed.chars().last() {
        Some(c) if c.is_ascii_alphabetic() => {
            let upper = c.to_ascii_uppercase();
            let sign = if upper == positive {
                1.0
            } else if upper == negative {
                -1.0
            } else {
                return Err(SearchError::InvalidCoordinate(format!(
                    "unexpected hemisphere letter '{c}' in '{trimmed}'"
                )));
            };
            (trimmed[..trimmed.len() - c.len_utf8()].trim_end(), Some(sign))
        }
        _ => (trimmed, None),
    };

    let parts: Vec<&str> = body
        .split(|c: char| matches!(c, '°' | '\'' | '"' | ':') || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();

    let parse_part = |part: &str| -> Result<f64, SearchError> {
        part.parse::<f64>().map_err(|_| {
            SearchError::InvalidCoordinate(format!("unparsable component '{part}' in '{input}'"))
        })
    };

    let value = match parts.as_slice() {
        [degrees] => parse_part(degrees)?,
        [degrees, rest @ ..] if rest.len() <= 2 => {
            let degrees_value = parse_part(degrees)?;
            let minutes = parse_part(rest[0])?;
            let seconds = if rest.len() == 2 { parse_part(rest[1])? } else { 0.0 };
            if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
                return Err(SearchError::InvalidCoordinate(format!(
                    "minutes/seconds out of range in '{input}'"
                )));
            }
            let magnitude = degrees_value.abs() + minutes / 60.0 + seconds / 3600.0;
            if degrees.starts_with('-') {
                -magnitude
            } else {
                magnitude
            }
        }
        _ => {
            return Err(SearchError::InvalidCoordinate(format!(
                "too many components in '{input}'"
            )))
        }
    };

    let value = match hemisphere_sign {
        Some(sign) => sign * value.abs(),
        None => value,
    };

    if !value.is_finite() || value.abs() > axis.limit() {
        return Err(SearchError::InvalidCoordinate(format!(
            "{value} out of range for this axis (±{})",
            axis.limit()
        )));
    }
    Ok(value)
}

/// Format a coordinate value with its hemisphere letter, the inverse of
/// [`parse_coordinate`].
pub fn format_coordinate(value: f64, axis: Axis) -> String {
    let (positive, negative) = axis.hemispheres();
    let letter = if value < 0.0 { negative } else { positive };
    format!("{:.6}{}", value.abs(), letter)
}

/// Mean coordinate of a point set. None when the set is empty.
pub fn centroid(points: impl IntoIterator<Item = Coordinate>) -> Option<Coordinate> {
    let mut count = 0usize;
    let (mut lat_sum, mut lon_sum) = (0.0, 0.0);
    for point in points {
        lat_sum += point.lat;
        lon_sum += point.lon;
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(Coordinate::new(
        lat_sum / count as f64,
        lon_sum / count as f64,
    ))
}

/// Approximate distance in meters from `point` to the segment
/// `start`..`end`.
///
/// Returns None for non-finite input, and None when the point falls outside
/// the segment's bounding box expanded by [`ROAD_PROXIMITY_BUFFER_M`] — the
/// cheap rejection for "obviously too far". Otherwise projects onto a local
/// planar frame (longitude scaled by cos(latitude)) and clamps the
/// closest-point parameter to the segment. Sub-meter error over segments in
/// the hundreds of meters; not geodesic-exact.
pub fn point_to_segment_distance(
    point: Coordinate,
    start: Coordinate,
    end: Coordinate,
) -> Option<f64> {
    if !point.is_finite() || !start.is_finite() || !end.is_finite() {
        return None;
    }

    let buffer_deg = ROAD_PROXIMITY_BUFFER_M / METERS_PER_DEGREE;
    let (lat_min, lat_max) = (start.lat.min(end.lat), start.lat.max(end.lat));
    let (lon_min, lon_max) = (start.lon.min(end.lon), start.lon.max(end.lon));
    if point.lat < lat_min - buffer_deg
        || point.lat > lat_max + buffer_deg
        || point.lon < lon_min - buffer_deg
        || point.lon > lon_max + buffer_deg
    {
        return None;
    }

    // Local equirectangular frame around the point's latitude.
    let lon_scale = point.lat.to_radians().cos() * METERS_PER_DEGREE;
    let to_xy = |c: Coordinate| (c.lon * lon_scale, c.lat * METERS_PER_DEGREE);
    let (px, py) = to_xy(point);
    let (ax, ay) = to_xy(start);
    let (bx, by) = to_xy(end);

    let (dx, dy) = (bx - ax, by - ay);
    let length_sq = dx * dx + dy * dy;
    let t = if length_sq <= f64::EPSILON {
        0.0
    } else {
        (((px - ax) * dx + (py - ay) * dy) / length_sq).clamp(0.0, 1.0)
    };
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    Some(((px - cx).powi(2) + (py - cy).powi(2)).sqrt())
}
