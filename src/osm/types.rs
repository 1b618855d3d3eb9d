//! Wire formats for the three external services, and the ingested
//! `RawElement` they project into.

use crate::geometry::Coordinate;
use crate::types::ElementKind;
use serde::Deserialize;
use std::collections::HashMap;

/// Response body of the spatial-query service: a flat `elements` array.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
pub struct OverpassElement {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: i64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Present for ways when the query asks for `out center`.
    #[serde(default)]
    pub center: Option<LatLon>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Present for ways when the query asks for `out geom`.
    #[serde(default)]
    pub geometry: Vec<LatLon>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl OverpassElement {
    /// Project into a domain element. Relations and rows without a usable
    /// coordinate are dropped.
    pub fn into_raw(self) -> Option<RawElement> {
        let kind = ElementKind::parse(&self.kind)?;
        let coordinate = match (self.lat, self.lon, self.center) {
            (Some(lat), Some(lon), _) => Coordinate::new(lat, lon),
            (_, _, Some(center)) => Coordinate::new(center.lat, center.lon),
            _ => return None,
        };
        Some(RawElement {
            id: self.id,
            kind,
            coordinate,
            tags: self.tags,
        })
    }

    /// Extract a road polyline from a geometry-carrying way. Needs at least
    /// one segment.
    pub fn into_road(self) -> Option<Vec<Coordinate>> {
        if self.geometry.len() < 2 {
            return None;
        }
        Some(
            self.geometry
                .into_iter()
                .map(|p| Coordinate::new(p.lat, p.lon))
                .collect(),
        )
    }
}

/// One entity returned by the spatial-query service, after ingestion
/// filtering.
#[derive(Debug, Clone)]
pub struct RawElement {
    pub id: i64,
    pub kind: ElementKind,
    pub coordinate: Coordinate,
    pub tags: HashMap<String, String>,
}

/// Elevation service response: `results[0].elevation` in meters.
#[derive(Debug, Deserialize)]
pub struct ElevationResponse {
    #[serde(default)]
    pub results: Vec<ElevationResult>,
}

#[derive(Debug, Deserialize)]
pub struct ElevationResult {
    pub elevation: f64,
}

/// Reverse-geocoding response: a free-text address line.
#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default)]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node() {
        let json = r#"{"type":"node","id":4711,"lat":40.0,"lon":-75.0,
                       "tags":{"amenity":"hospital","name":"Mercy"}}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        let raw = element.into_raw().unwrap();
        assert_eq!(raw.kind, ElementKind::Node);
        assert_eq!(raw.id, 4711);
        assert_eq!(raw.coordinate, Coordinate::new(40.0, -75.0));
        assert_eq!(raw.tags.get("name").map(String::as_str), Some("Mercy"));
    }

    #[test]
    fn test_parse_way_with_center() {
        let json = r#"{"type":"way","id":99,"center":{"lat":40.1,"lon":-75.1},
                       "tags":{"building":"bunker"}}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        let raw = element.into_raw().unwrap();
        assert_eq!(raw.kind, ElementKind::Way);
        assert_eq!(raw.coordinate, Coordinate::new(40.1, -75.1));
    }

    #[test]
    fn test_relation_dropped() {
        let json = r#"{"type":"relation","id":7,"tags":{}}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert!(element.into_raw().is_none());
    }

    #[test]
    fn test_missing_coordinate_dropped() {
        let json = r#"{"type":"way","id":8,"tags":{"building":"yes"}}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert!(element.into_raw().is_none());
    }

    #[test]
    fn test_tags_default_empty() {
        let json = r#"{"type":"node","id":1,"lat":0.5,"lon":0.5}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        assert!(element.into_raw().unwrap().tags.is_empty());
    }

    #[test]
    fn test_road_geometry() {
        let json = r#"{"type":"way","id":2,
                       "geometry":[{"lat":40.0,"lon":-75.0},{"lat":40.001,"lon":-75.0}]}"#;
        let element: OverpassElement = serde_json::from_str(json).unwrap();
        let road = element.into_road().unwrap();
        assert_eq!(road.len(), 2);
        assert_eq!(road[1], Coordinate::new(40.001, -75.0));
    }

    #[test]
    fn test_elevation_response() {
        let json = r#"{"results":[{"elevation":123.5,"latitude":40.0,"longitude":-75.0}]}"#;
        let response: ElevationResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.results[0].elevation, 123.5);
    }
}
