//! Core types for the search engine: requests, results, groups, errors.

use crate::geometry::{self, Coordinate};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default cap on the number of results kept after the merge step.
pub const DEFAULT_RESULT_LIMIT: usize = 50;

/// Errors surfaced by the search engine.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("search radius must be positive, got {0}")]
    InvalidRadius(f64),
    #[error("polygon needs at least 3 vertices, got {0}")]
    InvalidPolygon(usize),
    #[error("unknown sort key '{0}', expected 'distance' or 'name'")]
    UnknownSortKey(String),
    #[error("no tags selected for search")]
    NoTags,
    #[error("{service} gave up after {attempts} attempts")]
    Exhausted {
        service: &'static str,
        attempts: u32,
    },
    #[error("{service} request failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },
    #[error("could not start worker pool: {0}")]
    WorkerPool(String),
}

/// The kind of map feature an element represents.
///
/// Relations are not supported and are dropped at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Node,
    Way,
}

impl ElementKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "node" => Some(Self::Node),
            "way" => Some(Self::Way),
            _ => None,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => write!(f, "node"),
            Self::Way => write!(f, "way"),
        }
    }
}

/// Key the merged result list is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Distance,
    Name,
}

impl FromStr for SortKey {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "distance" => Ok(Self::Distance),
            "name" => Ok(Self::Name),
            _ => Err(SearchError::UnknownSortKey(s.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Distance => write!(f, "distance"),
            Self::Name => write!(f, "name"),
        }
    }
}

/// The geographic constraint of a search: a circle or a polygon.
#[derive(Debug, Clone, Serialize)]
pub enum SearchArea {
    Circle { center: Coordinate, radius_m: f64 },
    Polygon(Vec<Coordinate>),
}

impl SearchArea {
    /// The reference point distances are measured from.
    /// Polygon searches have no defined center.
    pub fn center(&self) -> Option<Coordinate> {
        match self {
            Self::Circle { center, .. } => Some(*center),
            Self::Polygon(_) => None,
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        match self {
            Self::Circle { center, radius_m } => {
                center.validate()?;
                if !(*radius_m > 0.0) {
                    return Err(SearchError::InvalidRadius(*radius_m));
                }
                Ok(())
            }
            Self::Polygon(vertices) => {
                if vertices.len() < 3 {
                    return Err(SearchError::InvalidPolygon(vertices.len()));
                }
                for vertex in vertices {
                    vertex.validate()?;
                }
                Ok(())
            }
        }
    }
}

/// Immutable input to a search.
///
/// `tags` is the already-unioned tag list (defaults plus custom entries);
/// `excluded` holds the exclusion rules in the same `key=value` / bare-key
/// notation.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub area: SearchArea,
    pub tags: Vec<String>,
    pub excluded: Vec<String>,
    pub limit: usize,
    pub sort_by: SortKey,
    pub include_elevation: bool,
    pub include_road_distance: bool,
}

impl SearchRequest {
    pub fn circle(center: Coordinate, radius_m: f64) -> Self {
        Self::with_area(SearchArea::Circle { center, radius_m })
    }

    pub fn polygon(vertices: Vec<Coordinate>) -> Self {
        Self::with_area(SearchArea::Polygon(vertices))
    }

    fn with_area(area: SearchArea) -> Self {
        Self {
            area,
            tags: Vec::new(),
            excluded: Vec::new(),
            limit: DEFAULT_RESULT_LIMIT,
            sort_by: SortKey::Distance,
            include_elevation: true,
            include_road_distance: false,
        }
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        self.area.validate()
    }
}

/// One enriched search hit. Never mutated after construction.
#[derive(Debug, Clone, Serialize)]
pub struct LocationResult {
    pub id: i64,
    pub kind: ElementKind,
    pub coordinate: Coordinate,
    pub name: String,
    pub tags: HashMap<String, String>,
    /// Direct distance to the search center in meters; None for polygon
    /// searches.
    pub distance_m: Option<f64>,
    /// Distance to the nearest mapped road in meters, when requested.
    pub road_distance_m: Option<f64>,
    /// Elevation in meters, when the lookup succeeded.
    pub elevation_m: Option<f64>,
}

/// A non-empty cluster of results, with a derived display name.
#[derive(Debug, Clone, Serialize)]
pub struct LocationGroup {
    pub name: String,
    pub members: Vec<LocationResult>,
}

impl LocationGroup {
    pub fn new(members: Vec<LocationResult>) -> Self {
        Self {
            name: String::new(),
            members,
        }
    }

    /// Mean latitude/longitude of the members.
    pub fn centroid(&self) -> Option<Coordinate> {
        geometry::centroid(self.members.iter().map(|m| m.coordinate))
    }

    /// Largest pairwise distance between members, in meters. 0 for a
    /// singleton group.
    pub fn distance_span_m(&self) -> f64 {
        let mut span = 0.0_f64;
        for (i, a) in self.members.iter().enumerate() {
            for b in &self.members[i + 1..] {
                span = span.max(a.coordinate.distance_m(&b.coordinate));
            }
        }
        span
    }

    /// Smallest member distance-to-center, used for group ranking.
    pub fn min_distance_m(&self) -> Option<f64> {
        self.members
            .iter()
            .filter_map(|m| m.distance_m)
            .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
    }
}
