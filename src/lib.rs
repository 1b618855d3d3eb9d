//! GeoScout — concurrent geospatial search over OpenStreetMap data.
//!
//! Given an area (radius around a point, or a polygon) and a set of tag
//! patterns, GeoScout queries the Overpass API in parallel batches,
//! deduplicates and enriches every hit (distance to center, elevation,
//! display name), clusters nearby hits into groups by transitive chaining,
//! and ranks the output.

pub mod cluster;
pub mod engine;
pub mod geometry;
pub mod naming;
pub mod osm;
pub mod tags;
pub mod types;
pub mod wordlist;

pub use cluster::{group, CLUSTER_THRESHOLD_M};
pub use engine::{EngineConfig, SearchEngine};
pub use geometry::{format_coordinate, parse_coordinate, point_to_segment_distance, Axis, Coordinate};
pub use tags::TagPattern;
pub use types::{
    ElementKind, LocationGroup, LocationResult, SearchArea, SearchError, SearchRequest, SortKey,
};
pub use wordlist::load_wordlist;
