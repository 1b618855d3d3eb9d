//! Overpass QL construction: area clauses, per-batch union queries,
//! batching. Pure string building, deterministic, no I/O.

use crate::geometry::Coordinate;
use crate::tags::{TagPattern, COMMON_KEYS};
use crate::types::SearchArea;
use std::fmt::Write;

/// One tag per query by default, to bound individual query complexity.
pub const DEFAULT_BATCH_SIZE: usize = 1;

/// Server-side timeout declared inside the query text, seconds.
const QUERY_TIMEOUT_S: u32 = 25;

/// The area constraint rendered into every clause.
#[derive(Debug, Clone)]
pub enum AreaFilter {
    Around { radius_m: f64, center: Coordinate },
    Polygon(String),
}

impl AreaFilter {
    pub fn from_area(area: &SearchArea) -> Self {
        match area {
            SearchArea::Circle { center, radius_m } => Self::Around {
                radius_m: *radius_m,
                center: *center,
            },
            SearchArea::Polygon(vertices) => {
                let mut spec = String::new();
                for vertex in vertices {
                    if !spec.is_empty() {
                        spec.push(' ');
                    }
                    let _ = write!(spec, "{:.7} {:.7}", vertex.lat, vertex.lon);
                }
                Self::Polygon(spec)
            }
        }
    }

    fn clause(&self) -> String {
        match self {
            Self::Around { radius_m, center } => {
                format!("(around:{:.0},{:.7},{:.7})", radius_m, center.lat, center.lon)
            }
            Self::Polygon(spec) => format!("(poly:\"{spec}\")"),
        }
    }
}

/// Split patterns into fixed-size batches. A size of 0 is clamped to 1.
pub fn build_batches(patterns: Vec<TagPattern>, batch_size: usize) -> Vec<Vec<TagPattern>> {
    let size = batch_size.max(1);
    patterns.chunks(size).map(<[TagPattern]>::to_vec).collect()
}

/// Build one query whose clauses union all patterns of a batch against
/// nodes and ways.
///
/// An exact pattern becomes a `key=value` clause pair. A bare keyword
/// unions a "has this key" pair with, for every common classification key,
/// a "classification key equals this keyword" pair — recovering tags that
/// mappers use loosely as both key and value.
pub fn union_query(batch: &[TagPattern], area: &AreaFilter) -> String {
    let area_clause = area.clause();
    let mut query = format!("[out:json][timeout:{QUERY_TIMEOUT_S}];\n(\n");
    for pattern in batch {
        match pattern {
            TagPattern::Exact { key, value } => {
                push_pair(&mut query, key, Some(value), &area_clause);
            }
            TagPattern::Bare { key } => {
                push_pair(&mut query, key, None, &area_clause);
                for common in COMMON_KEYS {
                    push_pair(&mut query, common, Some(key), &area_clause);
                }
            }
        }
    }
    query.push_str(");\nout center;\n");
    query
}

/// Query for road geometry in the area, used by the road-distance prefetch.
pub fn road_query(area: &AreaFilter) -> String {
    format!(
        "[out:json][timeout:{QUERY_TIMEOUT_S}];\nway[\"highway\"]{};\nout geom;\n",
        area.clause()
    )
}

/// Append the node+way clause pair for one tag selector.
fn push_pair(query: &mut String, key: &str, value: Option<&str>, area_clause: &str) {
    let selector = match value {
        Some(value) => format!("[\"{}\"=\"{}\"]", escape(key), escape(value)),
        None => format!("[\"{}\"]", escape(key)),
    };
    let _ = writeln!(query, "  node{selector}{area_clause};");
    let _ = writeln!(query, "  way{selector}{area_clause};");
}

fn escape(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circle() -> AreaFilter {
        AreaFilter::from_area(&SearchArea::Circle {
            center: Coordinate::new(40.0, -75.0),
            radius_m: 1000.0,
        })
    }

    #[test]
    fn test_build_batches_default_size() {
        let patterns: Vec<TagPattern> = ["a", "b", "c"]
            .iter()
            .filter_map(|s| TagPattern::parse(s))
            .collect();
        let batches = build_batches(patterns, DEFAULT_BATCH_SIZE);
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn test_build_batches_chunking() {
        let patterns: Vec<TagPattern> = ["a", "b", "c", "d", "e"]
            .iter()
            .filter_map(|s| TagPattern::parse(s))
            .collect();
        let batches = build_batches(patterns.clone(), 2);
        assert_eq!(
            batches.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![2, 2, 1]
        );
        // A size of 0 is clamped rather than panicking.
        assert_eq!(build_batches(patterns, 0).len(), 5);
    }

    #[test]
    fn test_union_query_exact() {
        let batch = vec![TagPattern::parse("amenity=hospital").unwrap()];
        let query = union_query(&batch, &circle());
        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.contains("node[\"amenity\"=\"hospital\"](around:1000,40.0000000,-75.0000000);"));
        assert!(query.contains("way[\"amenity\"=\"hospital\"](around:1000,40.0000000,-75.0000000);"));
        assert!(query.ends_with("out center;\n"));
    }

    #[test]
    fn test_union_query_bare_recovers_common_keys() {
        let batch = vec![TagPattern::parse("bunker").unwrap()];
        let query = union_query(&batch, &circle());
        assert!(query.contains("node[\"bunker\"]"));
        assert!(query.contains("node[\"military\"=\"bunker\"]"));
        assert!(query.contains("way[\"building\"=\"bunker\"]"));
    }

    #[test]
    fn test_union_query_polygon() {
        let area = AreaFilter::from_area(&SearchArea::Polygon(vec![
            Coordinate::new(40.1, -75.1),
            Coordinate::new(40.1, -74.9),
            Coordinate::new(39.9, -75.0),
        ]));
        let batch = vec![TagPattern::parse("historic=fort").unwrap()];
        let query = union_query(&batch, &area);
        assert!(query.contains(
            "(poly:\"40.1000000 -75.1000000 40.1000000 -74.9000000 39.9000000 -75.0000000\")"
        ));
    }

    #[test]
    fn test_road_query() {
        let query = road_query(&circle());
        assert!(query.contains("way[\"highway\"](around:1000,"));
        assert!(query.ends_with("out geom;\n"));
    }

    #[test]
    fn test_escaped_quotes() {
        let batch = vec![TagPattern::Exact {
            key: "name".into(),
            value: "The \"Dive\"".into(),
        }];
        let query = union_query(&batch, &circle());
        assert!(query.contains("node[\"name\"=\"The \\\"Dive\\\"\"]"));
    }
}
