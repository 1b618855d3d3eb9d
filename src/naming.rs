//! Display labels for location groups, derived from the tags the members
//! share and, when those are not enough, a reverse geocode of the group
//! centroid.

use crate::geometry::Coordinate;
use crate::types::{LocationGroup, LocationResult};
use std::collections::HashMap;

/// Lifecycle tags that become a label prefix when shared by a whole group.
const STATUS_TAGS: &[&str] = &["abandoned", "ruins", "disused", "demolished"];

/// Classification keys checked for a type label, most specific first.
const TYPE_KEY_PRIORITY: &[&str] = &["amenity", "military", "building", "historic", "landuse"];

/// Tag values that carry no descriptive information.
const PLACEHOLDER_VALUES: &[&str] = &["yes", "true", "1"];

/// Address segments containing these are street lines, not localities.
const STREET_WORDS: &[&str] = &[
    "street", "road", "avenue", "lane", "drive", "boulevard", "way", "highway", "trail",
];

/// Address segments containing these are administrative districts we skip
/// in favor of the locality proper.
const DISTRICT_WORDS: &[&str] = &["county", "district", "municipality", "borough", "township"];

/// Derive a display label for a group.
///
/// `reverse_geocode` maps the group centroid to a free-text address; the
/// engine passes its shared cache-backed lookup here so naming spends the
/// same rate budget as every other geocoding call.
pub fn label(
    group: &LocationGroup,
    reverse_geocode: impl FnOnce(Coordinate) -> Option<String>,
) -> String {
    let members = &group.members;

    let base = match unanimous_name(members) {
        Some(shared) => shared,
        None => {
            let common = common_tags(members);
            let locality = group
                .centroid()
                .and_then(reverse_geocode)
                .as_deref()
                .and_then(locality_region);
            match locality {
                Some(place) => describe(&common, &place),
                // Geocoding failed: fall back to the shortest member name.
                None => shortest_name(members),
            }
        }
    };

    if members.len() > 1 {
        format!("{base} ({} places)", members.len())
    } else {
        base
    }
}

/// Compose "Status type near locality" from the group's common tags.
fn describe(common: &HashMap<String, String>, place: &str) -> String {
    let status = status_word(common);
    let kind = type_label(common);
    let subject = match (status, kind) {
        // "historic=ruins" would otherwise yield "Ruins ruins".
        (Some(status), Some(kind)) if kind == status => capitalize(&kind),
        (Some(status), Some(kind)) => format!("{} {kind}", capitalize(status)),
        (Some(status), None) => format!("{} sites", capitalize(status)),
        (None, Some(kind)) => capitalize(&kind),
        (None, None) => "Sites".to_string(),
    };
    format!("{subject} near {place}")
}

/// The name tag shared by every member, when there is one.
fn unanimous_name(members: &[LocationResult]) -> Option<String> {
    let first = members.first()?.tags.get("name")?;
    if first.trim().is_empty() || PLACEHOLDER_VALUES.contains(&first.as_str()) {
        return None;
    }
    members
        .iter()
        .all(|m| m.tags.get("name") == Some(first))
        .then(|| first.clone())
}

/// Tags holding the same value across all members.
pub(crate) fn common_tags(members: &[LocationResult]) -> HashMap<String, String> {
    let mut common = match members.first() {
        Some(first) => first.tags.clone(),
        None => return HashMap::new(),
    };
    for member in &members[1..] {
        common.retain(|key, value| {
            member
                .tags
                .get(key)
                .is_some_and(|other| other.as_str() == value.as_str())
        });
    }
    common
}

fn status_word(common: &HashMap<String, String>) -> Option<&'static str> {
    STATUS_TAGS.iter().copied().find(|status| {
        common.get(*status).is_some_and(|value| value != "no")
            || common.values().any(|value| value == status)
    })
}

/// The most specific classification value shared by the group, with
/// underscores flattened ("nuclear_bunker" → "nuclear bunker").
pub(crate) fn type_label(common: &HashMap<String, String>) -> Option<String> {
    TYPE_KEY_PRIORITY.iter().find_map(|key| {
        common
            .get(*key)
            .filter(|value| !PLACEHOLDER_VALUES.contains(&value.as_str()))
            .map(|value| value.replace('_', " "))
    })
}

/// Pick the locality + region out of a free-text address: drop numeric
/// segments (house numbers, postcodes), street and district lines, and the
/// trailing country, then keep the last two survivors.
pub(crate) fn locality_region(address: &str) -> Option<String> {
    let mut kept: Vec<&str> = address
        .split(", ")
        .map(str::trim)
        .filter(|segment| !segment.is_empty() && keep_segment(segment))
        .collect();
    if kept.len() > 1 {
        kept.pop(); // country
    }
    match kept.as_slice() {
        [] => None,
        [only] => Some((*only).to_string()),
        [.., locality, region] => Some(format!("{locality}, {region}")),
    }
}

fn keep_segment(segment: &str) -> bool {
    if segment.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        return false;
    }
    let lower = segment.to_lowercase();
    !STREET_WORDS
        .iter()
        .chain(DISTRICT_WORDS)
        .any(|word| lower.split_whitespace().any(|token| token == *word))
}

fn shortest_name(members: &[LocationResult]) -> String {
    members
        .iter()
        .map(|m| m.name.as_str())
        .min_by_key(|name| name.len())
        .unwrap_or("Unnamed")
        .to_string()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElementKind;

    fn member(id: i64, name: Option<&str>, extra: &[(&str, &str)]) -> LocationResult {
        let mut tags: HashMap<String, String> = extra
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if let Some(name) = name {
            tags.insert("name".into(), name.into());
        }
        LocationResult {
            id,
            kind: ElementKind::Node,
            coordinate: Coordinate::new(40.0, -75.0),
            name: name.unwrap_or("node").to_string(),
            tags,
            distance_m: Some(id as f64),
            road_distance_m: None,
            elevation_m: None,
        }
    }

    const ADDRESS: &str =
        "1, Base Road, Fort Irwin, San Bernardino County, California, 92310, United States";

    #[test]
    fn test_unanimous_name_wins_without_geocoding() {
        let group = LocationGroup::new(vec![
            member(1, Some("Fort Douglas"), &[]),
            member(2, Some("Fort Douglas"), &[]),
        ]);
        let label = label(&group, |_| panic!("geocoder must not be called"));
        assert_eq!(label, "Fort Douglas (2 places)");
    }

    #[test]
    fn test_singleton_has_no_count_suffix() {
        let group = LocationGroup::new(vec![member(1, Some("Old Mill"), &[])]);
        assert_eq!(label(&group, |_| None), "Old Mill");
    }

    #[test]
    fn test_common_type_with_locality() {
        let group = LocationGroup::new(vec![
            member(1, None, &[("military", "bunker")]),
            member(2, None, &[("military", "bunker")]),
        ]);
        let label = label(&group, |_| Some(ADDRESS.to_string()));
        assert_eq!(label, "Bunker near Fort Irwin, California (2 places)");
    }

    #[test]
    fn test_status_prefix() {
        let group = LocationGroup::new(vec![
            member(1, None, &[("abandoned", "yes"), ("building", "barracks")]),
            member(2, None, &[("abandoned", "yes"), ("building", "barracks")]),
        ]);
        let label = label(&group, |_| Some(ADDRESS.to_string()));
        assert_eq!(label, "Abandoned barracks near Fort Irwin, California (2 places)");
    }

    #[test]
    fn test_status_from_common_value() {
        let group = LocationGroup::new(vec![member(1, None, &[("historic", "ruins")])]);
        // "ruins" is both the status and the most specific type value; it
        // appears once.
        assert_eq!(
            label(&group, |_| Some(ADDRESS.to_string())),
            "Ruins near Fort Irwin, California"
        );
    }

    #[test]
    fn test_geocode_failure_falls_back_to_shortest_name() {
        let group = LocationGroup::new(vec![
            member(1, Some("The Old Waterworks"), &[]),
            member(2, Some("Hut"), &[]),
        ]);
        assert_eq!(label(&group, |_| None), "Hut (2 places)");
    }

    #[test]
    fn test_mixed_tags_have_no_common_type() {
        let group = LocationGroup::new(vec![
            member(1, None, &[("amenity", "hospital")]),
            member(2, None, &[("building", "church")]),
        ]);
        let label = label(&group, |_| Some(ADDRESS.to_string()));
        assert_eq!(label, "Sites near Fort Irwin, California (2 places)");
    }

    #[test]
    fn test_locality_region_heuristics() {
        assert_eq!(
            locality_region(ADDRESS).as_deref(),
            Some("Fort Irwin, California")
        );
        assert_eq!(
            locality_region("Springfield, United States").as_deref(),
            Some("Springfield")
        );
        assert_eq!(locality_region("").as_deref(), None);
        assert_eq!(
            locality_region("92310, 1, 45").as_deref(),
            None
        );
    }

    #[test]
    fn test_underscored_type_values_flatten() {
        let group = LocationGroup::new(vec![member(1, None, &[("landuse", "military_training")])]);
        assert_eq!(
            label(&group, |_| Some(ADDRESS.to_string())),
            "Military training near Fort Irwin, California"
        );
    }
}
