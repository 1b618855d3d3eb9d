//! Transitive chain clustering of search results.
//!
//! Two results land in the same group when a chain of close-enough hops
//! connects them, even if their direct distance exceeds the threshold.
//! That is the intended behavior: a string of bunkers 80 m apart is one
//! site, no matter how long the string gets.

use crate::types::{LocationGroup, LocationResult};
use std::cmp::Ordering;
use std::collections::VecDeque;

/// Hop threshold between cluster members, meters.
pub const CLUSTER_THRESHOLD_M: f64 = 100.0;

/// Group results with the default threshold.
pub fn group(results: Vec<LocationResult>) -> Vec<LocationGroup> {
    group_within(results, CLUSTER_THRESHOLD_M)
}

/// Group results whose pairwise chain hops stay within `threshold_m`.
///
/// Results are processed in distance-to-center order (unknown distances
/// last) so cluster seeds are stable. Each seed grows by breadth-first
/// expansion: every still-unassigned result within the threshold of any
/// frontier member joins the group and the frontier. Quadratic in the
/// result count, which the caller bounds via its result limit.
pub fn group_within(mut results: Vec<LocationResult>, threshold_m: f64) -> Vec<LocationGroup> {
    if results.is_empty() {
        return Vec::new();
    }
    results.sort_by(|a, b| cmp_distance(a.distance_m, b.distance_m));

    let mut assigned = vec![false; results.len()];
    let mut memberships: Vec<Vec<usize>> = Vec::new();
    for seed in 0..results.len() {
        if assigned[seed] {
            continue;
        }
        assigned[seed] = true;
        let mut members = vec![seed];
        let mut frontier = VecDeque::from([seed]);
        while let Some(current) = frontier.pop_front() {
            for candidate in 0..results.len() {
                if assigned[candidate] {
                    continue;
                }
                let hop = results[current]
                    .coordinate
                    .distance_m(&results[candidate].coordinate);
                if hop <= threshold_m {
                    assigned[candidate] = true;
                    members.push(candidate);
                    frontier.push_back(candidate);
                }
            }
        }
        memberships.push(members);
    }

    let mut slots: Vec<Option<LocationResult>> = results.into_iter().map(Some).collect();
    let mut groups: Vec<LocationGroup> = memberships
        .into_iter()
        .map(|indices| {
            LocationGroup::new(
                indices
                    .into_iter()
                    .filter_map(|index| slots[index].take())
                    .collect(),
            )
        })
        .collect();

    // Biggest clusters first; ties go to the one nearest the center.
    groups.sort_by(|a, b| {
        b.members
            .len()
            .cmp(&a.members.len())
            .then_with(|| cmp_distance(a.min_distance_m(), b.min_distance_m()))
    });
    groups
}

/// Ascending comparison of optional distances, unknown values last.
pub(crate) fn cmp_distance(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
