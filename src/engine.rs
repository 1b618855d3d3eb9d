//! Search orchestration: fan-out of tag batches onto a fixed worker pool,
//! enrichment, fan-in, deduplication, ranking, and grouping.

use crate::cluster;
use crate::geometry::{self, Coordinate};
use crate::naming;
use crate::osm::cache::LookupCache;
use crate::osm::client::{ApiClient, ClientConfig};
use crate::osm::query::{self, AreaFilter, DEFAULT_BATCH_SIZE};
use crate::osm::types::RawElement;
use crate::tags::TagPattern;
use crate::types::{
    ElementKind, LocationGroup, LocationResult, SearchError, SearchRequest, SortKey,
};
use rayon::prelude::*;
use std::collections::HashSet;

/// Worker count for batch fan-out. Empirically tuned: fewer workers waste
/// wall-clock time, more trip the spatial-query service's own rate
/// limiting.
pub const MAX_CONCURRENT_BATCHES: usize = 4;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub client: ClientConfig,
    pub max_concurrent_batches: usize,
    pub batch_size: usize,
    pub cluster_threshold_m: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            max_concurrent_batches: MAX_CONCURRENT_BATCHES,
            batch_size: DEFAULT_BATCH_SIZE,
            cluster_threshold_m: cluster::CLUSTER_THRESHOLD_M,
        }
    }
}

/// The engine instance owns every piece of shared mutable state: the HTTP
/// client with its per-service pacing, both lookup caches, and the worker
/// pool. Nothing here is global; two engines never contend.
pub struct SearchEngine {
    config: EngineConfig,
    client: ApiClient,
    geocode_cache: LookupCache<String>,
    elevation_cache: LookupCache<f64>,
    pool: rayon::ThreadPool,
}

impl SearchEngine {
    pub fn new(config: EngineConfig) -> Result<Self, SearchError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.max_concurrent_batches.max(1))
            .thread_name(|index| format!("search-worker-{index}"))
            .build()
            .map_err(|err| SearchError::WorkerPool(err.to_string()))?;
        let client = ApiClient::new(config.client.clone());
        Ok(Self {
            config,
            client,
            geocode_cache: LookupCache::new(),
            elevation_cache: LookupCache::new(),
            pool,
        })
    }

    pub fn with_defaults() -> Result<Self, SearchError> {
        Self::new(EngineConfig::default())
    }

    /// Run a full search: validate, fan out tag batches, enrich, merge,
    /// deduplicate, rank, cluster, and name.
    ///
    /// A failing batch is logged and contributes zero results; the search
    /// as a whole only errors on invalid input.
    pub fn search(&self, request: &SearchRequest) -> Result<Vec<LocationGroup>, SearchError> {
        request.validate()?;
        let patterns = TagPattern::parse_all(&request.tags);
        if patterns.is_empty() {
            return Err(SearchError::NoTags);
        }
        let exclusions = TagPattern::parse_all(&request.excluded);
        let area = AreaFilter::from_area(&request.area);
        let center = request.area.center();

        let roads = if request.include_road_distance {
            self.fetch_roads(&area)
        } else {
            None
        };
        let roads_ref = roads.as_deref();

        let batches = query::build_batches(patterns, self.config.batch_size);
        let batch_count = batches.len();
        let partials: Vec<Vec<LocationResult>> = self.pool.install(|| {
            batches
                .into_par_iter()
                .map(|batch| {
                    match self.run_batch(&batch, &area, center, &exclusions, request, roads_ref) {
                        Ok(results) => results,
                        Err(err) => {
                            log::warn!("batch [{}] failed, dropping it: {err}", join(&batch));
                            Vec::new()
                        }
                    }
                })
                .collect()
        });

        let mut merged = dedup_first_seen(partials);
        log::info!("{} unique results from {batch_count} batches", merged.len());
        sort_results(&mut merged, request.sort_by);
        merged.truncate(request.limit);

        let mut groups = cluster::group_within(merged, self.config.cluster_threshold_m);
        for group in &mut groups {
            group.name = naming::label(group, |centroid| self.address_of(centroid));
        }
        Ok(groups)
    }

    /// Run one batch: query, filter exclusions, enrich survivors.
    fn run_batch(
        &self,
        batch: &[TagPattern],
        area: &AreaFilter,
        center: Option<Coordinate>,
        exclusions: &[TagPattern],
        request: &SearchRequest,
        roads: Option<&[Vec<Coordinate>]>,
    ) -> Result<Vec<LocationResult>, SearchError> {
        let query_text = query::union_query(batch, area);
        let response = self.client.overpass(&query_text)?;
        let raw_count = response.elements.len();

        let mut results = Vec::new();
        for element in response.elements {
            let Some(raw) = element.into_raw() else {
                continue;
            };
            if exclusions.iter().any(|rule| rule.excludes(&raw.tags)) {
                continue;
            }
            results.push(self.build_result(raw, center, request, roads));
        }
        log::debug!(
            "batch [{}]: {raw_count} raw elements, kept {}",
            join(batch),
            results.len()
        );
        Ok(results)
    }

    fn build_result(
        &self,
        raw: RawElement,
        center: Option<Coordinate>,
        request: &SearchRequest,
        roads: Option<&[Vec<Coordinate>]>,
    ) -> LocationResult {
        let distance_m = center.map(|c| c.distance_m(&raw.coordinate));
        let elevation_m = if request.include_elevation {
            self.elevation_of(raw.coordinate)
        } else {
            None
        };
        let road_distance_m = roads.and_then(|roads| nearest_road_distance(raw.coordinate, roads));
        let name = self.resolve_name(&raw);
        LocationResult {
            id: raw.id,
            kind: raw.kind,
            coordinate: raw.coordinate,
            name,
            tags: raw.tags,
            distance_m,
            road_distance_m,
            elevation_m,
        }
    }

    /// Display name for a single element: its name tag, else a type label
    /// anchored to the reverse-geocoded locality, else type + id.
    fn resolve_name(&self, raw: &RawElement) -> String {
        if let Some(name) = raw.tags.get("name") {
            if !name.trim().is_empty() {
                return name.clone();
            }
        }
        let kind = naming::type_label(&raw.tags).unwrap_or_else(|| raw.kind.to_string());
        match self
            .address_of(raw.coordinate)
            .as_deref()
            .and_then(naming::locality_region)
        {
            Some(place) => format!("{kind} near {place}"),
            None => format!("{kind} {}", raw.id),
        }
    }

    /// Reverse-geocoded address of a point, through the shared cache.
    /// Lookup failures degrade to None and are cached negatively.
    fn address_of(&self, coordinate: Coordinate) -> Option<String> {
        self.geocode_cache.get_or_compute(coordinate, || {
            match self.client.reverse_geocode(coordinate) {
                Ok(address) => address,
                Err(err) => {
                    log::debug!("reverse geocoding failed for {coordinate}: {err}");
                    None
                }
            }
        })
    }

    /// Elevation of a point, through the shared cache. Same degradation
    /// policy as [`Self::address_of`].
    fn elevation_of(&self, coordinate: Coordinate) -> Option<f64> {
        self.elevation_cache.get_or_compute(coordinate, || {
            match self.client.elevation(coordinate) {
                Ok(elevation) => elevation,
                Err(err) => {
                    log::debug!("elevation lookup failed for {coordinate}: {err}");
                    None
                }
            }
        })
    }

    /// Prefetch road geometry for road-distance enrichment. Failure leaves
    /// the feature unavailable rather than aborting the search.
    fn fetch_roads(&self, area: &AreaFilter) -> Option<Vec<Vec<Coordinate>>> {
        match self.client.overpass(&query::road_query(area)) {
            Ok(response) => {
                let roads: Vec<Vec<Coordinate>> = response
                    .elements
                    .into_iter()
                    .filter_map(|element| element.into_road())
                    .collect();
                log::info!("prefetched {} road geometries", roads.len());
                Some(roads)
            }
            Err(err) => {
                log::warn!("road prefetch failed, road distances unavailable: {err}");
                None
            }
        }
    }
}

/// Merge batch outputs, keeping the first occurrence of each (kind, id).
fn dedup_first_seen(partials: Vec<Vec<LocationResult>>) -> Vec<LocationResult> {
    let mut seen: HashSet<(ElementKind, i64)> = HashSet::new();
    let mut merged = Vec::new();
    for partial in partials {
        for result in partial {
            if seen.insert((result.kind, result.id)) {
                merged.push(result);
            }
        }
    }
    merged
}

fn sort_results(results: &mut [LocationResult], key: SortKey) {
    match key {
        SortKey::Distance => {
            results.sort_by(|a, b| cluster::cmp_distance(a.distance_m, b.distance_m));
        }
        SortKey::Name => results.sort_by(|a, b| a.name.cmp(&b.name)),
    }
}

/// Smallest distance from a point to any prefetched road segment.
fn nearest_road_distance(point: Coordinate, roads: &[Vec<Coordinate>]) -> Option<f64> {
    roads
        .iter()
        .flat_map(|line| {
            line.windows(2)
                .filter_map(move |pair| geometry::point_to_segment_distance(point, pair[0], pair[1]))
        })
        .min_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
}

fn join(batch: &[TagPattern]) -> String {
    batch
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn result(id: i64, name: &str, lat: f64, lon: f64, distance_m: Option<f64>) -> LocationResult {
        LocationResult {
            id,
            kind: ElementKind::Node,
            coordinate: Coordinate::new(lat, lon),
            name: name.to_string(),
            tags: HashMap::new(),
            distance_m,
            road_distance_m: None,
            elevation_m: None,
        }
    }

    #[test]
    fn test_search_rejects_empty_tags_before_any_network() {
        let engine = SearchEngine::with_defaults().unwrap();
        let request = SearchRequest::circle(Coordinate::new(40.0, -75.0), 1000.0);
        assert!(matches!(engine.search(&request), Err(SearchError::NoTags)));

        // Malformed-only tag lists are just as empty.
        let mut request = SearchRequest::circle(Coordinate::new(40.0, -75.0), 1000.0);
        request.tags = vec!["=broken".to_string(), "  ".to_string()];
        assert!(matches!(engine.search(&request), Err(SearchError::NoTags)));
    }

    #[test]
    fn test_search_rejects_invalid_area_first() {
        let engine = SearchEngine::with_defaults().unwrap();
        let mut request = SearchRequest::circle(Coordinate::new(40.0, -75.0), -5.0);
        request.tags = vec!["amenity=hospital".to_string()];
        assert!(matches!(
            engine.search(&request),
            Err(SearchError::InvalidRadius(_))
        ));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let partials = vec![
            vec![result(1, "from batch one", 40.0, -75.0, Some(10.0))],
            vec![
                result(1, "from batch two", 40.0, -75.0, Some(10.0)),
                result(2, "other", 40.1, -75.0, Some(20.0)),
            ],
        ];
        let merged = dedup_first_seen(partials);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].name, "from batch one");
    }

    #[test]
    fn test_dedup_distinguishes_kinds() {
        let node = result(7, "node", 40.0, -75.0, None);
        let mut way = result(7, "way", 40.0, -75.0, None);
        way.kind = ElementKind::Way;
        let merged = dedup_first_seen(vec![vec![node], vec![way]]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_sort_by_distance_puts_unknown_last() {
        let mut results = vec![
            result(1, "c", 40.0, -75.0, None),
            result(2, "a", 40.0, -75.0, Some(50.0)),
            result(3, "b", 40.0, -75.0, Some(5.0)),
        ];
        sort_results(&mut results, SortKey::Distance);
        assert_eq!(
            results.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![3, 2, 1]
        );
    }

    #[test]
    fn test_sort_by_name() {
        let mut results = vec![
            result(1, "bravo", 40.0, -75.0, None),
            result(2, "alpha", 40.0, -75.0, Some(1.0)),
        ];
        sort_results(&mut results, SortKey::Name);
        assert_eq!(results[0].name, "alpha");
    }

    #[test]
    fn test_nearest_road_distance() {
        let road = vec![
            Coordinate::new(40.0, -75.001),
            Coordinate::new(40.0, -75.0),
            Coordinate::new(40.0, -74.999),
        ];
        let point = Coordinate::new(40.0003, -75.0);
        let distance = nearest_road_distance(point, &[road]).unwrap();
        assert!((distance - 33.4).abs() < 1.0, "got {distance}");

        assert!(nearest_road_distance(point, &[]).is_none());
    }

    #[test]
    fn test_merge_sort_cluster_pipeline() {
        // Three hits: two 30 m apart, one 5 km out; a duplicate of the
        // first arrives from a second batch.
        let partials = vec![
            vec![
                result(1, "near a", 40.0, -75.0, Some(12.0)),
                result(3, "far", 40.045, -75.0, Some(5000.0)),
            ],
            vec![
                result(1, "near a again", 40.0, -75.0, Some(12.0)),
                result(2, "near b", 40.00027, -75.0, Some(40.0)),
            ],
        ];
        let mut merged = dedup_first_seen(partials);
        assert_eq!(merged.len(), 3);
        sort_results(&mut merged, SortKey::Distance);

        let groups = cluster::group_within(merged, 100.0);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members.len(), 2);
        assert!(groups[0].distance_span_m() <= 35.0);
        assert_eq!(groups[1].members.len(), 1);
        assert_eq!(groups[1].members[0].name, "far");
    }
}
