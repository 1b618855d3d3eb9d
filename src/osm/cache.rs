//! In-memory memoization of enrichment lookups, keyed by a rounded
//! coordinate grid cell so nearby points share entries.
//!
//! A `None` value is a first-class "known empty" entry: a lookup that
//! failed or found nothing is not retried for the lifetime of the cache.

use crate::geometry::Coordinate;
use parking_lot::Mutex;
use std::collections::HashMap;

/// Grid resolution in degrees; ~10 m of latitude per cell.
pub const GRID_RESOLUTION_DEG: f64 = 1e-4;

type GridCell = (i32, i32);

fn cell_of(coordinate: Coordinate) -> GridCell {
    (
        (coordinate.lat / GRID_RESOLUTION_DEG).round() as i32,
        (coordinate.lon / GRID_RESOLUTION_DEG).round() as i32,
    )
}

pub struct LookupCache<T> {
    cells: Mutex<HashMap<GridCell, Option<T>>>,
}

impl<T> LookupCache<T> {
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.cells.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.lock().is_empty()
    }
}

impl<T: Clone> LookupCache<T> {
    /// Return the cached value for this coordinate's grid cell, computing
    /// and storing it on a miss. `None` results are cached too (negative
    /// entries) and short-circuit later lookups.
    ///
    /// The lock is held only around map access, never across `compute` —
    /// so two concurrent misses on one cell may both run `compute`. There
    /// is no single-flight de-duplication; the first writer's value wins
    /// and both callers converge on it.
    pub fn get_or_compute(
        &self,
        coordinate: Coordinate,
        compute: impl FnOnce() -> Option<T>,
    ) -> Option<T> {
        let cell = cell_of(coordinate);
        if let Some(cached) = self.cells.lock().get(&cell) {
            log::debug!("lookup cache hit for cell {cell:?}");
            return cached.clone();
        }

        log::debug!("lookup cache miss for cell {cell:?}");
        let value = compute();
        self.cells.lock().entry(cell).or_insert(value).clone()
    }
}

impl<T> Default for LookupCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_second_lookup_is_served_from_cache() {
        let cache: LookupCache<f64> = LookupCache::new();
        let calls = Cell::new(0u32);
        let coordinate = Coordinate::new(40.0, -75.0);

        let first = cache.get_or_compute(coordinate, || {
            calls.set(calls.get() + 1);
            Some(123.5)
        });
        let second = cache.get_or_compute(coordinate, || {
            calls.set(calls.get() + 1);
            Some(999.0)
        });

        assert_eq!(first, Some(123.5));
        assert_eq!(second, Some(123.5));
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_negative_entry_short_circuits() {
        let cache: LookupCache<String> = LookupCache::new();
        let calls = Cell::new(0u32);
        let coordinate = Coordinate::new(51.5, -0.1);

        let first = cache.get_or_compute(coordinate, || {
            calls.set(calls.get() + 1);
            None
        });
        // The second compute would succeed, but must never run.
        let second = cache.get_or_compute(coordinate, || {
            calls.set(calls.get() + 1);
            Some("should not happen".to_string())
        });

        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_nearby_points_share_a_cell() {
        let cache: LookupCache<u8> = LookupCache::new();
        let calls = Cell::new(0u32);

        // ~1 m apart — same 1e-4° cell.
        for coordinate in [Coordinate::new(40.00001, -75.0), Coordinate::new(40.00002, -75.0)] {
            cache.get_or_compute(coordinate, || {
                calls.set(calls.get() + 1);
                Some(1)
            });
        }
        assert_eq!(calls.get(), 1);

        // ~100 m away — a different cell.
        cache.get_or_compute(Coordinate::new(40.001, -75.0), || {
            calls.set(calls.get() + 1);
            Some(2)
        });
        assert_eq!(calls.get(), 2);
        assert_eq!(cache.len(), 2);
    }
}
