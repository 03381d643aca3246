use crate::geo::{normalize_lat, normalize_lon};
use std::collections::HashMap;

/// Spatial hash grid for O(1) region queries.
/// Divides the world into fixed-size cells in degrees; items are
/// bucketed by position and looked up by cell neighborhood.
pub struct SpatialGrid<T> {
    /// Grid cells indexed by (cell_x, cell_y)
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// All items (cells store indices into this vec)
    items: Vec<T>,
    /// Cell size in degrees
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    /// Convert lon/lat to cell coordinates. Longitude is normalized so
    /// cells line up across the antimeridian seam.
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (normalize_lon(lon) / self.cell_size).floor() as i32;
        let y = (normalize_lat(lat) / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Insert an item at a geographic position
    pub fn insert(&mut self, lon: f64, lat: f64, item: T) {
        let idx = self.items.len();
        self.items.push(item);

        let cell = self.to_cell(lon, lat);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Query items in a radius around a point (returns indices).
    /// Conservative: returns everything in the covering cell block,
    /// callers apply their own exact distance check.
    pub fn query_radius(&self, lon: f64, lat: f64, radius_degrees: f64) -> Vec<usize> {
        let center_cell = self.to_cell(lon, lat);
        let cell_radius = (radius_degrees / self.cell_size).ceil() as i32;

        let mut results = Vec::new();
        for dy in -cell_radius..=cell_radius {
            for dx in -cell_radius..=cell_radius {
                let cell = (center_cell.0 + dx, center_cell.1 + dy);
                if let Some(indices) = self.cells.get(&cell) {
                    results.extend_from_slice(indices);
                }
            }
        }
        results
    }

    /// Occupied cells as index groups, ordered by each cell's first
    /// insertion. The clustering pass consumes these groups directly;
    /// the ordering keeps cluster output deterministic.
    pub fn cell_groups(&self) -> Vec<Vec<usize>> {
        let mut groups: Vec<&Vec<usize>> = self.cells.values().collect();
        groups.sort_by_key(|g| g.first().copied().unwrap_or(usize::MAX));
        groups.iter().map(|g| (*g).clone()).collect()
    }

    #[inline(always)]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx)
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_groups_bucket_nearby_items() {
        let mut grid = SpatialGrid::new(5.0);
        grid.insert(10.1, 48.0, "a");
        grid.insert(10.2, 48.1, "b");
        grid.insert(-120.0, 35.0, "c");

        let groups = grid.cell_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![0, 1]);
        assert_eq!(groups[1], vec![2]);
    }

    #[test]
    fn test_query_radius_finds_neighbors() {
        let mut grid = SpatialGrid::new(1.0);
        grid.insert(0.0, 0.0, "near");
        grid.insert(0.4, 0.4, "near2");
        grid.insert(90.0, 45.0, "far");

        let hits = grid.query_radius(0.0, 0.0, 1.0);
        assert!(hits.contains(&0));
        assert!(hits.contains(&1));
        assert!(!hits.contains(&2));
    }

    #[test]
    fn test_antimeridian_buckets_consistently() {
        let mut grid = SpatialGrid::new(2.0);
        grid.insert(179.9, 0.0, "e");
        grid.insert(-179.9, 0.0, "w");
        // Normalization keeps both sides of the seam in non-negative
        // cells, so each is found when queried near itself
        assert!(grid.query_radius(179.9, 0.0, 2.0).contains(&0));
        assert!(grid.query_radius(-179.9, 0.0, 2.0).contains(&1));
    }

    #[test]
    fn test_empty() {
        let grid: SpatialGrid<u8> = SpatialGrid::new(4.0);
        assert!(grid.is_empty());
        assert!(grid.cell_groups().is_empty());
        assert!(grid.query_radius(0.0, 0.0, 10.0).is_empty());
    }
}
