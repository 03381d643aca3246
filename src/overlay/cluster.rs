use crate::geo::GeoPoint;
use crate::map::spatial::SpatialGrid;
use crate::overlay::primitive::{Locatable, ObjectRef};
use glam::DVec2;
use std::f64::consts::TAU;

/// One clustered entry: the object it stands for and the point the
/// index places it by (captured from the member's `Locatable` at add
/// time; a line's adapter reports its fixed anchor here).
struct Entry {
    target: ObjectRef,
    at: GeoPoint,
}

/// A group of co-located members at the current zoom
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    pub center: GeoPoint,
    pub members: Vec<ObjectRef>,
}

impl Cluster {
    pub fn is_singleton(&self) -> bool {
        self.members.len() == 1
    }
}

/// Spatial aggregation layer: groups nearby point-like primitives into
/// one representative badge at low zoom, splitting as the cell size
/// shrinks with zoom. Built on the spatial hash grid.
pub struct ClusterIndex {
    entries: Vec<Entry>,
    base_cell_deg: f64,
}

impl ClusterIndex {
    const DEFAULT_CELL_DEG: f64 = 16.0;

    pub fn new() -> Self {
        Self::with_cell_size(Self::DEFAULT_CELL_DEG)
    }

    pub fn with_cell_size(base_cell_deg: f64) -> Self {
        Self {
            entries: Vec::new(),
            base_cell_deg,
        }
    }

    /// Index a member by its current location. Re-adding an already
    /// indexed object refreshes its point instead of duplicating it.
    pub fn add(&mut self, target: ObjectRef, member: &impl Locatable) {
        let at = member.location();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.target == target) {
            entry.at = at;
        } else {
            self.entries.push(Entry { target, at });
        }
    }

    /// Remove a member; no-op when it was never indexed
    pub fn remove(&mut self, target: ObjectRef) {
        self.entries.retain(|e| e.target != target);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, target: ObjectRef) -> bool {
        self.entries.iter().any(|e| e.target == target)
    }

    /// The point a member was indexed at
    pub fn anchor_of(&self, target: ObjectRef) -> Option<GeoPoint> {
        self.entries
            .iter()
            .find(|e| e.target == target)
            .map(|e| e.at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cell size shrinks as zoom grows, so clusters split on the way in
    fn cell_size(&self, zoom: f64) -> f64 {
        (self.base_cell_deg / zoom.max(1.0)).max(0.25)
    }

    /// Group members into clusters for the given zoom. Each occupied
    /// grid cell becomes one cluster centered on the member centroid;
    /// output order follows insertion order of each cell's first member.
    pub fn clusters(&self, zoom: f64) -> Vec<Cluster> {
        let mut grid = SpatialGrid::new(self.cell_size(zoom));
        for (idx, entry) in self.entries.iter().enumerate() {
            grid.insert(entry.at.lon, entry.at.lat, idx);
        }

        grid.cell_groups()
            .into_iter()
            .map(|group| {
                let mut centroid = DVec2::ZERO;
                let members = group
                    .iter()
                    .filter_map(|&idx| grid.get(idx))
                    .map(|&entry_idx| {
                        let entry = &self.entries[entry_idx];
                        centroid += entry.at.to_vec();
                        entry.target
                    })
                    .collect::<Vec<_>>();
                let center = GeoPoint::from_vec(centroid / members.len().max(1) as f64);
                Cluster { center, members }
            })
            .collect()
    }

    /// Fan-out positions for expanding a cluster: members arranged in a
    /// ring around the cluster center. The caller routes these through
    /// the registry's `Locatable` impls, so markers move and lines
    /// silently keep their anchors.
    pub fn spread(&self, cluster: &Cluster, zoom: f64) -> Vec<(ObjectRef, GeoPoint)> {
        let n = cluster.members.len();
        if n < 2 {
            return Vec::new();
        }

        let radius = self.cell_size(zoom) * 0.6;
        let center = cluster.center.to_vec();

        cluster
            .members
            .iter()
            .enumerate()
            .map(|(i, &target)| {
                let angle = TAU * i as f64 / n as f64;
                let offset = DVec2::new(angle.cos(), angle.sin()) * radius;
                (target, GeoPoint::from_vec(center + offset))
            })
            .collect()
    }
}

impl Default for ClusterIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::primitive::ObjectKind;

    struct At(GeoPoint);

    impl Locatable for At {
        fn location(&self) -> GeoPoint {
            self.0
        }
        fn set_location(&mut self, to: GeoPoint) {
            self.0 = to;
        }
    }

    fn device(id: u64) -> ObjectRef {
        ObjectRef::new(ObjectKind::Device, id)
    }

    #[test]
    fn test_nearby_members_cluster_at_low_zoom() {
        let mut index = ClusterIndex::new();
        index.add(device(1), &At(GeoPoint::new(48.0, 2.0)));
        index.add(device(2), &At(GeoPoint::new(48.5, 2.5)));
        index.add(device(3), &At(GeoPoint::new(-30.0, 140.0)));

        let clusters = index.clusters(1.0);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![device(1), device(2)]);
        assert!(clusters[1].is_singleton());
    }

    #[test]
    fn test_clusters_split_as_zoom_grows() {
        let mut index = ClusterIndex::new();
        index.add(device(1), &At(GeoPoint::new(40.0, 2.0)));
        index.add(device(2), &At(GeoPoint::new(47.0, 9.0)));

        assert_eq!(index.clusters(1.0).len(), 1);
        assert_eq!(index.clusters(50.0).len(), 2);
    }

    #[test]
    fn test_cluster_center_is_member_centroid() {
        let mut index = ClusterIndex::new();
        index.add(device(1), &At(GeoPoint::new(10.0, 20.0)));
        index.add(device(2), &At(GeoPoint::new(12.0, 22.0)));

        let clusters = index.clusters(1.0);
        assert_eq!(clusters[0].center, GeoPoint::new(11.0, 21.0));
    }

    #[test]
    fn test_re_add_refreshes_instead_of_duplicating() {
        let mut index = ClusterIndex::new();
        index.add(device(1), &At(GeoPoint::new(0.0, 0.0)));
        index.add(device(1), &At(GeoPoint::new(5.0, 5.0)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.anchor_of(device(1)), Some(GeoPoint::new(5.0, 5.0)));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut index = ClusterIndex::new();
        index.remove(device(42));
        assert!(index.is_empty());
    }

    #[test]
    fn test_spread_fans_members_around_center() {
        let mut index = ClusterIndex::new();
        index.add(device(1), &At(GeoPoint::new(10.0, 10.0)));
        index.add(device(2), &At(GeoPoint::new(10.1, 10.1)));
        index.add(device(3), &At(GeoPoint::new(10.2, 10.2)));

        let clusters = index.clusters(1.0);
        let fanned = index.spread(&clusters[0], 1.0);
        assert_eq!(fanned.len(), 3);

        // All positions distinct and off-center
        for (i, (_, a)) in fanned.iter().enumerate() {
            assert_ne!(*a, clusters[0].center);
            for (_, b) in &fanned[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_spread_of_singleton_is_empty() {
        let mut index = ClusterIndex::new();
        index.add(device(1), &At(GeoPoint::new(0.0, 0.0)));
        let clusters = index.clusters(1.0);
        assert!(index.spread(&clusters[0], 1.0).is_empty());
    }
}
