//! Bulk-loaded R-tree over feature bounding boxes.

use rstar::{Envelope, PointDistance, RTree, RTreeObject, AABB};

use geocode_core::geom::haversine_m;
use geocode_core::models::{BoundingBox, FeatureId, FeatureRecord};

/// One indexed entry: a feature id and its envelope
#[derive(Debug, Clone, PartialEq)]
struct IndexedBox {
    id: FeatureId,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl PointDistance for IndexedBox {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope.distance_2(point)
    }
}

/// Immutable spatial index over feature bounding boxes.
///
/// Built once per snapshot with `rstar`'s bulk loader (sort-and-pack,
/// O(n log n)); refresh means building a new index, never mutating this
/// one. Queries answer in bounding-box terms; exact geometry intersection
/// is the caller's responsibility.
pub struct SpatialIndex {
    tree: RTree<IndexedBox>,
}

impl SpatialIndex {
    /// Bulk-load the index from normalized records
    pub fn build(records: &[FeatureRecord]) -> Self {
        let entries: Vec<IndexedBox> = records
            .iter()
            .map(|record| IndexedBox {
                id: record.id,
                envelope: AABB::from_corners(
                    [record.bbox.min_x, record.bbox.min_y],
                    [record.bbox.max_x, record.bbox.max_y],
                ),
            })
            .collect();
        Self { tree: RTree::bulk_load(entries) }
    }

    /// Ids of every record whose bounding box intersects `bbox`,
    /// ascending. No false negatives; box-level false positives are the
    /// caller's to filter.
    pub fn range_query(&self, bbox: &BoundingBox) -> Vec<FeatureId> {
        let envelope = AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y]);
        let mut ids: Vec<FeatureId> =
            self.tree.locate_in_envelope_intersecting(&envelope).map(|e| e.id).collect();
        ids.sort_unstable();
        ids
    }

    /// The k entries nearest to `(lon, lat)`, as `(id, meters)` ascending
    /// by distance, ties broken by ascending id.
    ///
    /// Candidate selection runs the tree's branch-and-bound traversal in
    /// degree space, oversampled, and the survivors are re-measured with
    /// haversine meters to the nearest point of each box.
    pub fn nearest(&self, lon: f64, lat: f64, k: usize) -> Vec<(FeatureId, f64)> {
        if k == 0 {
            return Vec::new();
        }
        let oversample = (k * 4).max(64);

        let mut candidates: Vec<(FeatureId, f64)> = self
            .tree
            .nearest_neighbor_iter(&[lon, lat])
            .take(oversample)
            .map(|entry| {
                let lower = entry.envelope.lower();
                let upper = entry.envelope.upper();
                let nearest =
                    [lon.clamp(lower[0], upper[0]), lat.clamp(lower[1], upper[1])];
                (entry.id, haversine_m([lon, lat], nearest))
            })
            .collect();

        candidates
            .sort_unstable_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        candidates.truncate(k);
        candidates
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
