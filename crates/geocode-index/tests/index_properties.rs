//! Property tests for the spatial and text indexes.

use std::collections::BTreeMap;

use geocode_core::models::{
    AttrValue, BoundingBox, FeatureId, FeatureRecord, Geometry, SourceRef,
};
use geocode_index::{SpatialIndex, TextIndex};
use proptest::prelude::*;

fn point_record(id: u64, lon: f64, lat: f64) -> FeatureRecord {
    let geometry = Geometry::point(lon, lat);
    FeatureRecord {
        id: FeatureId(id),
        bbox: BoundingBox::from_geometry(&geometry).unwrap(),
        geometry,
        attributes: BTreeMap::from([(
            "name".to_string(),
            AttrValue::Text(format!("feature {}", id)),
        )]),
        source_ref: SourceRef { source_id: "prop".to_string(), key: id.to_string() },
    }
}

fn records_strategy() -> impl Strategy<Value = Vec<FeatureRecord>> {
    prop::collection::vec((-179.0f64..179.0, -89.0f64..89.0), 1..60).prop_map(|coords| {
        coords
            .into_iter()
            .enumerate()
            .map(|(i, (lon, lat))| point_record(i as u64, lon, lat))
            .collect()
    })
}

proptest! {
    #[test]
    fn range_query_has_no_false_negatives(
        records in records_strategy(),
        query in (-179.0f64..179.0, -89.0f64..89.0, 0.1f64..40.0, 0.1f64..40.0),
    ) {
        let (min_x, min_y, w, h) = query;
        let bbox = BoundingBox::new(min_x, min_y, min_x + w, min_y + h);

        let index = SpatialIndex::build(&records);
        let hits = index.range_query(&bbox);

        // Brute-force reference: every intersecting record must be a hit
        for record in &records {
            if record.bbox.intersects(&bbox) {
                prop_assert!(hits.contains(&record.id), "missing {}", record.id);
            } else {
                prop_assert!(!hits.contains(&record.id), "false positive {}", record.id);
            }
        }
    }

    #[test]
    fn nearest_is_sorted_and_bounded(
        records in records_strategy(),
        probe in (-179.0f64..179.0, -89.0f64..89.0),
        k in 1usize..20,
    ) {
        let index = SpatialIndex::build(&records);
        let results = index.nearest(probe.0, probe.1, k);

        prop_assert!(results.len() <= k);
        prop_assert_eq!(results.len(), k.min(records.len()));
        for pair in results.windows(2) {
            prop_assert!(pair[0].1 <= pair[1].1, "distances must be non-decreasing");
            if pair[0].1 == pair[1].1 {
                prop_assert!(pair[0].0 < pair[1].0, "ties must break by ascending id");
            }
        }
    }

    #[test]
    fn text_search_scores_stay_in_unit_interval(
        records in records_strategy(),
        needle in "[a-z]{2,8}",
    ) {
        let index = TextIndex::build(&records, None);
        for (_, score) in index.search(&needle, 2) {
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn text_search_is_deterministic(records in records_strategy()) {
        let index = TextIndex::build(&records, None);
        let first = index.search("feature", 2);
        let second = index.search("feature", 2);
        prop_assert_eq!(first, second);
    }
}
