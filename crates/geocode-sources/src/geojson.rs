//! GeoJSON source adapter.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use geocode_core::error::{GeocodeError, Result};
use geocode_core::models::{RawRecord, CANONICAL_EPSG};

use crate::{id_from_path, GeometrySource, RecordStream, SourceKind};

/// Reads a GeoJSON document (FeatureCollection, single Feature, or bare
/// Geometry) into raw records.
pub struct GeoJsonSource {
    id: String,
    path: PathBuf,
}

impl GeoJsonSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self { id: id_from_path(&path), path }
    }
}

#[async_trait]
impl GeometrySource for GeoJsonSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::GeoJson
    }

    async fn open(&self) -> Result<RecordStream> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            GeocodeError::SourceUnavailable {
                locator: self.path.display().to_string(),
                reason: e.to_string(),
            }
        })?;

        let geojson: geojson::GeoJson =
            content.parse().map_err(|e| GeocodeError::SourceUnavailable {
                locator: self.path.display().to_string(),
                reason: format!("Failed to parse GeoJSON: {}", e),
            })?;

        let source_id = self.id.clone();
        let records: Vec<Result<RawRecord>> = match geojson {
            geojson::GeoJson::FeatureCollection(fc) => {
                let crs = fc
                    .foreign_members
                    .as_ref()
                    .and_then(|fm| fm.get("crs"))
                    .and_then(extract_epsg_from_crs)
                    .unwrap_or(CANONICAL_EPSG);

                fc.features
                    .iter()
                    .enumerate()
                    .map(|(idx, feature)| convert_feature(&source_id, feature, idx, crs))
                    .collect()
            }
            geojson::GeoJson::Feature(feature) => {
                vec![convert_feature(&source_id, &feature, 0, CANONICAL_EPSG)]
            }
            geojson::GeoJson::Geometry(geom) => {
                let geometry = serde_json::to_value(&geom).map_err(|e| {
                    GeocodeError::Serialization(format!("Failed to serialize geometry: {}", e))
                })?;
                vec![Ok(RawRecord {
                    key: "0".to_string(),
                    geometry,
                    attributes: HashMap::new(),
                    crs: CANONICAL_EPSG,
                })]
            }
        };

        Ok(Box::pin(futures::stream::iter(records)))
    }
}

/// Convert a GeoJSON feature to a raw record; features without geometry
/// are malformed for this engine.
fn convert_feature(
    source_id: &str,
    feature: &geojson::Feature,
    idx: usize,
    crs: u32,
) -> Result<RawRecord> {
    let key = feature
        .id
        .as_ref()
        .map(|id| match id {
            geojson::feature::Id::String(s) => s.clone(),
            geojson::feature::Id::Number(n) => n.to_string(),
        })
        .unwrap_or_else(|| idx.to_string());

    let geometry = match &feature.geometry {
        Some(geom) => serde_json::to_value(geom)
            .map_err(|e| GeocodeError::Serialization(format!("{}", e)))?,
        None => {
            return Err(GeocodeError::MalformedRecord {
                source: source_id.to_string(),
                key,
                reason: "Feature has no geometry".to_string(),
            })
        }
    };

    let attributes = feature
        .properties
        .as_ref()
        .map(|props| props.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    Ok(RawRecord { key, geometry, attributes, crs })
}

/// Extract EPSG code from a GeoJSON CRS foreign member
fn extract_epsg_from_crs(crs: &serde_json::Value) -> Option<u32> {
    // "EPSG:4326" or "urn:ogc:def:crs:EPSG::4326"
    crs.get("properties")
        .and_then(|props| props.get("name"))
        .and_then(|name| name.as_str())
        .and_then(|name| name.rsplit(':').next())
        .and_then(|code| code.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use std::fs;

    #[tokio::test]
    async fn test_feature_collection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("avenues.geojson");
        fs::write(
            &path,
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "id": "ave-1",
                        "geometry": {"type": "Point", "coordinates": [-74.0, 40.70]},
                        "properties": {"name": "Central Avenue"}
                    }
                ]
            }"#,
        )
        .unwrap();

        let source = GeoJsonSource::new(&path);
        assert_eq!(source.id(), "avenues");

        let records: Vec<RawRecord> =
            source.open().await.unwrap().try_collect().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "ave-1");
        assert_eq!(records[0].crs, 4326);
        assert_eq!(records[0].attributes["name"], serde_json::json!("Central Avenue"));
    }

    #[tokio::test]
    async fn test_feature_without_geometry_is_malformed_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixed.geojson");
        fs::write(
            &path,
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {"type": "Feature", "geometry": null, "properties": {"name": "ghost"}},
                    {
                        "type": "Feature",
                        "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                        "properties": {}
                    }
                ]
            }"#,
        )
        .unwrap();

        let source = GeoJsonSource::new(&path);
        let items: Vec<Result<RawRecord>> =
            futures::StreamExt::collect(source.open().await.unwrap()).await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Err(GeocodeError::MalformedRecord { .. })));
        assert!(items[1].is_ok());
    }

    #[tokio::test]
    async fn test_missing_file_is_source_unavailable() {
        let source = GeoJsonSource::new("/nonexistent/file.geojson");
        let err = source.open().await.unwrap_err();
        assert!(matches!(err, GeocodeError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_invalid_json_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.geojson");
        fs::write(&path, "not valid json").unwrap();

        let source = GeoJsonSource::new(&path);
        let err = source.open().await.unwrap_err();
        assert!(matches!(err, GeocodeError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_extract_epsg_from_crs() {
        let crs = serde_json::json!({
            "type": "name",
            "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}
        });
        assert_eq!(extract_epsg_from_crs(&crs), Some(3857));

        let crs = serde_json::json!({"properties": {"name": "EPSG:4326"}});
        assert_eq!(extract_epsg_from_crs(&crs), Some(4326));
    }
}
