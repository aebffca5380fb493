//! Shapefile source adapter.
//!
//! Shapefiles consist of multiple component files (.shp, .shx, .dbf, .prj)
//! that must all be present for proper reading. Reading is blocking, so the
//! record iterator runs on a blocking task feeding a bounded channel.

use async_trait::async_trait;
use shapefile::dbase::FieldValue as DbaseFieldValue;
use shapefile::{Reader as ShpReader, Shape};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use geocode_core::error::{GeocodeError, Result};
use geocode_core::models::{RawRecord, CANONICAL_EPSG};

use crate::{id_from_path, GeometrySource, RecordStream, SourceKind};

const CHANNEL_CAPACITY: usize = 256;

/// Reads an ESRI Shapefile into raw records.
pub struct ShapefileSource {
    id: String,
    path: PathBuf,
}

impl ShapefileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self { id: id_from_path(&path), path }
    }

    /// Verify that all required component files exist
    fn verify_components(&self) -> Result<()> {
        let base = self.path.with_extension("");
        let missing: Vec<String> = ["shp", "shx", "dbf"]
            .iter()
            .filter(|ext| !base.with_extension(ext).exists())
            .map(|ext| format!(".{}", ext))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(GeocodeError::SourceUnavailable {
                locator: self.path.display().to_string(),
                reason: format!("Missing required component files: {}", missing.join(", ")),
            })
        }
    }

    /// Extract the EPSG code from the .prj file, defaulting to WGS 84
    fn extract_crs(&self) -> u32 {
        let prj_path = self.path.with_extension("prj");
        let Ok(prj_content) = fs::read_to_string(&prj_path) else {
            return CANONICAL_EPSG;
        };

        if let Some(epsg) = parse_epsg_from_wkt(&prj_content) {
            return epsg;
        }

        // Parseable WKT without an inline EPSG code still defaults.
        let _ = wkt::Wkt::<f64>::from_str(&prj_content);
        CANONICAL_EPSG
    }
}

#[async_trait]
impl GeometrySource for ShapefileSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Shapefile
    }

    async fn open(&self) -> Result<RecordStream> {
        self.verify_components()?;
        let crs = self.extract_crs();

        let reader =
            ShpReader::from_path(&self.path).map_err(|e| GeocodeError::SourceUnavailable {
                locator: self.path.display().to_string(),
                reason: format!("Failed to open shapefile: {}", e),
            })?;

        let source_id = self.id.clone();
        let (tx, rx) = tokio::sync::mpsc::channel::<Result<RawRecord>>(CHANNEL_CAPACITY);

        tokio::task::spawn_blocking(move || {
            let mut reader = reader;
            for (idx, item) in reader.iter_shapes_and_records().enumerate() {
                let key = idx.to_string();
                let record = item
                    .map_err(|e| GeocodeError::MalformedRecord {
                        source: source_id.clone(),
                        key: key.clone(),
                        reason: format!("Failed to read feature: {}", e),
                    })
                    .and_then(|(shape, dbf)| {
                        let geometry = shape_to_geojson(&shape).map_err(|reason| {
                            GeocodeError::MalformedRecord {
                                source: source_id.clone(),
                                key: key.clone(),
                                reason,
                            }
                        })?;
                        Ok(RawRecord {
                            key: key.clone(),
                            geometry,
                            attributes: dbase_attributes(&dbf),
                            crs,
                        })
                    });

                // Receiver dropped means the consumer stopped reading.
                if tx.blocking_send(record).is_err() {
                    break;
                }
            }
        });

        let stream = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(Box::pin(stream))
    }
}

/// Parse EPSG code from WKT text: AUTHORITY["EPSG","4326"] or EPSG:4326
fn parse_epsg_from_wkt(wkt: &str) -> Option<u32> {
    if let Some(start) = wkt.find("AUTHORITY[\"EPSG\",\"") {
        let code_start = start + 18;
        if let Some(end) = wkt[code_start..].find('"') {
            if let Ok(code) = wkt[code_start..code_start + end].parse::<u32>() {
                return Some(code);
            }
        }
    }

    if let Some(start) = wkt.find("EPSG:") {
        let code: String =
            wkt[start + 5..].chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(code) = code.parse::<u32>() {
            return Some(code);
        }
    }

    None
}

/// Convert a shapefile shape to a GeoJSON geometry value.
///
/// Errors carry the reason only; the caller wraps them with source/key.
fn shape_to_geojson(shape: &Shape) -> std::result::Result<serde_json::Value, String> {
    fn polyline_json(parts: Vec<Vec<[f64; 2]>>) -> serde_json::Value {
        if parts.len() == 1 {
            serde_json::json!({"type": "LineString", "coordinates": parts[0]})
        } else {
            serde_json::json!({"type": "MultiLineString", "coordinates": parts})
        }
    }

    match shape {
        Shape::Point(p) => Ok(serde_json::json!({"type": "Point", "coordinates": [p.x, p.y]})),
        Shape::PointZ(p) => Ok(serde_json::json!({"type": "Point", "coordinates": [p.x, p.y]})),
        Shape::PointM(p) => Ok(serde_json::json!({"type": "Point", "coordinates": [p.x, p.y]})),
        Shape::Polyline(polyline) => Ok(polyline_json(
            polyline.parts().iter().map(|part| part.iter().map(|p| [p.x, p.y]).collect()).collect(),
        )),
        Shape::PolylineZ(polyline) => Ok(polyline_json(
            polyline.parts().iter().map(|part| part.iter().map(|p| [p.x, p.y]).collect()).collect(),
        )),
        Shape::PolylineM(polyline) => Ok(polyline_json(
            polyline.parts().iter().map(|part| part.iter().map(|p| [p.x, p.y]).collect()).collect(),
        )),
        Shape::Polygon(polygon) => {
            let rings: Vec<Vec<[f64; 2]>> = polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| [p.x, p.y]).collect())
                .collect();
            Ok(serde_json::json!({"type": "Polygon", "coordinates": rings}))
        }
        Shape::PolygonZ(polygon) => {
            let rings: Vec<Vec<[f64; 2]>> = polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| [p.x, p.y]).collect())
                .collect();
            Ok(serde_json::json!({"type": "Polygon", "coordinates": rings}))
        }
        Shape::PolygonM(polygon) => {
            let rings: Vec<Vec<[f64; 2]>> = polygon
                .rings()
                .iter()
                .map(|ring| ring.points().iter().map(|p| [p.x, p.y]).collect())
                .collect();
            Ok(serde_json::json!({"type": "Polygon", "coordinates": rings}))
        }
        Shape::Multipoint(mp) => {
            let coords: Vec<[f64; 2]> = mp.points().iter().map(|p| [p.x, p.y]).collect();
            Ok(serde_json::json!({"type": "MultiPoint", "coordinates": coords}))
        }
        Shape::MultipointZ(mp) => {
            let coords: Vec<[f64; 2]> = mp.points().iter().map(|p| [p.x, p.y]).collect();
            Ok(serde_json::json!({"type": "MultiPoint", "coordinates": coords}))
        }
        Shape::MultipointM(mp) => {
            let coords: Vec<[f64; 2]> = mp.points().iter().map(|p| [p.x, p.y]).collect();
            Ok(serde_json::json!({"type": "MultiPoint", "coordinates": coords}))
        }
        Shape::Multipatch(_) => Err("Multipatch geometry type is not supported".to_string()),
        Shape::NullShape => Err("Null shape has no geometry".to_string()),
    }
}

/// Extract attributes from a DBF record
fn dbase_attributes(record: &shapefile::dbase::Record) -> HashMap<String, serde_json::Value> {
    let mut attributes = HashMap::new();
    for (name, value) in record.clone() {
        attributes.insert(name, dbase_value_to_json(&value));
    }
    attributes
}

fn dbase_value_to_json(value: &DbaseFieldValue) -> serde_json::Value {
    fn num(n: f64) -> serde_json::Value {
        serde_json::Number::from_f64(n).map(serde_json::Value::Number).unwrap_or(serde_json::Value::Null)
    }

    match value {
        DbaseFieldValue::Character(Some(s)) => serde_json::Value::String(s.clone()),
        DbaseFieldValue::Character(None) => serde_json::Value::Null,
        DbaseFieldValue::Numeric(Some(n)) => num(*n),
        DbaseFieldValue::Numeric(None) => serde_json::Value::Null,
        DbaseFieldValue::Logical(Some(b)) => serde_json::Value::Bool(*b),
        DbaseFieldValue::Logical(None) => serde_json::Value::Null,
        DbaseFieldValue::Date(Some(date)) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            date.year(),
            date.month(),
            date.day()
        )),
        DbaseFieldValue::Date(None) => serde_json::Value::Null,
        DbaseFieldValue::Float(Some(f)) => num(*f as f64),
        DbaseFieldValue::Float(None) => serde_json::Value::Null,
        DbaseFieldValue::Integer(i) => serde_json::Value::Number((*i).into()),
        DbaseFieldValue::Currency(c) => num(*c),
        DbaseFieldValue::DateTime(dt) => serde_json::Value::String(format!(
            "{:04}-{:02}-{:02}",
            dt.date().year(),
            dt.date().month(),
            dt.date().day()
        )),
        DbaseFieldValue::Double(d) => num(*d),
        DbaseFieldValue::Memo(s) => serde_json::Value::String(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_components_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let shp = dir.path().join("parks.shp");
        std::fs::write(&shp, b"").unwrap();
        // .shx and .dbf missing

        let source = ShapefileSource::new(&shp);
        let err = source.open().await.unwrap_err();
        match err {
            GeocodeError::SourceUnavailable { reason, .. } => {
                assert!(reason.contains(".shx"));
                assert!(reason.contains(".dbf"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nonexistent_path_is_source_unavailable() {
        let source = ShapefileSource::new("/nonexistent/parks.shp");
        assert!(matches!(
            source.open().await.unwrap_err(),
            GeocodeError::SourceUnavailable { .. }
        ));
    }

    #[test]
    fn test_parse_epsg_from_wkt() {
        let wkt = r#"GEOGCS["WGS 84",AUTHORITY["EPSG","4326"]]"#;
        assert_eq!(parse_epsg_from_wkt(wkt), Some(4326));

        assert_eq!(parse_epsg_from_wkt("EPSG:3857"), Some(3857));
        assert_eq!(parse_epsg_from_wkt("PROJCS[\"unnamed\"]"), None);
    }

    #[test]
    fn test_missing_prj_defaults_to_wgs84() {
        let dir = tempfile::tempdir().unwrap();
        let source = ShapefileSource::new(dir.path().join("bare.shp"));
        assert_eq!(source.extract_crs(), 4326);
    }

    #[test]
    fn test_dbase_value_conversion() {
        let v = dbase_value_to_json(&DbaseFieldValue::Character(Some("Central Park".into())));
        assert_eq!(v, serde_json::json!("Central Park"));

        let v = dbase_value_to_json(&DbaseFieldValue::Numeric(Some(12.5)));
        assert_eq!(v, serde_json::json!(12.5));

        let v = dbase_value_to_json(&DbaseFieldValue::Character(None));
        assert!(v.is_null());
    }
}
