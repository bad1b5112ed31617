//! File input and output for calibration data.

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{CalibrationPoint, ProjectCoordinateSettings};

/// Reads a file to string.
pub fn read_to_string(path: &str) -> std::io::Result<String> {
    std::fs::read_to_string(path)
}

/// Writes a string to a file, replacing it.
pub fn write_string(path: &str, contents: &str) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

/// Settings and points of one project, as exchanged between installations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationBundle {
    pub settings: ProjectCoordinateSettings,
    pub points: Vec<CalibrationPoint>,
}

pub fn read_bundle_json(path: &str) -> Result<CalibrationBundle, StoreError> {
    let contents = read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn write_bundle_json(path: &str, bundle: &CalibrationBundle) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(bundle)?;
    write_string(path, &json)?;
    Ok(())
}

fn point_feature(p: &CalibrationPoint) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("label".into(), serde_json::json!(p.label));
    properties.insert("element_id".into(), serde_json::json!(p.element_id));
    properties.insert("model_x".into(), serde_json::json!(p.model_x));
    properties.insert("model_y".into(), serde_json::json!(p.model_y));
    properties.insert("method".into(), serde_json::json!(p.method.as_str()));
    properties.insert("active".into(), serde_json::json!(p.active));
    properties.insert("error".into(), serde_json::json!(p.error));
    properties.insert("accuracy".into(), serde_json::json!(p.accuracy));
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![p.lon, p.lat]))),
        id: Some(geojson::feature::Id::String(p.id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Converts calibration points to a GeoJSON feature collection (lon/lat).
pub fn points_to_geojson(points: &[CalibrationPoint]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: points.iter().map(point_feature).collect(),
        foreign_members: None,
    }
}

/// Writes calibration points as a GeoJSON file.
pub fn write_points_geojson(path: &str, points: &[CalibrationPoint]) -> std::io::Result<()> {
    let gj = GeoJson::from(points_to_geojson(points));
    write_string(path, &gj.to_string())
}
