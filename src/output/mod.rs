//! Output adapter: serializes the computed artifacts into the interchange
//! layout consumed by visualization and reporting. Pure format transforms.

use geo::{MultiPolygon, Polygon};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, GeometryValue};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::Error;
use crate::algo::{Isochrone, ScoreSet};
use crate::model::Network;

/// Structural summary of a built network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSummary {
    pub node_count: usize,
    /// Undirected segments; twin arcs counted once
    pub edge_count: u64,
    pub component_count: usize,
}

pub fn network_summary(network: &Network) -> NetworkSummary {
    NetworkSummary {
        node_count: network.node_count(),
        edge_count: network.edge_count(),
        component_count: network.component_count(),
    }
}

/// Converts isochrones to a GeoJSON `FeatureCollection`, one feature per
/// isochrone with its identifying properties.
pub fn isochrones_to_geojson(isochrones: &[Isochrone]) -> FeatureCollection {
    let features = isochrones
        .iter()
        .map(|isochrone| {
            let properties = json!({
                "origin_id": isochrone.origin_id,
                "category": isochrone.category,
                "budget": isochrone.budget,
                "unreachable": isochrone.unreachable,
            });
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(GeometryValue::from(&isochrone.polygon))),
                id: None,
                properties: properties.as_object().cloned(),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        features,
        bbox: None,
        foreign_members: None,
    }
}

pub fn isochrones_to_geojson_string(isochrones: &[Isochrone]) -> Result<String, Error> {
    serde_json::to_string(&isochrones_to_geojson(isochrones))
        .map_err(|e| Error::GeoJsonError(e.to_string()))
}

/// Reloads isochrones serialized by [`isochrones_to_geojson_string`].
///
/// Reconstructs the polygon and identifying properties; the per-node and
/// per-segment reachable sets are computation-pass data and are not part
/// of the interchange layout.
pub fn isochrones_from_geojson_str(input: &str) -> Result<Vec<Isochrone>, Error> {
    let geojson: GeoJson = input
        .parse()
        .map_err(|e: geojson::Error| Error::GeoJsonError(e.to_string()))?;
    let collection = FeatureCollection::try_from(geojson)
        .map_err(|e| Error::GeoJsonError(format!("expected a FeatureCollection: {e}")))?;

    collection
        .features
        .into_iter()
        .map(isochrone_from_feature)
        .collect()
}

fn isochrone_from_feature(feature: Feature) -> Result<Isochrone, Error> {
    let geometry = feature
        .geometry
        .ok_or_else(|| Error::GeoJsonError("isochrone feature without geometry".to_string()))?;
    let polygon = match geometry.value {
        value @ GeometryValue::MultiPolygon { .. } => MultiPolygon::<f64>::try_from(value)
            .map_err(|e| Error::GeoJsonError(e.to_string()))?,
        value @ GeometryValue::Polygon { .. } => Polygon::<f64>::try_from(value)
            .map(|p| MultiPolygon(vec![p]))
            .map_err(|e| Error::GeoJsonError(e.to_string()))?,
        _ => {
            return Err(Error::GeoJsonError(
                "isochrone feature with non-polygon geometry".to_string(),
            ));
        }
    };

    let properties = feature
        .properties
        .ok_or_else(|| Error::GeoJsonError("isochrone feature without properties".to_string()))?;
    let get_str = |key: &str| {
        properties
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| Error::GeoJsonError(format!("missing `{key}` property")))
    };

    Ok(Isochrone {
        origin_id: get_str("origin_id")?,
        category: get_str("category")?,
        budget: properties
            .get("budget")
            .and_then(serde_json::Value::as_f64)
            .ok_or_else(|| Error::GeoJsonError("missing `budget` property".to_string()))?,
        polygon,
        reachable_nodes: Vec::new(),
        reachable_segments: Vec::new(),
        unreachable: properties
            .get("unreachable")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false),
    })
}

/// Per-(area, category) score table as CSV.
pub fn scores_to_csv(set: &ScoreSet) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(vec![]);
    for score in &set.scores {
        writer.serialize(score)?;
    }
    finish_csv(writer)
}

/// Combined-index table as CSV.
pub fn indices_to_csv(set: &ScoreSet) -> Result<String, Error> {
    let mut writer = csv::Writer::from_writer(vec![]);
    for index in &set.indices {
        writer.serialize(index)?;
    }
    finish_csv(writer)
}

/// The full score set as JSON, for consumers that want one document.
pub fn scores_to_json(set: &ScoreSet) -> Result<String, Error> {
    serde_json::to_string(set).map_err(|e| Error::InvalidData(e.to_string()))
}

fn finish_csv(writer: csv::Writer<Vec<u8>>) -> Result<String, Error> {
    let bytes = writer
        .into_inner()
        .map_err(|e| Error::InvalidData(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| Error::InvalidData(e.to_string()))
}
