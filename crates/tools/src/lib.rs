//! Offline inspection of region map layers.

use std::fmt;

use formats::{FeatureCollection, GeoJsonError, LayerOptions, MapConfig};
use foundation::math::{Mercator, Vec2};
use layers::{InvalidCoordinate, RegionMapBuilder};
use scene::World;
use serde::Serialize;

#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum)]
pub enum LayerKind {
    Ground,
    Map,
}

impl LayerKind {
    pub fn options(self, config: &MapConfig) -> &LayerOptions {
        match self {
            Self::Ground => &config.ground_map,
            Self::Map => &config.map,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ground => "groundMap",
            Self::Map => "map",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
    /// `[lon, lat]` of the south-west and north-east corners.
    pub geographic: Option<[[f64; 2]; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidEntry {
    pub geometry_type: &'static str,
    pub coordinate: String,
    pub region_name: String,
}

impl From<&InvalidCoordinate> for InvalidEntry {
    fn from(c: &InvalidCoordinate) -> Self {
        Self {
            geometry_type: c.geometry_type,
            coordinate: c.coordinate.clone(),
            region_name: c.region_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerSummary {
    pub layer: &'static str,
    pub features: usize,
    pub meshes: usize,
    pub outlines: usize,
    pub skipped_features: usize,
    pub failed_shapes: usize,
    pub bounds: Option<Bounds>,
    pub invalid_coordinates: Vec<InvalidEntry>,
}

impl fmt::Display for LayerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "layer: {}", self.layer)?;
        writeln!(f, "features: {}", self.features)?;
        writeln!(f, "meshes: {}", self.meshes)?;
        writeln!(f, "outlines: {}", self.outlines)?;
        writeln!(f, "skipped features: {}", self.skipped_features)?;
        writeln!(f, "failed shapes: {}", self.failed_shapes)?;
        match &self.bounds {
            Some(b) => {
                writeln!(
                    f,
                    "bounds: [{:.3}, {:.3}, {:.3}] .. [{:.3}, {:.3}, {:.3}]",
                    b.min[0], b.min[1], b.min[2], b.max[0], b.max[1], b.max[2]
                )?;
                if let Some([sw, ne]) = b.geographic {
                    writeln!(
                        f,
                        "lon/lat: [{:.5}, {:.5}] .. [{:.5}, {:.5}]",
                        sw[0], sw[1], ne[0], ne[1]
                    )?;
                }
            }
            None => writeln!(f, "bounds: none")?,
        }
        writeln!(f, "invalid coordinates: {}", self.invalid_coordinates.len())?;
        for c in &self.invalid_coordinates {
            writeln!(
                f,
                "  {} {} in {:?}",
                c.geometry_type, c.coordinate, c.region_name
            )?;
        }
        Ok(())
    }
}

/// Builds one layer of `collection` into a fresh world and reports on it.
pub fn summarize(config: &MapConfig, kind: LayerKind, collection: &FeatureCollection) -> LayerSummary {
    let projection = config.projection.to_mercator();
    let mut world = World::new();
    let report = RegionMapBuilder::new(projection, kind.options(config))
        .named(kind.name())
        .build(&mut world, collection);

    let bounds = world.subtree_bounds(report.group).map(|bb| Bounds {
        min: [bb.min.x, bb.min.y, bb.min.z],
        max: [bb.max.x, bb.max.y, bb.max.z],
        geographic: geographic_bounds(&projection, bb.min.x, bb.min.y, bb.max.x, bb.max.y),
    });

    LayerSummary {
        layer: kind.name(),
        features: report.features,
        meshes: report.meshes,
        outlines: report.outlines,
        skipped_features: report.skipped_features,
        failed_shapes: report.failed_shapes,
        bounds,
        invalid_coordinates: report.invalid_coordinates.iter().map(InvalidEntry::from).collect(),
    }
}

pub fn summarize_str(
    config: &MapConfig,
    kind: LayerKind,
    payload: &str,
) -> Result<LayerSummary, GeoJsonError> {
    let collection = FeatureCollection::from_geojson_str(payload)?;
    Ok(summarize(config, kind, &collection))
}

// Scene y is the negated projected y.
fn geographic_bounds(
    projection: &Mercator,
    min_x: f64,
    min_y: f64,
    max_x: f64,
    max_y: f64,
) -> Option<[[f64; 2]; 2]> {
    let sw = projection.invert(Vec2::new(min_x, -min_y))?;
    let ne = projection.invert(Vec2::new(max_x, -max_y))?;
    Some([sw, ne])
}

#[cfg(test)]
mod tests {
    use super::{LayerKind, summarize_str};
    use formats::MapConfig;
    use pretty_assertions::assert_eq;

    const SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": { "name": "Yuexiu" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [113.2, 23.1], [113.3, 23.1], [113.3, 23.2], [113.2, 23.2], [113.2, 23.1]
                    ]]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "Marker" },
                "geometry": { "type": "Point", "coordinates": [113.25, 23.15] }
            }
        ]
    }"#;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn ground_layer_counts_and_geographic_bounds() {
        let config = MapConfig::default();
        let summary = summarize_str(&config, LayerKind::Ground, SQUARE).expect("summary");
        assert_eq!(summary.layer, "groundMap");
        assert_eq!(summary.features, 2);
        assert_eq!(summary.meshes, 1);
        assert_eq!(summary.outlines, 1);
        assert_eq!(summary.skipped_features, 1);
        assert!(summary.invalid_coordinates.is_empty());

        let bounds = summary.bounds.expect("bounds");
        assert_close(bounds.min[2], 0.0);
        assert_close(bounds.max[2], 0.1);
        let [sw, ne] = bounds.geographic.expect("geographic bounds");
        assert_close(sw[0], 113.2);
        assert_close(sw[1], 23.1);
        assert_close(ne[0], 113.3);
        assert_close(ne[1], 23.2);
    }

    #[test]
    fn bevelled_map_layer_grows_past_the_ring() {
        let config = MapConfig::default();
        let summary = summarize_str(&config, LayerKind::Map, SQUARE).expect("summary");
        assert_eq!(summary.layer, "map");
        assert_eq!(summary.outlines, 0);
        assert!(summary.to_string().contains("meshes: 1"));

        let [sw, ne] = summary
            .bounds
            .and_then(|b| b.geographic)
            .expect("geographic bounds");
        assert!(sw[0] < 113.2 && sw[0] > 113.1, "{sw:?}");
        assert!(ne[1] > 23.2 && ne[1] < 23.3, "{ne:?}");
    }

    #[test]
    fn rejects_non_geojson() {
        let config = MapConfig::default();
        assert!(summarize_str(&config, LayerKind::Map, "[1, 2]").is_err());
    }
}
