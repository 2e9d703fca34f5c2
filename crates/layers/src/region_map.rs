//! Builds an extruded region layer (one mesh per ring) from a feature
//! collection.

use formats::{FeatureCollection, LayerOptions, LineOptions, Position, Ring};
use foundation::Color;
use foundation::math::{Mercator, Vec2};
use scene::components::{LineMaterial, LineSegments, Mesh, RegionData, StandardMaterial};
use scene::{EntityId, Object, World};
use tracing::{debug, info, warn};

use crate::edges::{DEFAULT_THRESHOLD_DEG, edges};
use crate::extrude::extrude_ring;

const CAP_ROUGHNESS: f32 = 0.3;
const SIDE_ROUGHNESS: f32 = 0.5;

/// A position that could not be read as `[lon, lat]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidCoordinate {
    pub geometry_type: &'static str,
    pub coordinate: String,
    pub region_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegionMapReport {
    pub group: EntityId,
    pub features: usize,
    pub meshes: usize,
    pub outlines: usize,
    /// Features without an area geometry.
    pub skipped_features: usize,
    /// Rings that had enough points but failed to extrude.
    pub failed_shapes: usize,
    pub invalid_coordinates: Vec<InvalidCoordinate>,
}

pub struct RegionMapBuilder<'a> {
    projection: Mercator,
    options: &'a LayerOptions,
    name: String,
}

impl<'a> RegionMapBuilder<'a> {
    pub fn new(projection: Mercator, options: &'a LayerOptions) -> Self {
        Self {
            projection,
            options,
            name: "map".to_string(),
        }
    }

    /// Name given to the layer's group node.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn build(&self, world: &mut World, collection: &FeatureCollection) -> RegionMapReport {
        let group = world.add_group(&self.name);
        let mut report = RegionMapReport {
            group,
            features: collection.len(),
            meshes: 0,
            outlines: 0,
            skipped_features: 0,
            failed_shapes: 0,
            invalid_coordinates: Vec::new(),
        };

        let mut palette = self.options.colors();
        if palette.is_empty() {
            palette.push(Color::WHITE);
        }
        let outline_material = line_material(&self.options.line_opts);

        for (i, feature) in collection.features.iter().enumerate() {
            let region_name = feature.name().unwrap_or_default();
            let color = palette[i % palette.len()];
            let Some(geometry) = &feature.geometry else {
                debug!(region = region_name, "feature has no geometry");
                report.skipped_features += 1;
                continue;
            };
            let Some(polygons) = geometry.polygons() else {
                debug!(
                    region = region_name,
                    geometry_type = geometry.type_name(),
                    "skipping non-area geometry"
                );
                report.skipped_features += 1;
                continue;
            };

            for ring in polygons.into_iter().flatten() {
                let points = self.project_ring(
                    ring,
                    geometry.type_name(),
                    region_name,
                    &mut report.invalid_coordinates,
                );
                if points.len() <= 2 {
                    continue;
                }
                let solid = match extrude_ring(&points, &self.options.extrude_opts) {
                    Ok(solid) => solid,
                    Err(err) => {
                        warn!(region = region_name, error = %err, "failed to create shape");
                        report.failed_shapes += 1;
                        continue;
                    }
                };
                let outline = self.options.draw_outline.then(|| edges(&solid, DEFAULT_THRESHOLD_DEG));

                let geometry_id = world.add_geometry(solid);
                let mesh = Mesh::new(
                    geometry_id,
                    vec![
                        StandardMaterial::new(color, 0.0, CAP_ROUGHNESS),
                        StandardMaterial::new(color, 0.0, SIDE_ROUGHNESS),
                    ],
                )
                .with_region(RegionData {
                    original_color: color,
                    region_name: region_name.to_string(),
                });
                let mesh_entity = world.add_child(group, Object::Mesh(mesh));
                report.meshes += 1;

                if let Some(geometry) = outline {
                    world.add_child(
                        mesh_entity,
                        Object::LineSegments(LineSegments {
                            geometry,
                            material: outline_material,
                        }),
                    );
                    report.outlines += 1;
                }
            }
        }

        if !report.invalid_coordinates.is_empty() {
            let listed: Vec<String> = report
                .invalid_coordinates
                .iter()
                .map(|c| format!("{} {} in {:?}", c.geometry_type, c.coordinate, c.region_name))
                .collect();
            warn!(
                layer = %self.name,
                count = listed.len(),
                "invalid coordinates: {}",
                listed.join("; ")
            );
        }
        info!(
            layer = %self.name,
            features = report.features,
            meshes = report.meshes,
            outlines = report.outlines,
            failed = report.failed_shapes,
            "built region layer"
        );
        report
    }

    /// Projects a ring into layer space (y flipped so north is +y).
    fn project_ring(
        &self,
        ring: &Ring,
        geometry_type: &'static str,
        region_name: &str,
        invalid: &mut Vec<InvalidCoordinate>,
    ) -> Vec<Vec2> {
        let mut points = Vec::with_capacity(ring.len());
        for position in ring {
            match position {
                Position::Valid(p) => {
                    if let Some(v) = self.projection.project(p.lon_deg, p.lat_deg) {
                        points.push(Vec2::new(v.x, -v.y));
                    }
                }
                Position::Invalid(raw) => invalid.push(InvalidCoordinate {
                    geometry_type,
                    coordinate: raw.clone(),
                    region_name: region_name.to_string(),
                }),
            }
        }
        points
    }
}

pub fn line_material(opts: &LineOptions) -> LineMaterial {
    LineMaterial {
        color: Color::from_hex(opts.color),
        linewidth: opts.linewidth as f32,
        transparent: opts.transparent,
        opacity: opts.opacity as f32,
    }
}
