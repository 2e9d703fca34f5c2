//! Flattens a [`World`] into per-frame draw lists for the GPU backend.

use foundation::math::{Mat4, Vec3, mat4_translation};
use scene::components::{GeometryId, Light, LineGeometry, StandardMaterial};
use scene::{EntityId, PerspectiveCamera, World};

use crate::settings::RendererSettings;

/// Directional lights beyond this are ignored by the lit pipeline.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MaterialParams {
    pub color: [f32; 3],
    pub opacity: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub blended: bool,
    pub wireframe: bool,
}

impl MaterialParams {
    pub fn from_material(m: &StandardMaterial) -> Self {
        Self {
            color: m.color.to_array(),
            opacity: m.effective_opacity(),
            metalness: m.metalness,
            roughness: m.roughness,
            blended: m.transparent,
            wireframe: m.wireframe,
        }
    }
}

/// Vertex range of one geometry drawn with one material.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawSection {
    pub start: u32,
    pub count: u32,
    pub material: MaterialParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshDraw {
    pub entity: EntityId,
    pub geometry: GeometryId,
    pub model: Mat4,
    pub sections: Vec<DrawSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineDraw<'w> {
    pub entity: EntityId,
    pub model: Mat4,
    pub geometry: &'w LineGeometry,
    pub color: [f32; 3],
    pub opacity: f32,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    /// Unit vector pointing from the surface towards the light.
    pub direction: [f32; 3],
    /// Colour premultiplied by intensity.
    pub color: [f32; 3],
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct HemisphereLight {
    pub up: [f32; 3],
    pub sky: [f32; 3],
    pub ground: [f32; 3],
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PackedLights {
    pub ambient: [f32; 3],
    pub hemisphere: Option<HemisphereLight>,
    pub directional: Vec<DirectionalLight>,
}

/// Draw lists for one frame, borrowing the world they were collected from.
#[derive(Debug, Clone)]
pub struct RenderFrame<'w> {
    pub world: &'w World,
    pub clear_color: [f64; 4],
    pub view: Mat4,
    pub projection: Mat4,
    pub view_proj: Mat4,
    pub camera_position: [f32; 3],
    pub exposure: f32,
    pub meshes: Vec<MeshDraw>,
    pub lines: Vec<LineDraw<'w>>,
    pub lights: PackedLights,
}

impl RenderFrame<'_> {
    pub fn section_count(&self) -> usize {
        self.meshes.iter().map(|m| m.sections.len()).sum()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    pub settings: RendererSettings,
}

impl Renderer {
    pub fn new(settings: RendererSettings) -> Self {
        Self { settings }
    }

    pub fn collect<'w>(&self, world: &'w World, camera: &PerspectiveCamera) -> RenderFrame<'w> {
        let bg = world
            .background
            .unwrap_or(self.settings.clear_color)
            .to_array();
        let mut frame = RenderFrame {
            world,
            clear_color: [f64::from(bg[0]), f64::from(bg[1]), f64::from(bg[2]), 1.0],
            view: camera.view_matrix(),
            projection: camera.projection_matrix(),
            view_proj: camera.view_projection(),
            camera_position: camera.position.to_f32(),
            exposure: self.settings.exposure,
            meshes: Vec::new(),
            lines: Vec::new(),
            lights: PackedLights::default(),
        };

        for (entity, position, mesh) in world.meshes() {
            let Some(geometry) = world.geometry(mesh.geometry) else {
                tracing::warn!(%entity, "mesh references a missing geometry");
                continue;
            };
            let sections = if geometry.groups.is_empty() {
                mesh.material(0)
                    .map(|m| DrawSection {
                        start: 0,
                        count: geometry.vertex_count(),
                        material: MaterialParams::from_material(m),
                    })
                    .into_iter()
                    .collect()
            } else {
                geometry
                    .groups
                    .iter()
                    .filter(|g| g.count > 0)
                    .filter_map(|g| {
                        mesh.material(g.material_index).map(|m| DrawSection {
                            start: g.start,
                            count: g.count,
                            material: MaterialParams::from_material(m),
                        })
                    })
                    .collect::<Vec<_>>()
            };
            if sections.is_empty() {
                continue;
            }
            frame.meshes.push(MeshDraw {
                entity,
                geometry: mesh.geometry,
                model: mat4_translation(position),
                sections,
            });
        }

        for (entity, position, segments) in world.line_segments() {
            if segments.geometry.segment_count() == 0 {
                continue;
            }
            frame.lines.push(LineDraw {
                entity,
                model: mat4_translation(position),
                geometry: &segments.geometry,
                color: segments.material.color.to_array(),
                opacity: segments.material.effective_opacity(),
            });
        }

        frame.lights = pack_lights(world);
        frame
    }
}

fn scaled(rgb: [f32; 3], k: f32) -> [f32; 3] {
    [rgb[0] * k, rgb[1] * k, rgb[2] * k]
}

fn pack_lights(world: &World) -> PackedLights {
    let mut out = PackedLights::default();
    for (entity, position, light) in world.lights() {
        match light {
            Light::Ambient { color, intensity } => {
                let c = scaled(color.to_array(), intensity);
                for (acc, v) in out.ambient.iter_mut().zip(c) {
                    *acc += v;
                }
            }
            Light::Directional {
                color, intensity, ..
            } => {
                if out.directional.len() == MAX_DIRECTIONAL_LIGHTS {
                    tracing::debug!(%entity, "directional light limit reached");
                    continue;
                }
                // Directional lights target the origin.
                let direction = position.normalize();
                if direction == Vec3::ZERO {
                    continue;
                }
                out.directional.push(DirectionalLight {
                    direction: direction.to_f32(),
                    color: scaled(color.to_array(), intensity),
                });
            }
            Light::Hemisphere {
                sky,
                ground,
                intensity,
            } => {
                let up = if position == Vec3::ZERO {
                    Vec3::Y
                } else {
                    position.normalize()
                };
                out.hemisphere = Some(HemisphereLight {
                    up: up.to_f32(),
                    sky: scaled(sky.to_array(), intensity),
                    ground: scaled(ground.to_array(), intensity),
                });
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{MAX_DIRECTIONAL_LIGHTS, Renderer};
    use crate::settings::RendererSettings;
    use foundation::Color;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use scene::components::{
        BufferGeometry, Light, LineGeometry, LineMaterial, LineSegments, Mesh, StandardMaterial,
    };
    use scene::prefabs::lighting::add_default_lights;
    use scene::{Object, PerspectiveCamera, World};

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "expected {a} ~= {b}");
    }

    fn two_group_geometry() -> BufferGeometry {
        let mut g = BufferGeometry::new();
        g.push_triangle(
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        );
        g.add_group(0, 3, 0);
        g.push_triangle(
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        );
        g.add_group(3, 3, 1);
        g
    }

    #[test]
    fn collects_meshes_with_one_section_per_group() {
        let mut world = World::with_background(Color::from_hex(0x102030));
        let group = world.add_group("map");
        world.set_position(group, Vec3::new(0.0, 0.0, 2.0));
        let geometry = world.add_geometry(two_group_geometry());
        let red = Color::from_hex(0xff0000);
        let mesh = world.add_child(
            group,
            Object::Mesh(Mesh::new(
                geometry,
                vec![
                    StandardMaterial::new(red, 0.0, 0.3),
                    StandardMaterial::new(red, 0.0, 0.5),
                ],
            )),
        );

        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let frame = Renderer::default().collect(&world, &camera);

        assert_eq!(frame.meshes.len(), 1);
        let draw = &frame.meshes[0];
        assert_eq!(draw.entity, mesh);
        assert_eq!(draw.sections.len(), 2);
        assert_eq!(draw.sections[1].start, 3);
        assert_eq!(draw.sections[1].material.roughness, 0.5);
        // Model matrix carries the parent's offset.
        assert_eq!(draw.model[3][2], 2.0);
        let bg = Color::from_hex(0x102030).to_array();
        assert_eq!(frame.clear_color[0], f64::from(bg[0]));
        assert_eq!(frame.exposure, 1.25);
    }

    #[test]
    fn clear_colour_falls_back_to_settings_without_background() {
        let world = World::new();
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let clear = Color::from_hex(0x336699);
        let renderer = Renderer::new(RendererSettings {
            clear_color: clear,
            ..RendererSettings::default()
        });
        let frame = renderer.collect(&world, &camera);
        let [r, g, b] = clear.to_array();
        assert_eq!(
            frame.clear_color,
            [f64::from(r), f64::from(g), f64::from(b), 1.0]
        );
    }

    #[test]
    fn hidden_subtrees_are_not_drawn() {
        let mut world = World::new();
        let group = world.add_group("hidden");
        let geometry = world.add_geometry(two_group_geometry());
        world.add_child(
            group,
            Object::Mesh(Mesh::new(geometry, vec![StandardMaterial::default()])),
        );
        let mut line = LineGeometry::default();
        line.push_segment(Vec3::ZERO, Vec3::Y);
        world.add_child(
            group,
            Object::LineSegments(LineSegments {
                geometry: line,
                material: LineMaterial::default(),
            }),
        );
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);

        let renderer = Renderer::default();
        let shown = renderer.collect(&world, &camera);
        assert_eq!((shown.meshes.len(), shown.lines.len()), (1, 1));
        // Single material is reused for both groups.
        assert_eq!(shown.section_count(), 2);

        world.set_visible(group, false);
        let hidden = renderer.collect(&world, &camera);
        assert!(hidden.meshes.is_empty());
        assert!(hidden.lines.is_empty());
    }

    #[test]
    fn default_lights_are_packed() {
        let mut world = World::new();
        add_default_lights(&mut world);
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let lights = Renderer::default().collect(&world, &camera).lights;

        assert_close(lights.ambient[0], 0.5);
        assert_eq!(lights.directional.len(), 2);
        let key = lights.directional[0];
        assert_close(key.color[1], 0.8);
        let len = (50.0f32 * 50.0 + 100.0 * 100.0 + 50.0 * 50.0).sqrt();
        assert_close(key.direction[1], -100.0 / len);
        let hemi = lights.hemisphere.expect("hemisphere");
        assert_close(hemi.up[1], -1.0);
    }

    #[test]
    fn directional_lights_are_capped() {
        let mut world = World::new();
        for i in 0..(MAX_DIRECTIONAL_LIGHTS + 2) {
            let id = world.add(
                Object::Light(Light::Directional {
                    color: Color::WHITE,
                    intensity: 1.0,
                    shadow: None,
                }),
                None,
            );
            world.set_position(id, Vec3::new(1.0 + i as f64, 1.0, 1.0));
        }
        let camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let frame = Renderer::default().collect(&world, &camera);
        assert_eq!(frame.lights.directional.len(), MAX_DIRECTIONAL_LIGHTS);
    }
}
