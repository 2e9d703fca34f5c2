//! Scene assembly shared by the wasm entry points and native tests.

use formats::{FeatureCollection, LayerOptions, MapConfig};
use foundation::Color;
use foundation::math::Mercator;
use gpu::{RenderFrame, Renderer, RendererSettings};
use inspector::{Panel, PanelOptions, PanelTargets};
use layers::{RegionMapBuilder, RegionMapReport};
use scene::prefabs::lighting::add_default_lights;
use scene::{EntityId, OrbitControls, PerspectiveCamera, World};
use tracing::{error, info};

pub const GROUND_LAYER: &str = "groundMap";
pub const MAP_LAYER: &str = "map";

pub struct MapScene {
    pub config: MapConfig,
    pub world: World,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub renderer: Renderer,
    pub panel: Panel,
    pub lights: Vec<EntityId>,
    pub ground: Option<RegionMapReport>,
    pub map: Option<RegionMapReport>,
    viewport: (f64, f64),
}

impl MapScene {
    /// Builds the full scene for a container of `container` CSS pixels.
    ///
    /// Missing or empty layer data is logged and that layer is left out.
    pub fn build(
        config: MapConfig,
        container: (f64, f64),
        ground: Option<&FeatureCollection>,
        map: Option<&FeatureCollection>,
    ) -> Self {
        let mut world = World::with_background(Color::from_hex(config.scene.background));

        let (width, height) = container;
        let mut camera = PerspectiveCamera::from_config(&config.camera, 1.0);
        camera.set_viewport(width, height);

        let mut controls = OrbitControls::from_config(&config.controls);
        controls.update(&mut camera);

        let lights = add_default_lights(&mut world);

        let projection = config.projection.to_mercator();
        let ground = build_layer(&mut world, projection, &config.ground_map, GROUND_LAYER, ground);
        let map = build_layer(&mut world, projection, &config.map, MAP_LAYER, map);

        let first_region = map
            .as_ref()
            .and_then(|r| world.children(r.group).first().copied());
        let panel = Panel::build(
            &PanelTargets {
                scene: true,
                camera: true,
                mesh: first_region,
                renderer: true,
                ..PanelTargets::default()
            },
            PanelOptions::default(),
        );

        info!(
            nodes = world.len(),
            ground = ground.as_ref().map_or(0, |r| r.meshes),
            map = map.as_ref().map_or(0, |r| r.meshes),
            "map scene ready"
        );

        Self {
            renderer: Renderer::new(RendererSettings::from_config(&config.renderer)),
            config,
            world,
            camera,
            controls,
            panel,
            lights,
            ground,
            map,
            viewport: (width, height),
        }
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport = (width, height);
        self.camera.set_viewport(width, height);
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn rotate(&mut self, dx: f64, dy: f64) {
        self.controls.rotate_by_pixels(dx, dy, self.viewport.1);
    }

    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.controls
            .pan_by_pixels(dx, dy, self.viewport.1, &self.camera);
    }

    pub fn zoom(&mut self, wheel_delta: f64) {
        self.controls.zoom(wheel_delta);
    }

    /// One animation frame: settle the controls, then collect draws.
    pub fn tick(&mut self) -> RenderFrame<'_> {
        self.controls.update(&mut self.camera);
        self.renderer.collect(&self.world, &self.camera)
    }
}

fn build_layer(
    world: &mut World,
    projection: Mercator,
    options: &LayerOptions,
    name: &str,
    data: Option<&FeatureCollection>,
) -> Option<RegionMapReport> {
    match data {
        Some(collection) if !collection.is_empty() => Some(
            RegionMapBuilder::new(projection, options)
                .named(name)
                .build(world, collection),
        ),
        _ => {
            error!(layer = name, "map data is empty or missing");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GROUND_LAYER, MAP_LAYER, MapScene};
    use formats::{FeatureCollection, MapConfig};
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn guangzhou_block() -> FeatureCollection {
        let payload = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": { "name": "Tianhe" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[
                        [113.30, 23.10], [113.35, 23.10], [113.35, 23.15],
                        [113.30, 23.15], [113.30, 23.10]
                    ]]
                }
            }]
        });
        FeatureCollection::from_geojson_value(&payload).expect("fixture")
    }

    #[test]
    fn builds_both_layers_and_lights() {
        let data = guangzhou_block();
        let scene = MapScene::build(MapConfig::default(), (800.0, 600.0), Some(&data), Some(&data));

        assert_eq!(scene.lights.len(), 4);
        let ground = scene.ground.as_ref().expect("ground");
        let map = scene.map.as_ref().expect("map");
        assert_eq!(ground.meshes, 1);
        assert_eq!(ground.outlines, 1);
        assert_eq!(map.outlines, 0);
        assert_eq!(scene.world.find_by_name(GROUND_LAYER), Some(ground.group));
        assert_eq!(scene.world.find_by_name(MAP_LAYER), Some(map.group));
        assert!((scene.camera.aspect - 800.0 / 600.0).abs() < 1e-12);
        assert!(scene.panel.control("mesh.color").is_some());
    }

    #[test]
    fn camera_starts_inside_the_distance_limits() {
        let scene = MapScene::build(MapConfig::default(), (800.0, 600.0), None, None);
        // Configured at z = 5 but clamped to minDistance.
        let distance = (scene.camera.position - scene.controls.target).length();
        assert!((distance - 50.0).abs() < 1e-9, "distance {distance}");
        assert_eq!(scene.controls.target, Vec3::ZERO);
    }

    #[test]
    fn missing_layers_are_skipped() {
        let empty = FeatureCollection::default();
        let scene = MapScene::build(MapConfig::default(), (800.0, 600.0), Some(&empty), None);
        assert!(scene.ground.is_none());
        assert!(scene.map.is_none());
        assert!(scene.panel.control("mesh.color").is_none());
        // Lights only.
        assert_eq!(scene.world.len(), 4);
    }

    #[test]
    fn tick_collects_a_frame() {
        let data = guangzhou_block();
        let mut scene = MapScene::build(MapConfig::default(), (800.0, 600.0), Some(&data), Some(&data));
        scene.zoom(-1.0);
        let frame = scene.tick();
        assert_eq!(frame.meshes.len(), 2);
        assert_eq!(frame.lines.len(), 1);
        assert_eq!(frame.lights.directional.len(), 2);
    }
}
