use foundation::Color;
use scene::{EntityId, PerspectiveCamera, World};
use serde::Serialize;
use tracing::debug;

use crate::control::{Axis, Binding, Control, ControlKind, ControlValue, snap_clamp};

#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    #[error("unknown control {0:?}")]
    UnknownControl(String),
    #[error("control {id:?} expects a {expected}")]
    TypeMismatch { id: String, expected: &'static str },
    #[error("invalid colour {0:?}")]
    InvalidColor(String),
    #[error("control {0:?} needs a finite number")]
    NotFinite(String),
    #[error("mesh {0} is no longer in the scene")]
    MissingMesh(EntityId),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelOptions {
    pub title: String,
    pub width: u32,
    pub close_folders: bool,
}

impl Default for PanelOptions {
    fn default() -> Self {
        Self {
            title: "Three.js debug panel".to_string(),
            width: 400,
            close_folders: false,
        }
    }
}

/// Which objects the panel exposes. Flags only add (empty) folders for
/// targets the panel has no controls for yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelTargets {
    pub scene: bool,
    pub camera: bool,
    pub mesh: Option<EntityId>,
    pub material: bool,
    pub camera_helper: bool,
    pub renderer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Folder {
    pub id: String,
    pub title: String,
    pub closed: bool,
    pub controls: Vec<Control>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Panel {
    #[serde(flatten)]
    pub options: PanelOptions,
    pub folders: Vec<Folder>,
    #[serde(skip)]
    mesh: Option<EntityId>,
}

impl Panel {
    pub fn build(targets: &PanelTargets, options: PanelOptions) -> Self {
        let closed = options.close_folders;
        let folder = |id: &str, controls: Vec<Control>| Folder {
            id: id.to_string(),
            title: id.to_string(),
            closed,
            controls,
        };
        let mut folders = Vec::new();

        if targets.scene {
            folders.push(folder(
                "scene",
                vec![Control::color(
                    "scene.background",
                    "background",
                    Binding::SceneBackground,
                )],
            ));
        }

        if targets.camera {
            let mut controls: Vec<Control> = Axis::ALL
                .iter()
                .map(|a| {
                    Control::number(
                        &format!("camera.position.{}", a.name()),
                        &format!("{} position", a.name()),
                        Binding::CameraPosition(*a),
                        -100.0,
                        100.0,
                        1.0,
                    )
                })
                .collect();
            for (name, binding) in [
                ("fov", Binding::CameraFov),
                ("near", Binding::CameraNear),
                ("far", Binding::CameraFar),
            ] {
                controls.push(Control::number(
                    &format!("camera.{name}"),
                    name,
                    binding,
                    0.0,
                    180.0,
                    1.0,
                ));
            }
            folders.push(folder("camera", controls));
        }

        if targets.mesh.is_some() {
            let mut controls: Vec<Control> = Axis::ALL
                .iter()
                .map(|a| {
                    Control::number(
                        &format!("mesh.position.{}", a.name()),
                        &format!("{} position", a.name()),
                        Binding::MeshPosition(*a),
                        -100.0,
                        100.0,
                        1.0,
                    )
                })
                .collect();
            controls.push(Control::color("mesh.color", "colour", Binding::MeshColor));
            controls.push(Control::boolean(
                "mesh.wireframe",
                "wireframe",
                Binding::MeshWireframe,
            ));
            controls.push(Control::number(
                "mesh.opacity",
                "opacity",
                Binding::MeshOpacity,
                0.0,
                1.0,
                0.01,
            ));
            folders.push(folder("mesh", controls));
        }

        for (present, id) in [
            (targets.material, "material"),
            (targets.camera_helper, "cameraHelper"),
            (targets.renderer, "renderer"),
        ] {
            if present {
                folders.push(folder(id, Vec::new()));
            }
        }

        Self {
            options,
            folders,
            mesh: targets.mesh,
        }
    }

    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.folders.iter().flat_map(|f| f.controls.iter())
    }

    pub fn control(&self, id: &str) -> Option<&Control> {
        self.controls().find(|c| c.id == id)
    }

    pub fn to_json(&self) -> Result<String, PanelError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn value(
        &self,
        world: &World,
        camera: &PerspectiveCamera,
        id: &str,
    ) -> Result<ControlValue, PanelError> {
        let control = self
            .control(id)
            .ok_or_else(|| PanelError::UnknownControl(id.to_string()))?;
        let value = match control.binding {
            Binding::SceneBackground => ControlValue::Color(
                world.background.map(Color::to_hex_string).unwrap_or_default(),
            ),
            Binding::CameraPosition(axis) => ControlValue::Number(axis.get(camera.position)),
            Binding::CameraFov => ControlValue::Number(camera.fov_deg),
            Binding::CameraNear => ControlValue::Number(camera.near),
            Binding::CameraFar => ControlValue::Number(camera.far),
            Binding::MeshPosition(axis) => {
                let (entity, _) = self.mesh_target(world)?;
                let position = world
                    .node(entity)
                    .map(|n| n.transform.position)
                    .unwrap_or_default();
                ControlValue::Number(axis.get(position))
            }
            Binding::MeshColor | Binding::MeshWireframe | Binding::MeshOpacity => {
                let (entity, mesh) = self.mesh_target(world)?;
                let material = mesh.material(0).ok_or(PanelError::MissingMesh(entity))?;
                match control.binding {
                    Binding::MeshColor => ControlValue::Color(material.color.to_hex_string()),
                    Binding::MeshWireframe => ControlValue::Bool(material.wireframe),
                    _ => ControlValue::Number(f64::from(material.opacity)),
                }
            }
        };
        Ok(value)
    }

    /// Writes `value` to the bound property and returns what was stored
    /// after clamping and step snapping.
    pub fn apply(
        &self,
        world: &mut World,
        camera: &mut PerspectiveCamera,
        id: &str,
        value: ControlValue,
    ) -> Result<ControlValue, PanelError> {
        let control = self
            .control(id)
            .ok_or_else(|| PanelError::UnknownControl(id.to_string()))?;
        let value = normalize(control, value)?;

        match (control.binding, &value) {
            (Binding::SceneBackground, ControlValue::Color(hex)) => {
                world.background = Some(parse_color(hex)?);
            }
            (Binding::CameraPosition(axis), ControlValue::Number(v)) => {
                axis.set(&mut camera.position, *v);
                debug!(axis = axis.name(), value = v, "camera position");
            }
            (Binding::CameraFov, ControlValue::Number(v)) => camera.fov_deg = *v,
            (Binding::CameraNear, ControlValue::Number(v)) => camera.near = *v,
            (Binding::CameraFar, ControlValue::Number(v)) => camera.far = *v,
            (Binding::MeshPosition(axis), ControlValue::Number(v)) => {
                let (entity, _) = self.mesh_target(world)?;
                if let Some(node) = world.node_mut(entity) {
                    axis.set(&mut node.transform.position, *v);
                }
                debug!(axis = axis.name(), value = v, %entity, "mesh position");
            }
            (Binding::MeshColor, ControlValue::Color(hex)) => {
                let color = parse_color(hex)?;
                self.edit_materials(world, |m| m.color = color)?;
            }
            (Binding::MeshWireframe, ControlValue::Bool(on)) => {
                let on = *on;
                self.edit_materials(world, |m| m.wireframe = on)?;
            }
            (Binding::MeshOpacity, ControlValue::Number(v)) => {
                let opacity = *v as f32;
                self.edit_materials(world, |m| m.opacity = opacity)?;
            }
            _ => {
                return Err(PanelError::TypeMismatch {
                    id: id.to_string(),
                    expected: control.kind.expected(),
                });
            }
        }

        if control.binding.changes_projection() {
            camera.update_projection_matrix();
        }
        Ok(value)
    }

    fn mesh_target<'w>(
        &self,
        world: &'w World,
    ) -> Result<(EntityId, &'w scene::components::Mesh), PanelError> {
        let entity = self
            .mesh
            .ok_or_else(|| PanelError::UnknownControl("mesh".to_string()))?;
        let mesh = world.mesh(entity).ok_or(PanelError::MissingMesh(entity))?;
        Ok((entity, mesh))
    }

    fn edit_materials(
        &self,
        world: &mut World,
        edit: impl Fn(&mut scene::components::StandardMaterial),
    ) -> Result<(), PanelError> {
        let entity = self
            .mesh
            .ok_or_else(|| PanelError::UnknownControl("mesh".to_string()))?;
        let mesh = world.mesh_mut(entity).ok_or(PanelError::MissingMesh(entity))?;
        mesh.materials.iter_mut().for_each(edit);
        Ok(())
    }
}

fn normalize(control: &Control, value: ControlValue) -> Result<ControlValue, PanelError> {
    match (control.kind, value) {
        (ControlKind::Number { min, max, step }, ControlValue::Number(v)) => {
            if !v.is_finite() {
                return Err(PanelError::NotFinite(control.id.clone()));
            }
            Ok(ControlValue::Number(snap_clamp(v, min, max, step)))
        }
        (ControlKind::Color, ControlValue::Color(hex)) => {
            let color = parse_color(&hex)?;
            Ok(ControlValue::Color(color.to_hex_string()))
        }
        (ControlKind::Boolean, v @ ControlValue::Bool(_)) => Ok(v),
        (kind, _) => Err(PanelError::TypeMismatch {
            id: control.id.clone(),
            expected: kind.expected(),
        }),
    }
}

fn parse_color(hex: &str) -> Result<Color, PanelError> {
    Color::parse(hex).ok_or_else(|| PanelError::InvalidColor(hex.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{Panel, PanelError, PanelOptions, PanelTargets};
    use crate::control::ControlValue;
    use foundation::Color;
    use foundation::math::Vec3;
    use pretty_assertions::assert_eq;
    use scene::components::{BufferGeometry, Mesh, StandardMaterial};
    use scene::{EntityId, Object, PerspectiveCamera, World};

    fn fixture() -> (World, PerspectiveCamera, EntityId) {
        let mut world = World::with_background(Color::from_hex(0x000000));
        let geometry = world.add_geometry(BufferGeometry::new());
        let mesh = world.add(
            Object::Mesh(Mesh::new(
                geometry,
                vec![
                    StandardMaterial::new(Color::from_hex(0x336699), 0.0, 0.3),
                    StandardMaterial::new(Color::from_hex(0x336699), 0.0, 0.5),
                ],
            )),
            None,
        );
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, -50.0, 80.0);
        (world, camera, mesh)
    }

    fn all_targets(mesh: EntityId) -> PanelTargets {
        PanelTargets {
            scene: true,
            camera: true,
            mesh: Some(mesh),
            material: true,
            camera_helper: true,
            renderer: true,
        }
    }

    #[test]
    fn folders_follow_the_target_order() {
        let (_, _, mesh) = fixture();
        let panel = Panel::build(&all_targets(mesh), PanelOptions::default());
        let ids: Vec<&str> = panel.folders.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["scene", "camera", "mesh", "material", "cameraHelper", "renderer"]
        );
        assert_eq!(panel.folders[1].controls.len(), 6);
        assert_eq!(panel.folders[2].controls.len(), 6);
        assert!(panel.folders[3].controls.is_empty());
    }

    #[test]
    fn absent_targets_have_no_folder() {
        let panel = Panel::build(
            &PanelTargets {
                camera: true,
                ..PanelTargets::default()
            },
            PanelOptions {
                close_folders: true,
                ..PanelOptions::default()
            },
        );
        assert_eq!(panel.folders.len(), 1);
        assert!(panel.folders[0].closed);
        assert!(panel.control("mesh.opacity").is_none());
    }

    #[test]
    fn schema_serialises_controls() {
        let (_, _, mesh) = fixture();
        let panel = Panel::build(&all_targets(mesh), PanelOptions::default());
        let json: serde_json::Value =
            serde_json::from_str(&panel.to_json().expect("json")).expect("parse");
        assert_eq!(json["title"], "Three.js debug panel");
        assert_eq!(json["width"], 400);
        let fov = &json["folders"][1]["controls"][3];
        assert_eq!(fov["id"], "camera.fov");
        assert_eq!(fov["type"], "number");
        assert_eq!(fov["max"], 180.0);
        assert_eq!(json["folders"][2]["controls"][4]["type"], "boolean");
    }

    #[test]
    fn camera_edits_clamp_snap_and_refresh_projection() {
        let (mut world, mut camera, mesh) = fixture();
        let panel = Panel::build(&all_targets(mesh), PanelOptions::default());

        let stored = panel
            .apply(&mut world, &mut camera, "camera.position.x", ControlValue::Number(140.7))
            .expect("apply");
        assert_eq!(stored, ControlValue::Number(100.0));
        assert_eq!(camera.position.x, 100.0);

        let before = camera.projection_matrix();
        panel
            .apply(&mut world, &mut camera, "camera.fov", ControlValue::Number(44.6))
            .expect("apply");
        assert_eq!(camera.fov_deg, 45.0);
        assert_ne!(camera.projection_matrix(), before);
        assert_eq!(
            panel.value(&world, &camera, "camera.fov").expect("value"),
            ControlValue::Number(45.0)
        );
    }

    #[test]
    fn mesh_edits_touch_every_material() {
        let (mut world, mut camera, mesh) = fixture();
        let panel = Panel::build(&all_targets(mesh), PanelOptions::default());

        panel
            .apply(&mut world, &mut camera, "mesh.color", ControlValue::Color("#F00".to_string()))
            .expect("colour");
        panel
            .apply(&mut world, &mut camera, "mesh.wireframe", ControlValue::Bool(true))
            .expect("wireframe");
        panel
            .apply(&mut world, &mut camera, "mesh.opacity", ControlValue::Number(0.456))
            .expect("opacity");
        panel
            .apply(&mut world, &mut camera, "mesh.position.z", ControlValue::Number(3.2))
            .expect("position");

        let m = world.mesh(mesh).expect("mesh");
        assert!(m.materials.iter().all(|mat| mat.wireframe));
        assert!(m.materials.iter().all(|mat| mat.color == Color::from_hex(0xff0000)));
        assert_eq!(
            panel.value(&world, &camera, "mesh.opacity").expect("value"),
            ControlValue::Number(f64::from(0.46f32))
        );
        assert_eq!(
            panel.value(&world, &camera, "mesh.color").expect("value"),
            ControlValue::Color("#ff0000".to_string())
        );
        assert_eq!(world.node(mesh).expect("node").transform.position.z, 3.0);
    }

    #[test]
    fn background_round_trips_as_hex() {
        let (mut world, mut camera, mesh) = fixture();
        let panel = Panel::build(&all_targets(mesh), PanelOptions::default());
        panel
            .apply(
                &mut world,
                &mut camera,
                "scene.background",
                ControlValue::Color("#1a2b3c".to_string()),
            )
            .expect("apply");
        assert_eq!(
            panel.value(&world, &camera, "scene.background").expect("value"),
            ControlValue::Color("#1a2b3c".to_string())
        );
    }

    #[test]
    fn unset_background_reads_empty_until_assigned() {
        let (mut world, mut camera, mesh) = fixture();
        world.background = None;
        let panel = Panel::build(&all_targets(mesh), PanelOptions::default());
        assert_eq!(
            panel.value(&world, &camera, "scene.background").expect("value"),
            ControlValue::Color(String::new())
        );
        panel
            .apply(
                &mut world,
                &mut camera,
                "scene.background",
                ControlValue::Color("#ffffff".to_string()),
            )
            .expect("apply");
        assert_eq!(world.background, Some(Color::from_hex(0xffffff)));
    }

    #[test]
    fn rejects_bad_input() {
        let (mut world, mut camera, mesh) = fixture();
        let panel = Panel::build(&all_targets(mesh), PanelOptions::default());
        assert!(matches!(
            panel.apply(&mut world, &mut camera, "nope", ControlValue::Bool(true)),
            Err(PanelError::UnknownControl(_))
        ));
        assert!(matches!(
            panel.apply(&mut world, &mut camera, "camera.near", ControlValue::Bool(true)),
            Err(PanelError::TypeMismatch { .. })
        ));
        assert!(matches!(
            panel.apply(
                &mut world,
                &mut camera,
                "scene.background",
                ControlValue::Color("teal-ish".to_string())
            ),
            Err(PanelError::InvalidColor(_))
        ));
        assert!(matches!(
            panel.apply(&mut world, &mut camera, "camera.far", ControlValue::Number(f64::NAN)),
            Err(PanelError::NotFinite(_))
        ));

        world.remove(mesh);
        assert!(matches!(
            panel.value(&world, &camera, "mesh.opacity"),
            Err(PanelError::MissingMesh(_))
        ));
    }
}
