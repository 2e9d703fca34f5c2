//! Viewer configuration: camera, renderer, controls, projection and the two
//! map layers. JSON keys are camelCase so page-side config objects can be
//! passed through unchanged.

use foundation::Color;
use foundation::math::Mercator;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapConfig {
    pub scene: SceneConfig,
    pub camera: CameraConfig,
    pub renderer: RendererConfig,
    pub controls: ControlsConfig,
    pub projection: ProjectionConfig,
    pub ground_map: LayerOptions,
    pub map: LayerOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SceneConfig {
    pub background: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraConfig {
    pub fov: f64,
    pub near: f64,
    pub far: f64,
    pub position: PositionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RendererConfig {
    pub antialias: bool,
    pub alpha: bool,
    pub max_pixel_ratio: f64,
    pub shadow_map: bool,
    pub tone_mapping_exposure: f64,
    pub clear_color: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub rotate_speed: f64,
    pub zoom_speed: f64,
    pub pan_speed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectionConfig {
    pub center: [f64; 2],
    pub scale: f64,
    pub translate: [f64; 2],
}

/// Extrusion parameters, mirroring three.js `ExtrudeGeometry` options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtrudeOptions {
    pub depth: f64,
    pub steps: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f64,
    /// Defaults to `bevel_thickness - 0.1` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bevel_size: Option<f64>,
    pub bevel_offset: f64,
    pub bevel_segments: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineOptions {
    pub color: u32,
    pub linewidth: f64,
    pub transparent: bool,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayerOptions {
    pub extrude_opts: ExtrudeOptions,
    pub color_list: Vec<String>,
    pub draw_outline: bool,
    pub line_opts: LineOptions,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("config overrides must be a JSON object")]
    NotAnObject,
    #[error("{layer}: colorList must not be empty")]
    EmptyColorList { layer: &'static str },
    #[error("{layer}: invalid colour {value:?}")]
    InvalidColor { layer: &'static str, value: String },
    #[error("projection scale must be positive and finite, got {0}")]
    InvalidProjectionScale(f64),
    #[error("camera: {0}")]
    InvalidCamera(String),
    #[error("controls: distance limits must satisfy 0 <= min <= max, got {min}..{max}")]
    InvalidDistanceLimits { min: f64, max: f64 },
    #[error("{layer}: extrude depth must be non-negative, got {depth}")]
    InvalidDepth { layer: &'static str, depth: f64 },
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            scene: SceneConfig::default(),
            camera: CameraConfig::default(),
            renderer: RendererConfig::default(),
            controls: ControlsConfig::default(),
            projection: ProjectionConfig::default(),
            ground_map: LayerOptions {
                extrude_opts: ExtrudeOptions {
                    depth: 0.1,
                    bevel_enabled: false,
                    ..ExtrudeOptions::default()
                },
                color_list: vec!["#f5f5dc".to_string()],
                draw_outline: true,
                line_opts: LineOptions {
                    color: 0x000000,
                    linewidth: 1.0,
                    transparent: true,
                    opacity: 0.8,
                },
            },
            map: LayerOptions {
                extrude_opts: ExtrudeOptions {
                    depth: 6.0,
                    bevel_enabled: true,
                    bevel_segments: 1,
                    bevel_thickness: 0.3,
                    ..ExtrudeOptions::default()
                },
                color_list: vec![
                    "#0465BD".to_string(),
                    "#357bcb".to_string(),
                    "#3a7abd".to_string(),
                ],
                draw_outline: false,
                line_opts: LineOptions::default(),
            },
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            background: 0x000000,
        }
    }
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 5.0,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: PositionConfig::default(),
        }
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
            max_pixel_ratio: 2.0,
            shadow_map: true,
            tone_mapping_exposure: 1.25,
            clear_color: 0x000000,
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            min_distance: 50.0,
            max_distance: 200.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            center: [113.324521, 23.139056],
            scale: 1000.0,
            translate: [0.0, 0.0],
        }
    }
}

impl ProjectionConfig {
    pub fn to_mercator(&self) -> Mercator {
        Mercator::new(self.center, self.scale, self.translate)
    }
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            steps: 1,
            bevel_enabled: true,
            bevel_thickness: 0.2,
            bevel_size: None,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

impl ExtrudeOptions {
    pub fn effective_bevel_size(&self) -> f64 {
        self.bevel_size.unwrap_or(self.bevel_thickness - 0.1)
    }
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            linewidth: 1.0,
            transparent: false,
            opacity: 1.0,
        }
    }
}

impl Default for LayerOptions {
    fn default() -> Self {
        Self {
            extrude_opts: ExtrudeOptions::default(),
            color_list: vec!["#ffffff".to_string()],
            draw_outline: false,
            line_opts: LineOptions::default(),
        }
    }
}

impl LayerOptions {
    /// Parsed colour list; unparsable entries are dropped (see [`MapConfig::validate`]).
    pub fn colors(&self) -> Vec<Color> {
        self.color_list.iter().filter_map(|c| Color::parse(c)).collect()
    }

    fn validate(&self, layer: &'static str) -> Result<(), ConfigError> {
        if self.color_list.is_empty() {
            return Err(ConfigError::EmptyColorList { layer });
        }
        if let Some(bad) = self.color_list.iter().find(|c| Color::parse(c).is_none()) {
            return Err(ConfigError::InvalidColor {
                layer,
                value: bad.clone(),
            });
        }
        let depth = self.extrude_opts.depth;
        if !(depth >= 0.0) {
            return Err(ConfigError::InvalidDepth { layer, depth });
        }
        Ok(())
    }
}

impl MapConfig {
    /// Applies `overrides` on top of the defaults.
    ///
    /// The merge is shallow: a top-level section present in `overrides`
    /// replaces the default section as a whole, and fields missing from it
    /// fall back to that section's own defaults.
    pub fn with_overrides(overrides: &Value) -> Result<Self, ConfigError> {
        let Value::Object(over) = overrides else {
            return Err(ConfigError::NotAnObject);
        };
        let mut base = serde_json::to_value(Self::default())?;
        if let Value::Object(base_map) = &mut base {
            for (key, value) in over {
                base_map.insert(key.clone(), value.clone());
            }
        }
        let config: Self = serde_json::from_value(base)?;
        config.validate()?;
        debug!(sections = ?over.keys().collect::<Vec<_>>(), "config overrides applied");
        Ok(config)
    }

    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::with_overrides(&value)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let scale = self.projection.scale;
        if !scale.is_finite() || scale <= 0.0 {
            return Err(ConfigError::InvalidProjectionScale(scale));
        }
        let cam = &self.camera;
        if !(cam.near > 0.0 && cam.near < cam.far) {
            return Err(ConfigError::InvalidCamera(format!(
                "near ({}) must be positive and below far ({})",
                cam.near, cam.far
            )));
        }
        if !(cam.fov > 0.0 && cam.fov < 180.0) {
            return Err(ConfigError::InvalidCamera(format!(
                "fov must be within (0, 180), got {}",
                cam.fov
            )));
        }
        let (min, max) = (self.controls.min_distance, self.controls.max_distance);
        if !(min >= 0.0 && min <= max) {
            return Err(ConfigError::InvalidDistanceLimits { min, max });
        }
        self.ground_map.validate("groundMap")?;
        self.map.validate("map")?;
        Ok(())
    }
}
