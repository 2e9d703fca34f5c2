use foundation::math::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        }
    }

    pub fn get(self, v: Vec3) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }

    pub fn set(self, v: &mut Vec3, value: f64) {
        match self {
            Axis::X => v.x = value,
            Axis::Y => v.y = value,
            Axis::Z => v.z = value,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlKind {
    Number { min: f64, max: f64, step: f64 },
    Color,
    Boolean,
}

impl ControlKind {
    pub fn expected(&self) -> &'static str {
        match self {
            ControlKind::Number { .. } => "number",
            ControlKind::Color => "colour string",
            ControlKind::Boolean => "boolean",
        }
    }
}

/// Value exchanged with the host page: JSON number, `"#rrggbb"` string or bool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Number(f64),
    Bool(bool),
    Color(String),
}

/// Scene property a control reads and writes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Binding {
    SceneBackground,
    CameraPosition(Axis),
    CameraFov,
    CameraNear,
    CameraFar,
    MeshPosition(Axis),
    MeshColor,
    MeshWireframe,
    MeshOpacity,
}

impl Binding {
    pub fn changes_projection(self) -> bool {
        matches!(self, Binding::CameraFov | Binding::CameraNear | Binding::CameraFar)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Control {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ControlKind,
    #[serde(skip)]
    pub binding: Binding,
}

impl Control {
    pub fn number(id: &str, label: &str, binding: Binding, min: f64, max: f64, step: f64) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ControlKind::Number { min, max, step },
            binding,
        }
    }

    pub fn color(id: &str, label: &str, binding: Binding) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ControlKind::Color,
            binding,
        }
    }

    pub fn boolean(id: &str, label: &str, binding: Binding) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            kind: ControlKind::Boolean,
            binding,
        }
    }
}

/// Snaps to the step grid anchored at `min`, then clamps into range.
pub fn snap_clamp(value: f64, min: f64, max: f64, step: f64) -> f64 {
    let snapped = if step > 0.0 {
        let steps = ((value - min) / step).round();
        to_precision_15(steps * step + min)
    } else {
        value
    };
    snapped.clamp(min, max)
}

/// Drops float noise such as `0.30000000000000004`.
fn to_precision_15(v: f64) -> f64 {
    format!("{v:.14e}").parse().unwrap_or(v)
}

#[cfg(test)]
mod tests {
    use super::{ControlValue, snap_clamp};

    #[test]
    fn snaps_then_clamps() {
        assert_eq!(snap_clamp(12.4, -100.0, 100.0, 1.0), 12.0);
        assert_eq!(snap_clamp(-12.6, -100.0, 100.0, 1.0), -13.0);
        assert_eq!(snap_clamp(250.0, -100.0, 100.0, 1.0), 100.0);
        assert_eq!(snap_clamp(0.304, 0.0, 1.0, 0.01), 0.3);
        assert_eq!(snap_clamp(-3.0, 0.0, 180.0, 1.0), 0.0);
    }

    #[test]
    fn values_parse_from_plain_json() {
        let v: Vec<ControlValue> = serde_json::from_str(r##"[1.5, true, "#ff0000"]"##).expect("values");
        assert_eq!(
            v,
            vec![
                ControlValue::Number(1.5),
                ControlValue::Bool(true),
                ControlValue::Color("#ff0000".to_string())
            ]
        );
    }
}
