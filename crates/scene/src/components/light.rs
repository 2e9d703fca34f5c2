use foundation::Color;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShadowSettings {
    pub map_size: u32,
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

/// Light sources. Directional lights shine from their node position towards
/// the world origin; hemisphere lights blend sky and ground colours by the
/// surface normal's alignment with their position.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Light {
    Ambient {
        color: Color,
        intensity: f32,
    },
    Directional {
        color: Color,
        intensity: f32,
        shadow: Option<ShadowSettings>,
    },
    Hemisphere {
        sky: Color,
        ground: Color,
        intensity: f32,
    },
}

impl Light {
    pub fn intensity(&self) -> f32 {
        match self {
            Light::Ambient { intensity, .. }
            | Light::Directional { intensity, .. }
            | Light::Hemisphere { intensity, .. } => *intensity,
        }
    }

    pub fn casts_shadow(&self) -> bool {
        matches!(self, Light::Directional { shadow: Some(_), .. })
    }
}
