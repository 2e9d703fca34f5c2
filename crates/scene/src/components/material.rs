use foundation::Color;

/// Lit surface material (metal/rough model).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StandardMaterial {
    pub color: Color,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    /// Opacity is only honoured when this is set.
    pub transparent: bool,
    pub wireframe: bool,
}

impl StandardMaterial {
    pub fn new(color: Color, metalness: f32, roughness: f32) -> Self {
        Self {
            color,
            metalness,
            roughness,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
        }
    }

    pub fn effective_opacity(&self) -> f32 {
        if self.transparent { self.opacity } else { 1.0 }
    }
}

impl Default for StandardMaterial {
    fn default() -> Self {
        Self::new(Color::WHITE, 0.0, 1.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LineMaterial {
    pub color: Color,
    /// Kept for parity with page configs; browsers rasterise lines at 1px.
    pub linewidth: f32,
    pub transparent: bool,
    pub opacity: f32,
}

impl LineMaterial {
    pub fn effective_opacity(&self) -> f32 {
        if self.transparent { self.opacity } else { 1.0 }
    }
}

impl Default for LineMaterial {
    fn default() -> Self {
        Self {
            color: Color::WHITE,
            linewidth: 1.0,
            transparent: false,
            opacity: 1.0,
        }
    }
}
