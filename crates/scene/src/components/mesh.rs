use foundation::Color;

use super::{GeometryId, LineGeometry, LineMaterial, StandardMaterial};

/// Region metadata carried by map meshes, used for lookups and highlighting.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionData {
    pub original_color: Color,
    pub region_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub geometry: GeometryId,
    /// Indexed by `GeometryGroup::material_index`.
    pub materials: Vec<StandardMaterial>,
    pub region: Option<RegionData>,
}

impl Mesh {
    pub fn new(geometry: GeometryId, materials: Vec<StandardMaterial>) -> Self {
        Self {
            geometry,
            materials,
            region: None,
        }
    }

    pub fn with_region(mut self, region: RegionData) -> Self {
        self.region = Some(region);
        self
    }

    pub fn material(&self, index: usize) -> Option<&StandardMaterial> {
        self.materials.get(index).or_else(|| self.materials.first())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineSegments {
    pub geometry: LineGeometry,
    pub material: LineMaterial,
}
