use foundation::math::Vec3;
use foundation::{Aabb3, BoundingSphere};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct GeometryId(pub u32);

/// Range of vertices drawn with one material slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GeometryGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: usize,
}

/// Non-indexed triangle list: every three positions form one triangle and
/// share one flat normal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub groups: Vec<GeometryGroup>,
    pub bounding_box: Option<Aabb3>,
    pub bounding_sphere: Option<BoundingSphere>,
}

impl BufferGeometry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_triangle(&mut self, a: Vec3, b: Vec3, c: Vec3) {
        let normal = (b - a).cross(c - a).normalize();
        self.positions.extend([a, b, c]);
        self.normals.extend([normal, normal, normal]);
    }

    pub fn add_group(&mut self, start: u32, count: u32, material_index: usize) {
        self.groups.push(GeometryGroup {
            start,
            count,
            material_index,
        });
    }

    pub fn vertex_count(&self) -> u32 {
        self.positions.len() as u32
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.positions.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn compute_bounding_box(&mut self) {
        self.bounding_box = Aabb3::from_points(&self.positions);
    }

    pub fn compute_bounding_sphere(&mut self) {
        self.bounding_sphere = BoundingSphere::from_points(&self.positions);
    }
}

/// Line list: every two positions form one segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineGeometry {
    pub positions: Vec<Vec3>,
}

impl LineGeometry {
    pub fn push_segment(&mut self, a: Vec3, b: Vec3) {
        self.positions.extend([a, b]);
    }

    pub fn segment_count(&self) -> usize {
        self.positions.len() / 2
    }
}
