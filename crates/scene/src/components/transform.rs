use foundation::math::{Mat4, Vec3, mat4_translation};

/// Local transform of a scene node, relative to its parent.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self { position }
    }

    pub fn matrix(&self) -> Mat4 {
        mat4_translation(self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::Transform;
    use foundation::math::{MAT4_IDENTITY, Vec3};

    #[test]
    fn identity_matrix_for_origin() {
        assert_eq!(Transform::identity().matrix(), MAT4_IDENTITY);
        let m = Transform::translate(Vec3::new(1.0, -2.0, 3.0)).matrix();
        assert_eq!(m[3], [1.0, -2.0, 3.0, 1.0]);
    }
}
