use foundation::math::{Mat4, Vec3, mat4_look_at_rh, mat4_mul, mat4_perspective_rh_z0};
use formats::CameraConfig;

/// Perspective camera.
///
/// The projection matrix is cached: edits to `fov_deg`, `near`, `far` or
/// `aspect` take effect after [`PerspectiveCamera::update_projection_matrix`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_deg: f64,
    pub aspect: f64,
    pub near: f64,
    pub far: f64,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f64, aspect: f64, near: f64, far: f64) -> Self {
        let mut cam = Self {
            position: Vec3::ZERO,
            target: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::Y,
            fov_deg,
            aspect,
            near,
            far,
            projection: [[0.0; 4]; 4],
        };
        cam.update_projection_matrix();
        cam
    }

    /// Camera placed per `config`, looking at the origin.
    pub fn from_config(config: &CameraConfig, aspect: f64) -> Self {
        let mut cam = Self::new(config.fov, aspect, config.near, config.far);
        let p = config.position;
        cam.position = Vec3::new(p.x, p.y, p.z);
        cam.look_at(Vec3::ZERO);
        cam
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    /// `width / height`, falling back to 1 for a collapsed viewport.
    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.aspect = if height <= 0.0 {
            1.0
        } else {
            (width / height).max(1e-6)
        };
        self.update_projection_matrix();
    }

    pub fn update_projection_matrix(&mut self) {
        // Keep the matrix usable while a debug control drags near/far through zero.
        let near = self.near.max(1e-6);
        let far = self.far.max(near + 1e-6);
        let fov = self.fov_deg.clamp(1e-3, 179.999);
        self.projection = mat4_perspective_rh_z0(fov.to_radians(), self.aspect, near, far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        mat4_look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection(&self) -> Mat4 {
        mat4_mul(self.projection, self.view_matrix())
    }

    /// Unit vector from the camera towards its target.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize()
    }
}

#[cfg(test)]
mod tests {
    use super::PerspectiveCamera;
    use formats::CameraConfig;
    use foundation::math::Vec3;

    #[test]
    fn projection_is_stale_until_updated() {
        let mut cam = PerspectiveCamera::new(75.0, 1.5, 0.1, 1000.0);
        let before = cam.projection_matrix();
        cam.fov_deg = 30.0;
        assert_eq!(cam.projection_matrix(), before);
        cam.update_projection_matrix();
        assert_ne!(cam.projection_matrix(), before);
    }

    #[test]
    fn config_camera_looks_at_origin() {
        let cam = PerspectiveCamera::from_config(&CameraConfig::default(), 16.0 / 9.0);
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(cam.forward(), Vec3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn collapsed_viewport_keeps_unit_aspect() {
        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        cam.set_viewport(800.0, 0.0);
        assert_eq!(cam.aspect, 1.0);
        cam.set_viewport(800.0, 400.0);
        assert_eq!(cam.aspect, 2.0);
    }
}
