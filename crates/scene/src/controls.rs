//! Orbit camera controls: rotate around a target, dolly towards it and pan it,
//! with optional inertia.

use std::f64::consts::PI;

use foundation::math::Vec3;
use formats::ControlsConfig;

use crate::camera::PerspectiveCamera;

const EPS: f64 = 1e-6;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitControls {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f64,
    pub min_distance: f64,
    pub max_distance: f64,
    pub min_polar_angle: f64,
    pub max_polar_angle: f64,
    pub rotate_speed: f64,
    pub zoom_speed: f64,
    pub pan_speed: f64,
    // Pending input, consumed (or decayed) by `update`.
    delta_theta: f64,
    delta_phi: f64,
    scale: f64,
    pan_offset: Vec3,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: false,
            damping_factor: 0.05,
            min_distance: 0.0,
            max_distance: f64::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
        }
    }
}

impl OrbitControls {
    pub fn from_config(config: &ControlsConfig) -> Self {
        Self {
            enable_damping: config.enable_damping,
            damping_factor: config.damping_factor,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            pan_speed: config.pan_speed,
            ..Self::default()
        }
    }

    pub fn rotate_left(&mut self, angle: f64) {
        self.delta_theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f64) {
        self.delta_phi -= angle;
    }

    /// Pointer drag in pixels; a drag across the full viewport height turns
    /// the camera once around.
    pub fn rotate_by_pixels(&mut self, dx: f64, dy: f64, viewport_height: f64) {
        let h = viewport_height.max(1.0);
        self.rotate_left(2.0 * PI * dx / h * self.rotate_speed);
        self.rotate_up(2.0 * PI * dy / h * self.rotate_speed);
    }

    /// Screen-space pan in pixels; the target moves so the point under the
    /// cursor follows it at the target's depth.
    pub fn pan_by_pixels(
        &mut self,
        dx: f64,
        dy: f64,
        viewport_height: f64,
        camera: &PerspectiveCamera,
    ) {
        let h = viewport_height.max(1.0);
        let offset = camera.position - self.target;
        let target_distance = offset.length() * (camera.fov_deg.to_radians() / 2.0).tan();
        let forward = camera.forward();
        let right = forward.cross(camera.up).normalize();
        let up = right.cross(forward);
        let left = right.scale(-(2.0 * dx * target_distance / h) * self.pan_speed);
        let upward = up.scale((2.0 * dy * target_distance / h) * self.pan_speed);
        self.pan_offset = self.pan_offset + left + upward;
    }

    /// Mouse-wheel style zoom: negative deltas move closer.
    pub fn zoom(&mut self, wheel_delta: f64) {
        let step = 0.95f64.powf(self.zoom_speed);
        if wheel_delta < 0.0 {
            self.scale *= step;
        } else if wheel_delta > 0.0 {
            self.scale /= step;
        }
    }

    /// Applies pending input to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let before = camera.position;
        let offset = camera.position - self.target;

        let mut radius = offset.length();
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = if radius == 0.0 {
            0.0
        } else {
            (offset.y / radius).clamp(-1.0, 1.0).acos()
        };

        let (d_theta, d_phi, d_pan) = if self.enable_damping {
            (
                self.delta_theta * self.damping_factor,
                self.delta_phi * self.damping_factor,
                self.pan_offset.scale(self.damping_factor),
            )
        } else {
            (self.delta_theta, self.delta_phi, self.pan_offset)
        };
        theta += d_theta;
        phi += d_phi;
        phi = phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);

        // Inverted limits settle on max_distance.
        radius = (radius * self.scale)
            .max(self.min_distance)
            .min(self.max_distance);
        self.target = self.target + d_pan;

        let sin_phi_radius = phi.sin() * radius;
        let offset = Vec3::new(
            sin_phi_radius * theta.sin(),
            phi.cos() * radius,
            sin_phi_radius * theta.cos(),
        );
        camera.position = self.target + offset;
        camera.look_at(self.target);

        if self.enable_damping {
            let keep = 1.0 - self.damping_factor;
            self.delta_theta *= keep;
            self.delta_phi *= keep;
            self.pan_offset = self.pan_offset.scale(keep);
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
            self.pan_offset = Vec3::ZERO;
        }
        self.scale = 1.0;

        camera.position.distance(before) > EPS
    }
}

#[cfg(test)]
mod tests {
    use super::OrbitControls;
    use crate::camera::PerspectiveCamera;
    use formats::ControlsConfig;
    use foundation::math::Vec3;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    fn camera_at(z: f64) -> PerspectiveCamera {
        let mut cam = PerspectiveCamera::new(75.0, 1.0, 0.1, 1000.0);
        cam.position = Vec3::new(0.0, 0.0, z);
        cam.look_at(Vec3::ZERO);
        cam
    }

    #[test]
    fn distance_is_clamped_to_configured_range() {
        let mut controls = OrbitControls::from_config(&ControlsConfig::default());
        let mut cam = camera_at(5.0);
        assert!(controls.update(&mut cam));
        assert_close(cam.position.length(), 50.0);

        let mut cam = camera_at(500.0);
        controls.update(&mut cam);
        assert_close(cam.position.length(), 200.0);
    }

    #[test]
    fn undamped_rotation_applies_in_one_update() {
        let mut controls = OrbitControls::default();
        let mut cam = camera_at(10.0);
        controls.rotate_left(-std::f64::consts::FRAC_PI_2);
        controls.update(&mut cam);
        assert_close(cam.position.x, 10.0);
        assert_close(cam.position.z, 0.0);
        assert!(!controls.update(&mut cam));
    }

    #[test]
    fn damping_spreads_rotation_over_frames() {
        let mut controls = OrbitControls {
            enable_damping: true,
            damping_factor: 0.5,
            ..OrbitControls::default()
        };
        let mut cam = camera_at(10.0);
        controls.rotate_left(-1.0);
        controls.update(&mut cam);
        let first = cam.position.x.atan2(cam.position.z);
        assert_close(first, 0.5);
        controls.update(&mut cam);
        let second = cam.position.x.atan2(cam.position.z);
        assert_close(second, 0.75);
    }

    #[test]
    fn zoom_and_pan_move_camera_and_target() {
        let mut controls = OrbitControls::default();
        let mut cam = camera_at(100.0);
        controls.zoom(-1.0);
        controls.update(&mut cam);
        assert_close(cam.position.z, 95.0);

        controls.pan_by_pixels(-10.0, 0.0, 100.0, &cam);
        controls.update(&mut cam);
        assert!(controls.target.x > 0.0);
        assert_close(cam.position.x, controls.target.x);
    }

    #[test]
    fn inverted_distance_limits_do_not_panic() {
        let mut controls = OrbitControls {
            min_distance: 300.0,
            max_distance: 200.0,
            ..OrbitControls::default()
        };
        let mut cam = camera_at(10.0);
        controls.update(&mut cam);
        assert_close(cam.position.length(), 200.0);
    }

    #[test]
    fn full_height_drag_turns_once_around() {
        let mut controls = OrbitControls::default();
        let mut cam = camera_at(10.0);
        // A quarter of the viewport height is a quarter turn.
        controls.rotate_by_pixels(-25.0, 0.0, 100.0);
        controls.update(&mut cam);
        assert_close(cam.position.x, 10.0);
        assert_close(cam.position.z, 0.0);

        let start = cam.position;
        controls.rotate_by_pixels(100.0, 0.0, 100.0);
        controls.update(&mut cam);
        assert!(cam.position.distance(start) < 1e-9);
    }

    #[test]
    fn polar_angle_never_reaches_the_pole() {
        let mut controls = OrbitControls::default();
        let mut cam = camera_at(10.0);
        controls.rotate_up(10.0);
        controls.update(&mut cam);
        assert!(cam.position.y < 10.0);
        assert!(cam.position.y > 9.99);
    }
}
