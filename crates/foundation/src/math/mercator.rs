//! Spherical Mercator projection with the center/scale/translate model used by
//! d3-geo's `geoMercator`.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI, TAU};

use super::Vec2;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Mercator {
    center_deg: [f64; 2],
    scale: f64,
    translate: [f64; 2],
    // Raw projected center, cached on every center() change.
    center_raw: Vec2,
}

impl Default for Mercator {
    fn default() -> Self {
        // d3 default: 961 / tau, centred at the origin, translated to (480, 250).
        Self::new([0.0, 0.0], 961.0 / TAU, [480.0, 250.0])
    }
}

impl Mercator {
    pub fn new(center_deg: [f64; 2], scale: f64, translate: [f64; 2]) -> Self {
        let mut out = Self {
            center_deg,
            scale,
            translate,
            center_raw: Vec2::default(),
        };
        out.recenter();
        out
    }

    pub fn center(mut self, lon_deg: f64, lat_deg: f64) -> Self {
        self.center_deg = [lon_deg, lat_deg];
        self.recenter();
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn translate(mut self, tx: f64, ty: f64) -> Self {
        self.translate = [tx, ty];
        self
    }

    pub fn center_deg(&self) -> [f64; 2] {
        self.center_deg
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale
    }

    pub fn translation(&self) -> [f64; 2] {
        self.translate
    }

    /// Projects `[lon, lat]` in degrees. `None` when the result is not finite
    /// (e.g. latitudes beyond the poles or non-numeric input).
    pub fn project(&self, lon_deg: f64, lat_deg: f64) -> Option<Vec2> {
        let raw = raw_forward(wrap_lambda(lon_deg.to_radians()), lat_deg.to_radians());
        let out = Vec2::new(
            self.translate[0] + self.scale * (raw.x - self.center_raw.x),
            self.translate[1] - self.scale * (raw.y - self.center_raw.y),
        );
        out.is_finite().then_some(out)
    }

    /// Inverse of [`Mercator::project`], returning `[lon, lat]` in degrees.
    pub fn invert(&self, point: Vec2) -> Option<[f64; 2]> {
        if self.scale == 0.0 {
            return None;
        }
        let x = (point.x - self.translate[0]) / self.scale + self.center_raw.x;
        let y = (self.translate[1] - point.y) / self.scale + self.center_raw.y;
        let lambda = x;
        let phi = 2.0 * y.exp().atan() - FRAC_PI_2;
        let out = [lambda.to_degrees(), phi.to_degrees()];
        (out[0].is_finite() && out[1].is_finite()).then_some(out)
    }

    fn recenter(&mut self) {
        self.center_raw = raw_forward(
            wrap_lambda(self.center_deg[0].to_radians()),
            self.center_deg[1].to_radians(),
        );
    }
}

fn raw_forward(lambda: f64, phi: f64) -> Vec2 {
    Vec2::new(lambda, (FRAC_PI_4 + phi / 2.0).tan().ln())
}

fn wrap_lambda(lambda: f64) -> f64 {
    if lambda.abs() > PI {
        lambda - (lambda / TAU).round() * TAU
    } else {
        lambda
    }
}
