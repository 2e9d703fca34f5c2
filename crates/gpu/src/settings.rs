use formats::RendererConfig;
use foundation::Color;

/// MSAA sample count used when antialiasing is on.
pub const MSAA_SAMPLES: u32 = 4;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RendererSettings {
    pub sample_count: u32,
    pub max_pixel_ratio: f64,
    pub exposure: f32,
    /// Transparent canvas allowed behind the scene.
    pub alpha: bool,
    /// Used when the scene has no background of its own.
    pub clear_color: Color,
}

impl RendererSettings {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            sample_count: if config.antialias { MSAA_SAMPLES } else { 1 },
            max_pixel_ratio: config.max_pixel_ratio,
            exposure: config.tone_mapping_exposure as f32,
            alpha: config.alpha,
            clear_color: Color::from_hex(config.clear_color),
        }
    }

    pub fn effective_pixel_ratio(&self, device_ratio: f64) -> f64 {
        if !device_ratio.is_finite() || device_ratio <= 0.0 {
            return 1.0_f64.min(self.max_pixel_ratio);
        }
        device_ratio.min(self.max_pixel_ratio)
    }

    /// Backing-store size for a CSS-pixel canvas.
    pub fn surface_size(&self, css_width: f64, css_height: f64, device_ratio: f64) -> (u32, u32) {
        let ratio = self.effective_pixel_ratio(device_ratio);
        let px = |v: f64| (v.max(0.0) * ratio).round().max(1.0) as u32;
        (px(css_width), px(css_height))
    }
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self::from_config(&RendererConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::{MSAA_SAMPLES, RendererSettings};
    use formats::RendererConfig;

    #[test]
    fn pixel_ratio_is_capped() {
        let s = RendererSettings::default();
        assert_eq!(s.effective_pixel_ratio(3.0), 2.0);
        assert_eq!(s.effective_pixel_ratio(1.5), 1.5);
        assert_eq!(s.effective_pixel_ratio(f64::NAN), 1.0);
        assert_eq!(s.surface_size(800.0, 600.0, 3.0), (1600, 1200));
        assert_eq!(s.surface_size(0.0, 0.0, 1.0), (1, 1));
    }

    #[test]
    fn antialias_selects_msaa() {
        let on = RendererSettings::from_config(&RendererConfig::default());
        assert_eq!(on.sample_count, MSAA_SAMPLES);
        assert_eq!(on.exposure, 1.25);

        let off = RendererSettings::from_config(&RendererConfig {
            antialias: false,
            ..RendererConfig::default()
        });
        assert_eq!(off.sample_count, 1);
    }
}
