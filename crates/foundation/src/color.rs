/// RGB colour stored as linear-light `f32` components.
///
/// Hex inputs (`0xRRGGBB`, `#rrggbb`, `#rgb`) are treated as sRGB and
/// converted on the way in; [`Color::to_hex`] converts back.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Self = Self::linear(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::linear(1.0, 1.0, 1.0);

    pub const fn linear(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self::linear(srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b))
    }

    /// Parses `#rrggbb`, `#rgb` or the same without the leading `#`.
    pub fn parse(text: &str) -> Option<Self> {
        let digits = text.trim().trim_start_matches('#');
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match digits.len() {
            6 => u32::from_str_radix(digits, 16).ok().map(Self::from_hex),
            3 => {
                let short = u32::from_str_radix(digits, 16).ok()?;
                let r = (short >> 8) & 0xf;
                let g = (short >> 4) & 0xf;
                let b = short & 0xf;
                Some(Self::from_hex(((r * 17) << 16) | ((g * 17) << 8) | (b * 17)))
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> u32 {
        let r = to_byte(linear_to_srgb(self.r));
        let g = to_byte(linear_to_srgb(self.g));
        let b = to_byte(linear_to_srgb(self.b));
        (r << 16) | (g << 8) | b
    }

    /// `#rrggbb`, lowercase.
    pub fn to_hex_string(self) -> String {
        format!("#{:06x}", self.to_hex())
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

fn to_byte(c: f32) -> u32 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u32
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.077_399_38
    } else {
        (c * 0.947_867_3 + 0.052_132_7).powf(2.4)
    }
}

pub fn linear_to_srgb(c: f32) -> f32 {
    if c < 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(0.41666) - 0.055
    }
}

#[cfg(test)]
mod tests {
    use super::Color;

    #[test]
    fn hex_round_trips_through_linear_space() {
        for hex in [0x000000, 0xffffff, 0x0465bd, 0xf5f5dc, 0x87ceeb] {
            assert_eq!(Color::from_hex(hex).to_hex(), hex, "{hex:06x}");
        }
    }

    #[test]
    fn parses_css_hex_forms() {
        assert_eq!(Color::parse("#0465BD"), Some(Color::from_hex(0x0465bd)));
        assert_eq!(Color::parse("357bcb"), Some(Color::from_hex(0x357bcb)));
        assert_eq!(Color::parse("#fff"), Some(Color::from_hex(0xffffff)));
        assert_eq!(Color::parse("#12345"), None);
        assert_eq!(Color::parse("#zzzzzz"), None);
        assert_eq!(Color::parse("+12345"), None);
    }

    #[test]
    fn hex_string_is_lowercase_with_hash() {
        assert_eq!(Color::from_hex(0x3A7ABD).to_hex_string(), "#3a7abd");
    }
}
