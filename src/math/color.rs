use glam::Vec3;

/// Linear-space RGB color. Hex constructors take sRGB values, matching how
/// colors are authored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color(pub Vec3);

impl Color {
    pub const BLACK: Color = Color(Vec3::ZERO);
    pub const WHITE: Color = Color(Vec3::ONE);

    pub fn from_srgb_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;

        Color(Vec3::new(
            srgb_to_linear(r),
            srgb_to_linear(g),
            srgb_to_linear(b),
        ))
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        Color(self.0.lerp(other.0, t))
    }

    pub fn distance(self, other: Color) -> f32 {
        self.0.distance(other.0)
    }

    pub fn to_array(self) -> [f32; 4] {
        self.0.extend(1.0).to_array()
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        wgpu::Color {
            r: self.0.x as f64,
            g: self.0.y as f64,
            b: self.0.z as f64,
            a: 1.0,
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c < 0.04045 {
        c * 0.0773993808
    } else {
        (c * 0.9478672986 + 0.0521327014).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_endpoints_are_exact() {
        assert_eq!(Color::from_srgb_hex(0x000000), Color::BLACK);
        let white = Color::from_srgb_hex(0xffffff);
        assert!((white.0 - Vec3::ONE).abs().max_element() < 1e-5);
    }

    #[test]
    fn lerp_hits_both_ends() {
        let a = Color::from_srgb_hex(0x121212);
        let b = Color::from_srgb_hex(0x2a0808);
        assert_eq!(a.lerp(b, 0.0), a);
        assert!(a.lerp(b, 1.0).distance(b) < 1e-6);
    }
}
