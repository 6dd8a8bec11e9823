//! Parameters of the post-processing chain. The vignettes write these; the
//! composite and antialiasing passes read them every frame.

use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthOfField {
    /// Normalized distance between the near and far planes that is in focus.
    pub focus_distance: f32,
    /// Normalized depth range around the focus distance that stays sharp.
    pub focal_length: f32,
    pub bokeh_scale: f32,
}

impl Default for DepthOfField {
    fn default() -> Self {
        Self {
            focus_distance: 0.02,
            focal_length: 0.2,
            bokeh_scale: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bloom {
    pub intensity: f32,
    pub luminance_threshold: f32,
    pub luminance_smoothing: f32,
}

impl Default for Bloom {
    fn default() -> Self {
        Self {
            intensity: 1.2,
            luminance_threshold: 0.7,
            luminance_smoothing: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HueSaturation {
    /// Hue rotation in radians.
    pub hue: f32,
    /// In `[-1, 1]`; negative values desaturate.
    pub saturation: f32,
}

impl HueSaturation {
    /// Weights of the hue rotation; the shader mixes channels as
    /// `(dot(c, w.xyz), dot(c, w.zxy), dot(c, w.yzx))`.
    pub fn hue_weights(&self) -> Vec3 {
        let (s, c) = self.hue.sin_cos();
        let sqrt3 = 3.0_f32.sqrt();
        (Vec3::new(2.0 * c, -sqrt3 * s - c, sqrt3 * s - c) + Vec3::ONE) / 3.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fxaa {
    pub resolution: Vec2,
}

impl Default for Fxaa {
    fn default() -> Self {
        Self {
            resolution: Vec2::ONE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PostProcessSettings {
    pub depth_of_field: DepthOfField,
    pub bloom: Bloom,
    pub hue_saturation: HueSaturation,
    pub fxaa: Fxaa,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_hue_is_identity() {
        let weights = HueSaturation::default().hue_weights();
        assert!((weights - Vec3::X).abs().max_element() < 1e-6);
    }

    #[test]
    fn hue_weights_preserve_grey() {
        let weights = HueSaturation {
            hue: -0.3,
            saturation: 0.0,
        }
        .hue_weights();
        assert!((weights.x + weights.y + weights.z - 1.0).abs() < 1e-6);
    }
}
