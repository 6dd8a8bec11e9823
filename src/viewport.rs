use glam::Vec2;
use winit::dpi::PhysicalSize;

use crate::rendering::common::Resolution;

/// Window size in logical pixels plus the device pixel ratio. Everything that
/// depends on the output size is derived from this.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
    max_pixel_ratio: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32, max_pixel_ratio: f32) -> Self {
        Self {
            width: width.max(1.0),
            height: height.max(1.0),
            device_pixel_ratio,
            max_pixel_ratio,
        }
    }

    pub fn from_physical(size: PhysicalSize<u32>, scale_factor: f64, max_pixel_ratio: f32) -> Self {
        let scale_factor = scale_factor as f32;
        Self::new(
            size.width as f32 / scale_factor,
            size.height as f32 / scale_factor,
            scale_factor,
            max_pixel_ratio,
        )
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio.min(self.max_pixel_ratio)
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }

    /// Size of the offscreen targets the scene and the effect chain render into.
    pub fn render_size(&self) -> Resolution {
        let ratio = self.pixel_ratio();
        Resolution::new(
            ((self.width * ratio).round() as u32).max(1),
            ((self.height * ratio).round() as u32).max(1),
        )
    }

    /// One texel of the render targets, as the antialiasing pass expects it.
    pub fn fxaa_resolution(&self) -> Vec2 {
        let ratio = self.pixel_ratio();
        Vec2::new(
            1.0 / (self.width * ratio),
            1.0 / (self.height * ratio),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_ratio_is_capped_at_two() {
        assert_eq!(Viewport::new(800.0, 600.0, 1.0, 2.0).pixel_ratio(), 1.0);
        assert_eq!(Viewport::new(800.0, 600.0, 1.5, 2.0).pixel_ratio(), 1.5);
        assert_eq!(Viewport::new(800.0, 600.0, 3.0, 2.0).pixel_ratio(), 2.0);
    }

    #[test]
    fn fxaa_resolution_is_inverse_render_size() {
        let viewport = Viewport::new(1280.0, 720.0, 3.0, 2.0);
        let resolution = viewport.fxaa_resolution();
        assert_eq!(resolution, Vec2::new(1.0 / 2560.0, 1.0 / 1440.0));

        let viewport = Viewport::new(1000.0, 500.0, 1.0, 2.0);
        assert_eq!(viewport.fxaa_resolution(), Vec2::new(1.0 / 1000.0, 1.0 / 500.0));
    }

    #[test]
    fn from_physical_recovers_logical_size() {
        let viewport = Viewport::from_physical(PhysicalSize::new(2560, 1440), 2.0, 2.0);
        assert_eq!(viewport.width, 1280.0);
        assert_eq!(viewport.height, 720.0);
        assert_eq!(viewport.aspect(), 1280.0 / 720.0);
        assert_eq!(viewport.render_size(), Resolution::new(2560, 1440));
    }

    #[test]
    fn high_dpi_renders_below_physical_size() {
        let viewport = Viewport::from_physical(PhysicalSize::new(3000, 1500), 3.0, 2.0);
        assert_eq!(viewport.render_size(), Resolution::new(2000, 1000));
    }
}
