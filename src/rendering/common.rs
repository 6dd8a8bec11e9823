use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    pub fn scaled_down(&self, divisor: u32) -> Resolution {
        Resolution::new(self.width / divisor, self.height / divisor)
    }

    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn texel_size(&self) -> Vec2 {
        Vec2::ONE / self.as_vec2()
    }

    pub fn to_extent3d(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        }
    }
}

pub trait PhysicalSizeExt {
    fn to_resolution(&self) -> Resolution;
}

impl PhysicalSizeExt for winit::dpi::PhysicalSize<u32> {
    fn to_resolution(&self) -> Resolution {
        Resolution::new(self.width, self.height)
    }
}
