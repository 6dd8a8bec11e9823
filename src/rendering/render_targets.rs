use wgpu::TextureFormat;

use crate::rendering::{
    common::Resolution,
    texture::{DepthTexture, RenderTarget},
};

/// Offscreen targets between the scene pass and the final antialiasing pass.
pub struct RenderTargets {
    device: wgpu::Device,
    bloom_downscale: u32,

    /// Linear HDR scene color.
    pub hdr: RenderTarget,
    pub depth: DepthTexture,
    /// Ping-pong pair for the separable bloom blur, at reduced resolution.
    pub bloom: [RenderTarget; 2],
    /// Post-processed color, waiting for antialiasing.
    pub composite: RenderTarget,
}

impl RenderTargets {
    pub const HDR_FORMAT: TextureFormat = TextureFormat::Rgba16Float;
    pub const COMPOSITE_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

    pub fn new(device: &wgpu::Device, size: Resolution, bloom_downscale: u32) -> Self {
        let bloom_downscale = bloom_downscale.max(1);
        let bloom_size = size.scaled_down(bloom_downscale);

        Self {
            device: device.clone(),
            bloom_downscale,
            hdr: RenderTarget::new(device, size, Self::HDR_FORMAT, "HDR color"),
            depth: DepthTexture::new(device, size, "Scene depth"),
            bloom: [
                RenderTarget::new(device, bloom_size, Self::HDR_FORMAT, "Bloom A"),
                RenderTarget::new(device, bloom_size, Self::HDR_FORMAT, "Bloom B"),
            ],
            composite: RenderTarget::new(device, size, Self::COMPOSITE_FORMAT, "Composite"),
        }
    }

    pub fn size(&self) -> Resolution {
        self.hdr.size()
    }

    pub fn bloom_size(&self) -> Resolution {
        self.bloom[0].size()
    }

    pub fn resize(&mut self, size: Resolution) {
        let bloom_size = size.scaled_down(self.bloom_downscale);

        self.hdr.resize(&self.device, size);
        self.depth.resize(&self.device, size);
        for target in &mut self.bloom {
            target.resize(&self.device, bloom_size);
        }
        self.composite.resize(&self.device, size);
    }
}
