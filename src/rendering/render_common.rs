use std::sync::RwLock;

use anyhow::Context;
use wgpu::SurfaceConfiguration;

use crate::rendering::{
    common::Resolution,
    global_uniform::GlobalUniform,
    texture::linear_clamp_sampler,
};

/// Resources shared by every pass.
pub struct RenderCommon {
    pub output_surface_config: RwLock<SurfaceConfiguration>,
    pub output_format: wgpu::TextureFormat,
    pub global_uniform: GlobalUniform,
    pub linear_sampler: wgpu::Sampler,
}

impl RenderCommon {
    pub fn new(
        device: &wgpu::Device,
        adapter: &wgpu::Adapter,
        surface: &wgpu::Surface,
        size: Resolution,
    ) -> anyhow::Result<Self> {
        let surface_caps = surface.get_capabilities(adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .context("Surface reports no supported formats")?;

        let output_surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(device, &output_surface_config);

        Ok(Self {
            output_surface_config: RwLock::new(output_surface_config),
            output_format: surface_format,
            global_uniform: GlobalUniform::new(device),
            linear_sampler: linear_clamp_sampler(device, "Linear clamp sampler"),
        })
    }
}
