use std::sync::Arc;

use wgpu::{TexelCopyBufferLayout, TexelCopyTextureInfo};

use crate::asset_pipeline::environment::{EnvironmentMap, EnvironmentMip};

pub const ENVIRONMENT_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgb9e5Ufloat;

/// The prefiltered panorama on the GPU. Until a scene sets one, a black 1x1
/// texture stands in so the lighting bind group is always complete.
pub struct EnvironmentTexture {
    view: wgpu::TextureView,
    revision: Option<u64>,
}

impl EnvironmentTexture {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let placeholder = EnvironmentMap {
            mips: vec![EnvironmentMip {
                width: 1,
                height: 1,
                texels: vec![0],
            }],
        };

        Self {
            view: upload(device, queue, &placeholder, "Placeholder environment"),
            revision: None,
        }
    }

    /// Uploads the world's environment if it changed. Returns true when the view
    /// was replaced and bind groups using it must be rebuilt.
    pub fn sync(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        environment: Option<(&Arc<EnvironmentMap>, u64)>,
    ) -> bool {
        let Some((environment, revision)) = environment else {
            return false;
        };
        if self.revision == Some(revision) || environment.mips.is_empty() {
            return false;
        }

        self.view = upload(device, queue, environment, "Environment");
        self.revision = Some(revision);

        let (width, height) = environment.base_size();
        log::info!(
            "Uploaded environment {}x{} with {} mips",
            width,
            height,
            environment.mips.len()
        );

        true
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    environment: &EnvironmentMap,
    label: &str,
) -> wgpu::TextureView {
    let (width, height) = environment.base_size();

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: environment.mips.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: ENVIRONMENT_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (level, mip) in environment.mips.iter().enumerate() {
        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&mip.texels),
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(mip.width * 4),
                rows_per_image: Some(mip.height),
            },
            wgpu::Extent3d {
                width: mip.width,
                height: mip.height,
                depth_or_array_layers: 1,
            },
        );
    }

    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
