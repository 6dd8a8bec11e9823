use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::{util::DeviceExt, TexelCopyBufferLayout, TexelCopyTextureInfo, TextureDescriptor};

use crate::{
    asset_pipeline::materials::{ImageData, PbrMaterialData},
    material_manager::{MaterialId, MaterialManager},
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct PbrMaterialUniform {
    pub base_color_factor: [f32; 4],
    /// rgb emissive, a unused.
    pub emissive_factor: [f32; 4],
    /// metallic, roughness, normal scale, environment intensity.
    pub params: [f32; 4],
}

impl From<&PbrMaterialData> for PbrMaterialUniform {
    fn from(material: &PbrMaterialData) -> Self {
        Self {
            base_color_factor: material.base_color_factor.to_array(),
            emissive_factor: material.emissive_factor.extend(0.0).to_array(),
            params: [
                material.metallic,
                material.roughness,
                material.normal_scale,
                material.env_intensity,
            ],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureType {
    BaseColor,
    Normal,
    MetallicRoughness,
}

struct RenderMaterial {
    uniform_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    double_sided: bool,
}

/// Uploads materials and their textures; re-uploads factors whenever the
/// material manager's revision moves.
pub struct RenderMaterialManager {
    device: wgpu::Device,
    queue: wgpu::Queue,

    default_textures: [wgpu::TextureView; 3],
    // Keyed by the shared pixel allocation so images used by several materials
    // are uploaded once.
    textures: HashMap<(usize, TextureType), wgpu::TextureView>,
    materials: HashMap<MaterialId, RenderMaterial>,
    fallback: RenderMaterial,

    sampler: wgpu::Sampler,
    bind_group_layout: wgpu::BindGroupLayout,
    synced_revision: Option<u64>,
}

impl RenderMaterialManager {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let default_textures = [
            Self::create_default_texture(device, queue, TextureType::BaseColor),
            Self::create_default_texture(device, queue, TextureType::Normal),
            Self::create_default_texture(device, queue, TextureType::MetallicRoughness),
        ];

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            address_mode_w: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            lod_min_clamp: 0.0,
            lod_max_clamp: 32.0,
            compare: None,
            anisotropy_clamp: 1,
            border_color: None,
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                wgpu::BindGroupLayoutEntry {
                    binding: 4,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let fallback_data = PbrMaterialData::solid("Fallback", glam::Vec3::ONE);
        let fallback = Self::create_material(
            device,
            &bind_group_layout,
            &sampler,
            &fallback_data,
            [&default_textures[0], &default_textures[1], &default_textures[2]],
        );

        Self {
            device: device.clone(),
            queue: queue.clone(),
            default_textures,
            textures: HashMap::new(),
            materials: HashMap::new(),
            fallback,
            sampler,
            bind_group_layout,
            synced_revision: None,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    pub fn sync(&mut self, material_manager: &MaterialManager) {
        if self.synced_revision == Some(material_manager.revision()) {
            return;
        }

        for (id, material) in material_manager.iter() {
            match self.materials.get_mut(&id) {
                Some(existing) => {
                    self.queue.write_buffer(
                        &existing.uniform_buffer,
                        0,
                        bytemuck::cast_slice(&[PbrMaterialUniform::from(material)]),
                    );
                    existing.double_sided = material.double_sided;
                }
                None => {
                    let render_material = self.load_material(material);
                    self.materials.insert(id, render_material);
                }
            }
        }

        self.synced_revision = Some(material_manager.revision());
    }

    /// Bind group for `id`, or a plain white material when the primitive has
    /// none. Also returns whether back faces should be drawn.
    pub fn bind_group(&self, id: Option<MaterialId>) -> (&wgpu::BindGroup, bool) {
        let material = id
            .and_then(|id| self.materials.get(&id))
            .unwrap_or(&self.fallback);
        (&material.bind_group, material.double_sided)
    }

    fn load_material(&mut self, material: &PbrMaterialData) -> RenderMaterial {
        let base_color = self.texture_view(&material.name, TextureType::BaseColor, &material.base_color);
        let normal = self.texture_view(&material.name, TextureType::Normal, &material.normal);
        let metallic_roughness = self.texture_view(
            &material.name,
            TextureType::MetallicRoughness,
            &material.metallic_roughness,
        );

        log::debug!("Uploaded material {}", material.name);

        Self::create_material(
            &self.device,
            &self.bind_group_layout,
            &self.sampler,
            material,
            [&base_color, &normal, &metallic_roughness],
        )
    }

    fn create_material(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        material: &PbrMaterialData,
        [base_color, normal, metallic_roughness]: [&wgpu::TextureView; 3],
    ) -> RenderMaterial {
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Material uniform ({})", material.name)),
            contents: bytemuck::cast_slice(&[PbrMaterialUniform::from(material)]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Material bind group ({})", material.name)),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(base_color),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(normal),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(metallic_roughness),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });

        RenderMaterial {
            uniform_buffer,
            bind_group,
            double_sided: material.double_sided,
        }
    }

    fn texture_view(
        &mut self,
        name: &str,
        texture_type: TextureType,
        image: &Option<ImageData>,
    ) -> wgpu::TextureView {
        let Some(image) = image else {
            return self.default_textures[texture_type as usize].clone();
        };

        let key = (std::sync::Arc::as_ptr(&image.pixels) as usize, texture_type);
        if let Some(view) = self.textures.get(&key) {
            return view.clone();
        }

        let view = self.create_texture(name, texture_type, image);
        self.textures.insert(key, view.clone());
        view
    }

    fn create_texture(
        &self,
        name: &str,
        texture_type: TextureType,
        image: &ImageData,
    ) -> wgpu::TextureView {
        let label = format!("{name}({:?})", texture_type);

        let texture = self.device.create_texture_with_data(
            &self.queue,
            &TextureDescriptor {
                label: Some(&label),
                size: wgpu::Extent3d {
                    width: image.width,
                    height: image.height,
                    depth_or_array_layers: 1,
                },
                // TODO: Generate mipmaps
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: get_texture_format_from_type(texture_type),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::wgt::TextureDataOrder::default(),
            &image.pixels,
        );

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn create_default_texture(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture_type: TextureType,
    ) -> wgpu::TextureView {
        let label = format!("Default Texture ({:?})", texture_type);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: get_texture_format_from_type(texture_type),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        // Neutral values: the material factors alone decide the look.
        let placeholder_data: [u8; 4] = match texture_type {
            TextureType::BaseColor => [255, 255, 255, 255],
            TextureType::Normal => [128, 128, 255, 255],
            TextureType::MetallicRoughness => [0, 255, 255, 255],
        };

        queue.write_texture(
            TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &placeholder_data,
            TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        texture.create_view(&wgpu::TextureViewDescriptor::default())
    }
}

fn get_texture_format_from_type(texture_type: TextureType) -> wgpu::TextureFormat {
    match texture_type {
        TextureType::BaseColor => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureType::Normal => wgpu::TextureFormat::Rgba8Unorm,
        TextureType::MetallicRoughness => wgpu::TextureFormat::Rgba8Unorm,
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn uniform_packs_factors() {
        let mut material = PbrMaterialData::solid("gold", Vec3::new(1.0, 0.8, 0.2));
        material.metallic = 1.0;
        material.roughness = 0.25;
        material.env_intensity = 0.15;

        let uniform = PbrMaterialUniform::from(&material);
        assert_eq!(uniform.base_color_factor, [1.0, 0.8, 0.2, 1.0]);
        assert_eq!(uniform.params, [1.0, 0.25, 1.0, 0.15]);
        assert_eq!(std::mem::size_of::<PbrMaterialUniform>(), 48);
    }
}
