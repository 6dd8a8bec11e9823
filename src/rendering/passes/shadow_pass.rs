use id_arena::Arena;
use wgpu::{PipelineCompilationOptions, RenderPassDescriptor};

use crate::{
    lighting::DirectionalLight,
    rendering::{
        common::Resolution,
        passes::render_pass_context::{PassCreationContext, RenderPassContext},
        render_model::{model_primitive_state, RenderModel, RENDER_MODEL_VBL},
        render_object::{draw_objects, RenderObjects},
        shader_loader::{PipelineId, ShaderDefinition},
        texture::DepthTexture,
    },
};

const SHADER_DEF: ShaderDefinition = ShaderDefinition {
    name: "Shadow map shader",
    path: "shadow.wgsl",
};

/// Renders shadow casters into the light's depth map.
pub struct ShadowPass {
    device: wgpu::Device,
    max_size: u32,
    size: u32,
    pipeline_id: PipelineId,
    map: DepthTexture,
    sampler: wgpu::Sampler,
}

impl ShadowPass {
    pub fn new(
        context: &mut PassCreationContext,
        objects: &RenderObjects,
        light: &DirectionalLight,
    ) -> Self {
        let device = context.device;
        let max_size = context.config.max_shadow_map_size;
        let size = light.shadow.map_size.clamp(1, max_size);

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow pass pipeline layout"),
            bind_group_layouts: &[
                &context.common.global_uniform.bind_group_layout,
                objects.bind_group_layout(),
            ],
            push_constant_ranges: &[],
        });

        let pipeline_id = context.cache_builder.add_shader(
            SHADER_DEF,
            Box::new(move |device: &wgpu::Device, shader_module: &wgpu::ShaderModule| {
                device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("Shadow pass pipeline"),
                    layout: Some(&layout),
                    vertex: wgpu::VertexState {
                        module: shader_module,
                        entry_point: Some("vs_main"),
                        buffers: &[RENDER_MODEL_VBL],
                        compilation_options: PipelineCompilationOptions::default(),
                    },
                    fragment: None,
                    primitive: model_primitive_state(None),
                    depth_stencil: Some(wgpu::DepthStencilState {
                        format: DepthTexture::DEPTH_FORMAT,
                        depth_write_enabled: true,
                        depth_compare: wgpu::CompareFunction::LessEqual,
                        stencil: wgpu::StencilState::default(),
                        bias: wgpu::DepthBiasState {
                            constant: 2,
                            slope_scale: 2.0,
                            clamp: 0.0,
                        },
                    }),
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                })
            }),
        );

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow map sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        Self {
            device: device.clone(),
            max_size,
            size,
            pipeline_id,
            map: Self::create_map(device, size),
            sampler,
        }
    }

    fn create_map(device: &wgpu::Device, size: u32) -> DepthTexture {
        DepthTexture::new(device, Resolution::new(size, size), "Shadow map")
    }

    /// Follows changes to the light's map size. Returns true when the map was
    /// recreated.
    pub fn prepare(&mut self, light: &DirectionalLight) -> bool {
        let size = light.shadow.map_size.clamp(1, self.max_size);
        if size == self.size {
            return false;
        }

        log::debug!("Shadow map resized to {size}");
        self.size = size;
        self.map = Self::create_map(&self.device, size);
        true
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn map_view(&self) -> &wgpu::TextureView {
        self.map.view()
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Always clears the map; draws casters only when the light casts shadows.
    pub fn render(
        &self,
        context: &mut RenderPassContext,
        light: &DirectionalLight,
        objects: &RenderObjects,
        models: &Arena<RenderModel>,
    ) {
        let mut render_pass = context.encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("Shadow pass"),
            color_attachments: &[],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: self.map.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        if !light.cast_shadow {
            return;
        }
        let Some(pipeline) = context.pipeline_cache.get(self.pipeline_id) else {
            return;
        };

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &context.common.global_uniform.bind_group, &[]);

        let casters = objects.draw_list().iter().filter(|item| item.cast_shadow);
        draw_objects(&mut render_pass, objects, models, casters, 1);
    }
}
