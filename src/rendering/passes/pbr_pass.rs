use id_arena::Arena;
use wgpu::{
    DepthBiasState, Device, MultisampleState, PipelineCompilationOptions, RenderPassDescriptor,
    StencilState,
};

use crate::{
    math::color::Color,
    rendering::{
        passes::render_pass_context::{PassCreationContext, RenderPassContext},
        render_material_manager::RenderMaterialManager,
        render_model::{model_primitive_state, RenderModel, RENDER_MODEL_VBL},
        render_object::RenderObjects,
        render_targets::RenderTargets,
        shader_loader::{PipelineId, ShaderDefinition},
        texture::DepthTexture,
        util::bind_group_builder::BindGroupBuilder,
    },
};

const PBR_SHADER: ShaderDefinition = ShaderDefinition {
    name: "PBR shader",
    path: "pbr.wgsl",
};

/// Views the lighting bind group samples from.
pub struct LightingViews<'a> {
    pub shadow_map: &'a wgpu::TextureView,
    pub shadow_sampler: &'a wgpu::Sampler,
    pub environment: &'a wgpu::TextureView,
}

/// Forward metallic-roughness shading into the HDR target: one directional
/// light with PCF shadows plus image-based light from the environment mips.
pub struct PbrPass {
    single_sided_pipeline: PipelineId,
    double_sided_pipeline: PipelineId,
    lighting_layout: wgpu::BindGroupLayout,
    lighting_bind_group: wgpu::BindGroup,
    environment_sampler: wgpu::Sampler,
}

impl PbrPass {
    pub fn new(
        context: &mut PassCreationContext,
        objects: &RenderObjects,
        materials: &RenderMaterialManager,
        lighting: LightingViews,
    ) -> Self {
        let device = context.device;

        // Wraps around the panorama horizontally, clamps at the poles.
        let environment_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let builder = Self::lighting_builder(&lighting, &environment_sampler);
        let lighting_layout = builder.build_layout(device);
        let lighting_bind_group = builder.build_with_layout(device, &lighting_layout);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("PBR pipeline layout"),
            bind_group_layouts: &[
                &context.common.global_uniform.bind_group_layout,
                objects.bind_group_layout(),
                materials.bind_group_layout(),
                &lighting_layout,
            ],
            push_constant_ranges: &[],
        });

        let single_sided_pipeline = context.cache_builder.add_shader(
            PBR_SHADER,
            Self::pipeline_factory(pipeline_layout.clone(), Some(wgpu::Face::Back)),
        );
        let double_sided_pipeline = context
            .cache_builder
            .add_shader(PBR_SHADER, Self::pipeline_factory(pipeline_layout, None));

        PbrPass {
            single_sided_pipeline,
            double_sided_pipeline,
            lighting_layout,
            lighting_bind_group,
            environment_sampler,
        }
    }

    fn lighting_builder<'a>(
        lighting: &LightingViews<'a>,
        environment_sampler: &'a wgpu::Sampler,
    ) -> BindGroupBuilder<'a> {
        BindGroupBuilder::new("Lighting", wgpu::ShaderStages::FRAGMENT)
            .depth_texture(0, "Shadow map", lighting.shadow_map)
            .comparison_sampler(1, "Shadow sampler", lighting.shadow_sampler)
            .texture(2, "Environment", lighting.environment)
            .sampler(3, "Environment sampler", environment_sampler)
    }

    fn pipeline_factory(
        layout: wgpu::PipelineLayout,
        cull_mode: Option<wgpu::Face>,
    ) -> crate::rendering::shader_loader::PipelineFactory {
        Box::new(move |device: &Device, shader_module: &wgpu::ShaderModule| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(if cull_mode.is_some() {
                    "PBR pipeline"
                } else {
                    "PBR pipeline (double sided)"
                }),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: shader_module,
                    entry_point: Some("vs_main"),
                    buffers: &[RENDER_MODEL_VBL],
                    compilation_options: PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: shader_module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: RenderTargets::HDR_FORMAT,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: PipelineCompilationOptions::default(),
                }),
                primitive: model_primitive_state(cull_mode),
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DepthTexture::DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: StencilState::default(),
                    bias: DepthBiasState::default(),
                }),
                multisample: MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })
    }

    /// Rebinds the shadow map and environment after either was recreated.
    pub fn set_lighting(&mut self, device: &wgpu::Device, lighting: LightingViews) {
        self.lighting_bind_group = Self::lighting_builder(&lighting, &self.environment_sampler)
            .build_with_layout(device, &self.lighting_layout);
    }

    pub fn render(
        &self,
        context: &mut RenderPassContext,
        targets: &RenderTargets,
        background: Color,
        objects: &RenderObjects,
        models: &Arena<RenderModel>,
        materials: &RenderMaterialManager,
    ) {
        let mut render_pass = context.encoder.begin_render_pass(&RenderPassDescriptor {
            label: Some("PBR pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: targets.hdr.view(),
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(background.to_wgpu()),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: targets.depth.view(),
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let (Some(single_sided), Some(double_sided)) = (
            context.pipeline_cache.get(self.single_sided_pipeline),
            context.pipeline_cache.get(self.double_sided_pipeline),
        ) else {
            return;
        };

        render_pass.set_bind_group(0, &context.common.global_uniform.bind_group, &[]);
        render_pass.set_bind_group(3, &self.lighting_bind_group, &[]);

        for item in objects.draw_list() {
            let (Some(object_bind_group), Some(model)) =
                (objects.bind_group(item.object), models.get(item.model))
            else {
                continue;
            };
            render_pass.set_bind_group(1, object_bind_group, &[]);

            for primitive in &model.primitives {
                let (material_bind_group, double_sided_material) =
                    materials.bind_group(primitive.material);

                render_pass.set_pipeline(if double_sided_material {
                    double_sided
                } else {
                    single_sided
                });
                render_pass.set_bind_group(2, material_bind_group, &[]);
                primitive.draw(&mut render_pass);
            }
        }
    }
}
