use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::rendering::{
    passes::{
        begin_fullscreen_pass, fullscreen_pipeline,
        render_pass_context::{PassCreationContext, RenderPassContext},
    },
    render_common::RenderCommon,
    render_targets::RenderTargets,
    shader_loader::{PipelineId, ShaderDefinition},
    util::bind_group_builder::BindGroupBuilder,
};

const SHADER_DEF: ShaderDefinition = ShaderDefinition {
    name: "FXAA shader",
    path: "fxaa.wgsl",
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct FxaaUniform {
    resolution: [f32; 2],
    _padding: [f32; 2],
}

/// Antialiases the composite target onto the window surface.
pub struct FxaaPass {
    pipeline_id: PipelineId,
    uniform_buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl FxaaPass {
    pub fn new(context: &mut PassCreationContext, targets: &RenderTargets) -> Self {
        let device = context.device;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("FXAA uniform"),
            contents: bytemuck::cast_slice(&[FxaaUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let builder = Self::builder(&context.common, &uniform_buffer, targets);
        let layout = builder.build_layout(device);
        let bind_group = builder.build_with_layout(device, &layout);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("FXAA pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let output_format = context.common.output_format;
        let pipeline_id = context.cache_builder.add_shader(
            SHADER_DEF,
            Box::new(move |device: &wgpu::Device, shader_module: &wgpu::ShaderModule| {
                fullscreen_pipeline(
                    device,
                    "FXAA pipeline",
                    &pipeline_layout,
                    shader_module,
                    output_format,
                )
            }),
        );

        Self {
            pipeline_id,
            uniform_buffer,
            layout,
            bind_group,
        }
    }

    fn builder<'a>(
        common: &'a RenderCommon,
        uniform_buffer: &'a wgpu::Buffer,
        targets: &'a RenderTargets,
    ) -> BindGroupBuilder<'a> {
        BindGroupBuilder::new("FXAA", wgpu::ShaderStages::FRAGMENT)
            .uniform(0, "FXAA uniform", uniform_buffer.as_entire_binding())
            .texture(1, "Composite", targets.composite.view())
            .sampler(2, "Linear sampler", &common.linear_sampler)
    }

    pub fn resize(&mut self, device: &wgpu::Device, common: &RenderCommon, targets: &RenderTargets) {
        self.bind_group =
            Self::builder(common, &self.uniform_buffer, targets).build_with_layout(device, &self.layout);
    }

    /// `resolution` is the size of one source texel in uv units.
    pub fn update(&self, queue: &wgpu::Queue, resolution: Vec2) {
        let uniform = FxaaUniform {
            resolution: resolution.to_array(),
            _padding: [0.0; 2],
        };
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn render(&self, context: &mut RenderPassContext, output: &wgpu::TextureView) {
        let Some(pipeline) = context.pipeline_cache.get(self.pipeline_id) else {
            return;
        };

        let mut render_pass = begin_fullscreen_pass(context.encoder, "FXAA pass", output);
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}
