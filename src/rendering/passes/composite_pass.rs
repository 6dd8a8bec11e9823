use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::{
    camera::Camera,
    effects::PostProcessSettings,
    rendering::{
        common::Resolution,
        passes::{
            begin_fullscreen_pass, fullscreen_pipeline,
            render_pass_context::{PassCreationContext, RenderPassContext},
        },
        render_common::RenderCommon,
        render_targets::RenderTargets,
        shader_loader::{PipelineId, ShaderDefinition},
        util::bind_group_builder::BindGroupBuilder,
    },
};

const SHADER_DEF: ShaderDefinition = ShaderDefinition {
    name: "Composite shader",
    path: "composite.wgsl",
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct CompositeUniform {
    /// focus distance, focal length, bokeh scale, unused
    pub depth_of_field: [f32; 4],
    /// xyz: hue rotation weights, w: saturation
    pub hue_saturation: [f32; 4],
    /// texel size, near, far
    pub texel_near_far: [f32; 4],
    pub bloom_intensity: f32,
    pub _padding: [f32; 3],
}

impl CompositeUniform {
    pub fn new(post: &PostProcessSettings, camera: &Camera, size: Resolution) -> Self {
        let dof = &post.depth_of_field;
        let texel = size.texel_size();

        Self {
            depth_of_field: [dof.focus_distance, dof.focal_length, dof.bokeh_scale, 0.0],
            hue_saturation: post
                .hue_saturation
                .hue_weights()
                .extend(post.hue_saturation.saturation)
                .to_array(),
            texel_near_far: [texel.x, texel.y, camera.near, camera.far],
            bloom_intensity: post.bloom.intensity,
            _padding: [0.0; 3],
        }
    }
}

/// Depth of field, bloom and colour grading in one fullscreen pass, from the
/// HDR target into the composite target.
pub struct CompositePass {
    pipeline_id: PipelineId,
    uniform_buffer: wgpu::Buffer,
    layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
}

impl CompositePass {
    pub fn new(context: &mut PassCreationContext, targets: &RenderTargets) -> Self {
        let device = context.device;

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Composite uniform"),
            contents: bytemuck::cast_slice(&[CompositeUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let builder = Self::builder(&context.common, &uniform_buffer, targets);
        let layout = builder.build_layout(device);
        let bind_group = builder.build_with_layout(device, &layout);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let pipeline_id = context.cache_builder.add_shader(
            SHADER_DEF,
            Box::new(move |device: &wgpu::Device, shader_module: &wgpu::ShaderModule| {
                fullscreen_pipeline(
                    device,
                    "Composite pipeline",
                    &pipeline_layout,
                    shader_module,
                    RenderTargets::COMPOSITE_FORMAT,
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
        BindGroupBuilder::new("Composite", wgpu::ShaderStages::FRAGMENT)
            .uniform(0, "Composite uniform", uniform_buffer.as_entire_binding())
            .texture(1, "HDR color", targets.hdr.view())
            .depth_texture(2, "Scene depth", targets.depth.view())
            .texture(3, "Bloom", targets.bloom[0].view())
            .sampler(4, "Linear sampler", &common.linear_sampler)
    }

    pub fn resize(&mut self, device: &wgpu::Device, common: &RenderCommon, targets: &RenderTargets) {
        self.bind_group =
            Self::builder(common, &self.uniform_buffer, targets).build_with_layout(device, &self.layout);
    }

    pub fn update(&self, queue: &wgpu::Queue, uniform: CompositeUniform) {
        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    pub fn render(&self, context: &mut RenderPassContext, targets: &RenderTargets) {
        let Some(pipeline) = context.pipeline_cache.get(self.pipeline_id) else {
            return;
        };

        let mut render_pass =
            begin_fullscreen_pass(context.encoder, "Composite pass", targets.composite.view());
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_is_std140_sized() {
        assert_eq!(std::mem::size_of::<CompositeUniform>(), 64);
    }

    #[test]
    fn packs_camera_planes_and_settings() {
        let mut post = PostProcessSettings::default();
        post.hue_saturation.saturation = -0.5;
        post.depth_of_field.bokeh_scale = 3.0;
        let camera = Camera::perspective(60.0, 2.0, 0.1, 50.0);

        let uniform = CompositeUniform::new(&post, &camera, Resolution::new(200, 100));

        assert_eq!(uniform.depth_of_field[2], 3.0);
        assert_eq!(uniform.hue_saturation[3], -0.5);
        assert_eq!(uniform.texel_near_far, [0.005, 0.01, 0.1, 50.0]);
        assert_eq!(uniform.bloom_intensity, post.bloom.intensity);
    }
}
