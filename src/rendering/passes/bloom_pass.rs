use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use wgpu::util::DeviceExt;

use crate::{
    effects::Bloom,
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

const THRESHOLD_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Bloom threshold shader",
    path: "bloom_threshold.wgsl",
};

const BLUR_SHADER: ShaderDefinition = ShaderDefinition {
    name: "Bloom blur shader",
    path: "bloom_blur.wgsl",
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable, PartialEq)]
pub struct BloomUniform {
    /// Offset between blur taps in uv units; zero for the threshold step.
    pub step: [f32; 2],
    pub luminance_threshold: f32,
    pub luminance_smoothing: f32,
}

impl BloomUniform {
    pub fn threshold(bloom: &Bloom) -> Self {
        Self {
            step: [0.0; 2],
            luminance_threshold: bloom.luminance_threshold,
            luminance_smoothing: bloom.luminance_smoothing,
        }
    }

    pub fn blur(direction: Vec2, size: Resolution) -> Self {
        Self {
            step: (direction * size.texel_size()).to_array(),
            luminance_threshold: 0.0,
            luminance_smoothing: 0.0,
        }
    }
}

struct BloomStep {
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

/// Bright-pass filter followed by a separable blur, at reduced resolution.
/// The result ends up in `targets.bloom[0]`.
pub struct BloomPass {
    threshold_pipeline: PipelineId,
    blur_pipeline: PipelineId,
    layout: wgpu::BindGroupLayout,
    // Threshold (hdr -> A), horizontal blur (A -> B), vertical blur (B -> A).
    steps: [BloomStep; 3],
}

impl BloomPass {
    pub fn new(context: &mut PassCreationContext, targets: &RenderTargets) -> Self {
        let device = context.device;
        let common = &context.common;

        let uniforms = [0, 1, 2].map(|index| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Bloom uniform {index}")),
                contents: bytemuck::cast_slice(&[BloomUniform::zeroed()]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            })
        });

        let layout = Self::step_builder(common, &uniforms[0], targets.hdr.view()).build_layout(device);
        let steps = Self::create_steps(device, common, &layout, uniforms, targets);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Bloom pipeline layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });

        let threshold_layout = pipeline_layout.clone();
        let threshold_pipeline = context.cache_builder.add_shader(
            THRESHOLD_SHADER,
            Box::new(move |device: &wgpu::Device, shader_module: &wgpu::ShaderModule| {
                fullscreen_pipeline(
                    device,
                    "Bloom threshold pipeline",
                    &threshold_layout,
                    shader_module,
                    RenderTargets::HDR_FORMAT,
                )
            }),
        );

        let blur_pipeline = context.cache_builder.add_shader(
            BLUR_SHADER,
            Box::new(move |device: &wgpu::Device, shader_module: &wgpu::ShaderModule| {
                fullscreen_pipeline(
                    device,
                    "Bloom blur pipeline",
                    &pipeline_layout,
                    shader_module,
                    RenderTargets::HDR_FORMAT,
                )
            }),
        );

        Self {
            threshold_pipeline,
            blur_pipeline,
            layout,
            steps,
        }
    }

    fn step_builder<'a>(
        common: &'a RenderCommon,
        uniform: &'a wgpu::Buffer,
        source: &'a wgpu::TextureView,
    ) -> BindGroupBuilder<'a> {
        BindGroupBuilder::new("Bloom step", wgpu::ShaderStages::FRAGMENT)
            .uniform(0, "Bloom uniform", uniform.as_entire_binding())
            .texture(1, "Bloom source", source)
            .sampler(2, "Linear sampler", &common.linear_sampler)
    }

    fn sources(targets: &RenderTargets) -> [&wgpu::TextureView; 3] {
        [
            targets.hdr.view(),
            targets.bloom[0].view(),
            targets.bloom[1].view(),
        ]
    }

    fn create_steps(
        device: &wgpu::Device,
        common: &RenderCommon,
        layout: &wgpu::BindGroupLayout,
        uniforms: [wgpu::Buffer; 3],
        targets: &RenderTargets,
    ) -> [BloomStep; 3] {
        let mut sources = Self::sources(targets).into_iter();
        uniforms.map(|uniform| {
            let source = sources.next().unwrap_or(targets.hdr.view());
            let bind_group =
                Self::step_builder(common, &uniform, source).build_with_layout(device, layout);
            BloomStep {
                uniform,
                bind_group,
            }
        })
    }

    /// Render targets were recreated; point the steps at the new views.
    pub fn resize(&mut self, device: &wgpu::Device, common: &RenderCommon, targets: &RenderTargets) {
        for (step, source) in self.steps.iter_mut().zip(Self::sources(targets)) {
            step.bind_group =
                Self::step_builder(common, &step.uniform, source).build_with_layout(device, &self.layout);
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, bloom: &Bloom, bloom_size: Resolution) {
        let values = [
            BloomUniform::threshold(bloom),
            BloomUniform::blur(Vec2::X, bloom_size),
            BloomUniform::blur(Vec2::Y, bloom_size),
        ];

        for (step, value) in self.steps.iter().zip(values) {
            queue.write_buffer(&step.uniform, 0, bytemuck::cast_slice(&[value]));
        }
    }

    pub fn render(&self, context: &mut RenderPassContext, targets: &RenderTargets) {
        let (Some(threshold), Some(blur)) = (
            context.pipeline_cache.get(self.threshold_pipeline),
            context.pipeline_cache.get(self.blur_pipeline),
        ) else {
            return;
        };

        let outputs = [
            (threshold, targets.bloom[0].view(), "Bloom threshold"),
            (blur, targets.bloom[1].view(), "Bloom blur (horizontal)"),
            (blur, targets.bloom[0].view(), "Bloom blur (vertical)"),
        ];

        for (step, (pipeline, output, label)) in self.steps.iter().zip(outputs) {
            let mut render_pass = begin_fullscreen_pass(context.encoder, label, output);
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &step.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_steps_are_one_texel() {
        let size = Resolution::new(640, 360);
        assert_eq!(BloomUniform::blur(Vec2::X, size).step, [1.0 / 640.0, 0.0]);
        assert_eq!(BloomUniform::blur(Vec2::Y, size).step, [0.0, 1.0 / 360.0]);
    }

    #[test]
    fn threshold_step_carries_bloom_settings() {
        let uniform = BloomUniform::threshold(&Bloom::default());
        assert_eq!(uniform.step, [0.0, 0.0]);
        assert_eq!(uniform.luminance_threshold, 0.7);
        assert_eq!(uniform.luminance_smoothing, 0.03);
    }
}
