use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::{
    rendering::{common::Resolution, util::bind_group_builder::BindGroupBuilder},
    world::World,
};

/// Per-frame values every scene shader reads from group 0.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct GlobalUniformState {
    pub view_projection: [[f32; 4]; 4],
    pub light_view_projection: [[f32; 4]; 4],
    /// xyz eye position, w seconds since start.
    pub camera_position: [f32; 4],
    /// xyz unit vector towards the light, w 1.0 when shadows are on.
    pub light_direction: [f32; 4],
    /// rgb radiance, w size of one shadow map texel in uv units.
    pub light_radiance: [f32; 4],
    pub resolution: [f32; 2],
    pub near: f32,
    pub far: f32,
}

impl GlobalUniformState {
    pub fn new(world: &World, resolution: Resolution, shadow_map_size: u32, now: f32) -> Self {
        let camera = &world.camera;
        let light = &world.light;

        Self {
            view_projection: camera.get_vp_matrix().to_cols_array_2d(),
            light_view_projection: light.view_projection().to_cols_array_2d(),
            camera_position: camera.eye.extend(now).to_array(),
            light_direction: light
                .direction_to_light()
                .extend(if light.cast_shadow { 1.0 } else { 0.0 })
                .to_array(),
            light_radiance: light
                .radiance()
                .extend(1.0 / shadow_map_size.max(1) as f32)
                .to_array(),
            resolution: resolution.as_vec2().to_array(),
            near: camera.near,
            far: camera.far,
        }
    }
}

pub struct GlobalUniform {
    buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl GlobalUniform {
    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Global uniform buffer"),
            contents: bytemuck::cast_slice(&[GlobalUniformState::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let (bind_group_layout, bind_group) =
            BindGroupBuilder::new("Global uniform", wgpu::ShaderStages::VERTEX_FRAGMENT)
                .uniform(0, "Global uniform buffer", buffer.as_entire_binding())
                .build(device);

        Self {
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    pub fn update(&self, queue: &wgpu::Queue, state: GlobalUniformState) {
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[state]));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::viewport::Viewport;

    #[test]
    fn layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<GlobalUniformState>(), 192);
    }

    #[test]
    fn shadow_flag_follows_light() {
        let mut world = World::new(Viewport::new(800.0, 600.0, 1.0, 2.0));
        world.light.position = Vec3::new(0.0, 5.0, 5.0);
        let resolution = Resolution::new(800, 600);

        let state = GlobalUniformState::new(&world, resolution, 1024, 0.0);
        assert_eq!(state.light_direction[3], 0.0);
        assert_eq!(state.light_radiance[3], 1.0 / 1024.0);

        world.light.cast_shadow = true;
        let state = GlobalUniformState::new(&world, resolution, 1024, 2.5);
        assert_eq!(state.light_direction[3], 1.0);
        assert_eq!(state.camera_position[3], 2.5);
        assert_eq!(state.resolution, [800.0, 600.0]);
    }
}
