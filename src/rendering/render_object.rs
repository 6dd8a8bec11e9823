use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use id_arena::Arena;
use wgpu::util::DeviceExt;

use crate::{
    rendering::render_model::{RenderModel, RenderModelId},
    scene_graph::{ObjectId, Scene},
};

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct ObjectUniform {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub skinned: u32,
    pub receive_shadow: u32,
    _padding: [u32; 2],
}

impl ObjectUniform {
    pub fn new(world_matrix: Mat4, skinned: bool, receive_shadow: bool) -> Self {
        // Skinned vertices come out of the joint palette in world space already.
        let model = if skinned { Mat4::IDENTITY } else { world_matrix };

        Self {
            model: model.to_cols_array_2d(),
            normal: model.inverse().transpose().to_cols_array_2d(),
            skinned: skinned as u32,
            receive_shadow: receive_shadow as u32,
            _padding: [0; 2],
        }
    }
}

struct RenderObject {
    uniform_buffer: wgpu::Buffer,
    joint_buffer: wgpu::Buffer,
    joint_capacity: usize,
    bind_group: wgpu::BindGroup,
}

impl RenderObject {
    fn new(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        name: &str,
        joint_capacity: usize,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Object uniform ({name})")),
            size: std::mem::size_of::<ObjectUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // Storage bindings can't be empty; unskinned objects get one identity joint.
        let joint_capacity = joint_capacity.max(1);
        let joint_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("Joint palette ({name})")),
            contents: bytemuck::cast_slice(&vec![Mat4::IDENTITY; joint_capacity]),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Object bind group ({name})")),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: joint_buffer.as_entire_binding(),
                },
            ],
        });

        Self {
            uniform_buffer,
            joint_buffer,
            joint_capacity,
            bind_group,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DrawItem {
    pub object: ObjectId,
    pub model: RenderModelId,
    pub cast_shadow: bool,
}

/// GPU side of the scene's mesh objects: transform, flags and joint palette.
pub struct RenderObjects {
    bind_group_layout: wgpu::BindGroupLayout,
    objects: HashMap<ObjectId, RenderObject>,
    draw_list: Vec<DrawItem>,
}

impl RenderObjects {
    pub fn new(device: &wgpu::Device) -> Self {
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object bind group layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        Self {
            bind_group_layout,
            objects: HashMap::new(),
            draw_list: Vec::new(),
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout
    }

    /// Writes this frame's transforms and palettes and rebuilds the draw list.
    /// World matrices must be up to date.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, scene: &Scene) {
        self.draw_list.clear();

        for (object_id, object) in scene.objects.iter() {
            let Some(scene_model) = object.model_id.and_then(|id| scene.models.get(id)) else {
                continue;
            };
            let Some(render_model) = scene_model.render_model else {
                continue;
            };
            if !scene.is_visible(object_id) {
                continue;
            }

            let palette = match object.skin_id.and_then(|id| scene.get_skin(id)) {
                Some(skin) if scene_model.model.skinned => skin.joint_palette(scene),
                _ => Vec::new(),
            };
            let skinned = !palette.is_empty();

            let needs_new = self
                .objects
                .get(&object_id)
                .is_none_or(|existing| existing.joint_capacity < palette.len());
            if needs_new {
                let render_object =
                    RenderObject::new(device, &self.bind_group_layout, &object.name, palette.len());
                self.objects.insert(object_id, render_object);
            }

            let Some(render_object) = self.objects.get(&object_id) else {
                continue;
            };

            let uniform = ObjectUniform::new(
                *object.transform.get_world_matrix(),
                skinned,
                object.receive_shadow,
            );
            queue.write_buffer(
                &render_object.uniform_buffer,
                0,
                bytemuck::cast_slice(&[uniform]),
            );
            if skinned {
                queue.write_buffer(&render_object.joint_buffer, 0, bytemuck::cast_slice(&palette));
            }

            self.draw_list.push(DrawItem {
                object: object_id,
                model: render_model,
                cast_shadow: object.cast_shadow,
            });
        }
    }

    pub fn draw_list(&self) -> &[DrawItem] {
        &self.draw_list
    }

    pub fn bind_group(&self, object: ObjectId) -> Option<&wgpu::BindGroup> {
        self.objects.get(&object).map(|object| &object.bind_group)
    }
}

/// Draws every primitive of `models[item.model]`, with the object's bind group
/// at `object_group`. Materials are left to the caller.
pub fn draw_objects<'a>(
    render_pass: &mut wgpu::RenderPass<'_>,
    objects: &RenderObjects,
    models: &Arena<RenderModel>,
    items: impl Iterator<Item = &'a DrawItem>,
    object_group: u32,
) {
    for item in items {
        let (Some(bind_group), Some(model)) = (objects.bind_group(item.object), models.get(item.model)) else {
            continue;
        };
        render_pass.set_bind_group(object_group, bind_group, &[]);

        for primitive in &model.primitives {
            primitive.draw(render_pass);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3, Vec4};

    use super::*;

    #[test]
    fn layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 144);
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let world = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 1.0),
            Quat::from_rotation_y(0.3),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let uniform = ObjectUniform::new(world, false, true);
        let normal = Mat4::from_cols_array_2d(&uniform.normal);

        // A tangent of the surface stays perpendicular to the transformed normal.
        let tangent = world * Vec4::new(0.0, 1.0, 1.0, 0.0);
        let transformed = normal * Vec4::new(0.0, 1.0, -1.0, 0.0);
        assert!(tangent.dot(transformed).abs() < 1e-5);
        assert_eq!(uniform.receive_shadow, 1);
    }

    #[test]
    fn skinned_objects_skip_the_model_matrix() {
        let world = Mat4::from_translation(Vec3::X);
        let uniform = ObjectUniform::new(world, true, false);
        assert_eq!(Mat4::from_cols_array_2d(&uniform.model), Mat4::IDENTITY);
        assert_eq!(uniform.skinned, 1);
    }
}
