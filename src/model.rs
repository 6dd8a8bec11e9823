use std::f32::consts::TAU;

use anyhow::Context;
use bytemuck::{Pod, Zeroable};
use gltf::buffer;
use itertools::izip;

use crate::material_manager::{MaterialId, MaterialManager};

#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
    /// xyz tangent, w bitangent sign.
    pub tangent: [f32; 4],
    pub joints: [u32; 4],
    pub weights: [f32; 4],
}

impl Default for Vertex {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            normal: [0.0, 1.0, 0.0],
            tex_coords: [0.0; 2],
            tangent: [1.0, 0.0, 0.0, 1.0],
            joints: [0; 4],
            weights: [1.0, 0.0, 0.0, 0.0],
        }
    }
}

pub struct ModelPrimitive {
    pub index: usize,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub material: Option<MaterialId>,
}

impl ModelPrimitive {
    pub fn vertex_by_triangle_index(&self, face: usize, vert: usize) -> &Vertex {
        &self.vertices[self.indices[face * 3 + vert] as usize]
    }

    pub fn vertex_by_triangle_index_mut(&mut self, face: usize, vert: usize) -> &mut Vertex {
        let index = self.indices[face * 3 + vert] as usize;
        &mut self.vertices[index]
    }
}

pub struct Model {
    pub name: String,
    pub primitives: Vec<ModelPrimitive>,
    pub skinned: bool,
}

pub type Buffers<'a> = &'a [buffer::Data];

impl Model {
    pub fn from_gltf(
        material_manager: &MaterialManager,
        file_name: &str,
        name: impl Into<String>,
        mesh: gltf::Mesh,
        buffers: Buffers,
    ) -> anyhow::Result<Model> {
        let mut model = Model {
            name: name.into(),
            primitives: Vec::new(),
            skinned: false,
        };

        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                return Err(anyhow::anyhow!(
                    "Unsupported primitive mode: {:?}",
                    primitive.mode()
                ));
            }

            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions = reader
                .read_positions()
                .with_context(|| format!("Primitive without positions in {}", model.name))?;
            let normals = reader
                .read_normals()
                .with_context(|| format!("Primitive without normals in {}", model.name))?;

            let mut vertices = izip!(positions, normals)
                .map(|(position, normal)| Vertex {
                    position,
                    normal,
                    ..Default::default()
                })
                .collect::<Vec<Vertex>>();

            let has_tex_coords = match reader.read_tex_coords(0) {
                Some(tex_coords) => {
                    for (vertex, uv) in vertices.iter_mut().zip(tex_coords.into_f32()) {
                        vertex.tex_coords = uv;
                    }
                    true
                }
                None => false,
            };

            let has_tangents = match reader.read_tangents() {
                Some(tangents) => {
                    for (vertex, tangent) in vertices.iter_mut().zip(tangents) {
                        vertex.tangent = tangent;
                    }
                    true
                }
                None => false,
            };

            if let (Some(joints), Some(weights)) = (reader.read_joints(0), reader.read_weights(0)) {
                for (vertex, joints, weights) in
                    izip!(vertices.iter_mut(), joints.into_u16(), weights.into_f32())
                {
                    vertex.joints = joints.map(u32::from);
                    vertex.weights = weights;
                }
                model.skinned = true;
            }

            let indices = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect::<Vec<u32>>(),
                None => (0..vertices.len() as u32).collect(),
            };

            let material = primitive
                .material()
                .index()
                .and_then(|index| material_manager.get_gltf_material(file_name, index));

            let mut model_primitive = ModelPrimitive {
                index: primitive.index(),
                vertices,
                indices,
                material,
            };

            if !has_tangents && has_tex_coords {
                if let Err(e) = model_primitive.generate_tangents() {
                    log::warn!(
                        "{} primitive {}: {:#}",
                        model.name,
                        model_primitive.index,
                        e
                    );
                }
            }

            model.primitives.push(model_primitive);
        }

        if model.primitives.is_empty() {
            return Err(anyhow::anyhow!("Mesh without primitives: {}", model.name));
        }

        Ok(model)
    }

    /// Flat disc in the XY plane facing +Z, centred on the origin.
    pub fn circle(
        name: impl Into<String>,
        radius: f32,
        segments: u32,
        material: Option<MaterialId>,
    ) -> Model {
        let segments = segments.max(3);

        let center = Vertex {
            normal: [0.0, 0.0, 1.0],
            tex_coords: [0.5, 0.5],
            ..Default::default()
        };

        let rim = (0..=segments).map(|i| {
            let angle = i as f32 / segments as f32 * TAU;
            let (sin, cos) = angle.sin_cos();
            Vertex {
                position: [cos * radius, sin * radius, 0.0],
                normal: [0.0, 0.0, 1.0],
                tex_coords: [(cos + 1.0) * 0.5, 1.0 - (sin + 1.0) * 0.5],
                ..Default::default()
            }
        });

        let vertices = std::iter::once(center).chain(rim).collect::<Vec<_>>();
        let indices = (1..=segments).flat_map(|i| [0, i, i + 1]).collect::<Vec<_>>();

        Model {
            name: name.into(),
            primitives: vec![ModelPrimitive {
                index: 0,
                vertices,
                indices,
                material,
            }],
            skinned: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    #[test]
    fn circle_is_a_counter_clockwise_fan() {
        let model = Model::circle("floor", 1.5, 64, None);
        let primitive = &model.primitives[0];

        assert_eq!(primitive.vertices.len(), 66);
        assert_eq!(primitive.indices.len(), 64 * 3);

        for face in 0..primitive.indices.len() / 3 {
            let [a, b, c] = [0, 1, 2]
                .map(|vert| Vec3::from(primitive.vertex_by_triangle_index(face, vert).position));
            let normal = (b - a).cross(c - a);
            assert!(normal.z > 0.0, "face {face} is wound clockwise");
        }
    }

    #[test]
    fn circle_rim_lies_on_radius() {
        let model = Model::circle("floor", 1.5, 16, None);
        for vertex in &model.primitives[0].vertices[1..] {
            let distance = Vec3::from(vertex.position).length();
            assert!((distance - 1.5).abs() < 1e-5);
        }
    }

    #[test]
    fn vertex_layout_has_no_padding() {
        assert_eq!(std::mem::size_of::<Vertex>(), 80);
    }
}
