// Exporters don't always write tangents, and normal maps need them.
// Missing tangents are generated here with mikktspace.

use anyhow::bail;
use bevy_mikktspace::{generate_tangents, Geometry};

use crate::model::ModelPrimitive;

impl Geometry for ModelPrimitive {
    fn num_faces(&self) -> usize {
        self.indices.len() / 3
    }

    fn num_vertices_of_face(&self, _face: usize) -> usize {
        3
    }

    fn position(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).position
    }

    fn normal(&self, face: usize, vert: usize) -> [f32; 3] {
        self.vertex_by_triangle_index(face, vert).normal
    }

    fn tex_coord(&self, face: usize, vert: usize) -> [f32; 2] {
        self.vertex_by_triangle_index(face, vert).tex_coords
    }

    fn set_tangent(
        &mut self,
        tangent: [f32; 3],
        _bi_tangent: [f32; 3],
        _f_mag_s: f32,
        _f_mag_t: f32,
        bi_tangent_preserves_orientation: bool,
        face: usize,
        vert: usize,
    ) {
        let sign = if bi_tangent_preserves_orientation {
            1.0
        } else {
            -1.0
        };
        let vertex = self.vertex_by_triangle_index_mut(face, vert);
        vertex.tangent = [tangent[0], tangent[1], tangent[2], sign];
    }
}

impl ModelPrimitive {
    /// Generate tangents for this primitive using mikktspace algorithm
    pub fn generate_tangents(&mut self) -> anyhow::Result<()> {
        let success = generate_tangents(self);

        if !success {
            bail!("Failed to generate tangents")
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::model::Model;

    #[test]
    fn flat_disc_gets_in_plane_tangents() {
        let mut model = Model::circle("disc", 1.0, 8, None);
        let primitive = &mut model.primitives[0];
        for vertex in &mut primitive.vertices {
            vertex.tangent = [0.0; 4];
        }

        primitive.generate_tangents().unwrap();

        for vertex in &primitive.vertices {
            assert!(vertex.tangent[2].abs() < 1e-4, "tangent leaves the disc plane");
            assert!(vertex.tangent[3].abs() == 1.0);
        }
    }
}
