use glam::Mat4;
use id_arena::Id;

use crate::scene_graph::{ObjectId, Scene};

pub type SkinId = Id<Skin>;

/// Joint hierarchy of a skinned mesh. Joints are ordinary scene objects, so
/// animating them is just animating transforms.
pub struct Skin {
    pub name: String,
    pub joints: Vec<ObjectId>,
    pub inverse_bind_matrices: Vec<Mat4>,
}

impl Skin {
    pub fn from_gltf(
        skin: &gltf::Skin,
        buffers: &[gltf::buffer::Data],
        node_objects: &std::collections::HashMap<usize, ObjectId>,
    ) -> anyhow::Result<Skin> {
        let joints = skin
            .joints()
            .map(|joint| {
                node_objects.get(&joint.index()).copied().ok_or_else(|| {
                    anyhow::anyhow!("Skin joint node {} was not spawned", joint.index())
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
        let inverse_bind_matrices = match reader.read_inverse_bind_matrices() {
            Some(matrices) => matrices.map(|m| Mat4::from_cols_array_2d(&m)).collect(),
            None => vec![Mat4::IDENTITY; joints.len()],
        };

        if inverse_bind_matrices.len() != joints.len() {
            anyhow::bail!(
                "Skin {:?} has {} joints but {} inverse bind matrices",
                skin.name(),
                joints.len(),
                inverse_bind_matrices.len()
            );
        }

        Ok(Skin {
            name: skin.name().unwrap_or("Unnamed skin").to_string(),
            joints,
            inverse_bind_matrices,
        })
    }

    /// World-space joint matrices. World transforms must be up to date, i.e.
    /// call this after `Scene::late_update`.
    pub fn joint_palette(&self, scene: &Scene) -> Vec<Mat4> {
        self.joints
            .iter()
            .zip(&self.inverse_bind_matrices)
            .map(|(joint, inverse_bind)| {
                let world = scene
                    .get_object(*joint)
                    .map(|object| *object.transform.get_world_matrix())
                    .unwrap_or(Mat4::IDENTITY);
                world * *inverse_bind
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene_graph::Object3D;

    #[test]
    fn palette_cancels_bind_pose() {
        let mut scene = Scene::new();
        let mut joint = Object3D::named("joint");
        joint.transform.set_translation(Vec3::new(0.0, 2.0, 0.0));
        let joint = scene.add_object(joint);
        scene.late_update();

        let skin = Skin {
            name: "test".into(),
            joints: vec![joint],
            inverse_bind_matrices: vec![Mat4::from_translation(Vec3::new(0.0, -2.0, 0.0))],
        };

        let palette = skin.joint_palette(&scene);
        assert!(palette[0].abs_diff_eq(Mat4::IDENTITY, 1e-6));

        scene.set_object_translation(joint, Vec3::new(1.0, 2.0, 0.0));
        scene.late_update();
        let moved = skin.joint_palette(&scene)[0].transform_point3(Vec3::ZERO);
        assert!((moved - Vec3::X).length() < 1e-6);
    }
}
