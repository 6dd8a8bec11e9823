use std::{f32::consts::FRAC_PI_2, sync::Arc};

use anyhow::Context;
use glam::{Quat, Vec3};

use crate::{
    animation::AnimationClip,
    asset_pipeline::{environment::EnvironmentMap, loader::ModelAsset, materials::PbrMaterialData},
    camera::Camera,
    effects::PostProcessSettings,
    lighting::DirectionalLight,
    material_manager::{MaterialId, MaterialManager},
    math::color::Color,
    model::Model,
    scene_graph::{Object3D, ObjectId, Scene, SceneModel},
    viewport::Viewport,
};

pub struct SpawnedModel {
    pub root: ObjectId,
    pub clips: Vec<AnimationClip>,
    pub materials: Vec<MaterialId>,
}

pub struct Floor {
    pub object: ObjectId,
    pub material: MaterialId,
}

/// Everything a vignette can touch, and everything the renderer draws.
pub struct World {
    pub scene: Scene,
    pub materials: MaterialManager,
    pub camera: Camera,
    pub light: DirectionalLight,
    pub background: Color,
    pub post: PostProcessSettings,
    pub viewport: Viewport,
    environment: Option<Arc<EnvironmentMap>>,
    environment_revision: u64,
}

impl World {
    pub fn new(viewport: Viewport) -> Self {
        let mut post = PostProcessSettings::default();
        post.fxaa.resolution = viewport.fxaa_resolution();

        Self {
            scene: Scene::new(),
            materials: MaterialManager::new(),
            camera: Camera::perspective(75.0, viewport.aspect(), 0.1, 1000.0),
            light: DirectionalLight::new(Color::WHITE, 1.0),
            background: Color::BLACK,
            post,
            viewport,
            environment: None,
            environment_revision: 0,
        }
    }

    /// Recomputes everything derived from the output size.
    pub fn resize(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
        self.post.fxaa.resolution = viewport.fxaa_resolution();
    }

    pub fn set_environment(&mut self, environment: EnvironmentMap) {
        self.environment = Some(Arc::new(environment));
        self.environment_revision += 1;
    }

    /// The current environment and a counter that changes whenever it's replaced.
    pub fn environment(&self) -> Option<(&Arc<EnvironmentMap>, u64)> {
        self.environment
            .as_ref()
            .map(|environment| (environment, self.environment_revision))
    }

    /// Adds the default scene of `asset` under a new root object, along with its
    /// materials and animation clips.
    pub fn spawn_model(&mut self, asset: &ModelAsset, root_name: &str) -> anyhow::Result<SpawnedModel> {
        self.materials
            .load_all_materials_from_gltf(&asset.file_name, &asset.document, &asset.images);

        let gltf_scene = asset
            .default_scene()
            .with_context(|| format!("No scenes in {}", asset.file_name))?;

        let spawned = self.scene.spawn_gltf_scene(
            &self.materials,
            &asset.file_name,
            &asset.buffers,
            &gltf_scene,
            root_name,
        )?;

        let clips = asset
            .document
            .animations()
            .map(|animation| AnimationClip::from_gltf(&animation, &asset.buffers, &spawned.nodes))
            .collect::<Vec<_>>();

        log::info!(
            "Spawned {} as {} ({} objects, {} clips)",
            asset.file_name,
            root_name,
            spawned.nodes.len(),
            clips.len()
        );

        Ok(SpawnedModel {
            root: spawned.root,
            clips,
            materials: self.materials.gltf_materials(&asset.file_name),
        })
    }

    /// Flat disc lying on the ground plane, facing up.
    pub fn add_floor(&mut self, radius: f32, segments: u32, color: Color) -> Floor {
        let mut material = PbrMaterialData::solid("Floor", color.0);
        material.env_intensity = 0.0;
        let material = self.materials.add_material(material);

        let model = self
            .scene
            .add_model(SceneModel::new(Model::circle("Floor", radius, segments, Some(material))));

        let mut object = Object3D::named("Floor");
        object.model_id = Some(model);
        object.receive_shadow = true;
        object
            .transform
            .set_rotation(Quat::from_rotation_x(-FRAC_PI_2));

        Floor {
            object: self.scene.add_object(object),
            material,
        }
    }

    /// Turns on shadow casting for every mesh under `root`.
    pub fn cast_shadows(&mut self, root: ObjectId) {
        for id in self.scene.mesh_objects(root) {
            if let Some(object) = self.scene.get_object_mut(id) {
                object.cast_shadow = true;
            }
        }
    }

    pub fn place(&mut self, object: ObjectId, translation: Vec3, rotation: Quat) {
        self.scene
            .set_object_transform(object, translation, rotation, Vec3::ONE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(width: f32, height: f32, ratio: f32) -> Viewport {
        Viewport::new(width, height, ratio, 2.0)
    }

    #[test]
    fn resize_updates_camera_and_fxaa() {
        let mut world = World::new(viewport(800.0, 600.0, 1.0));
        world.resize(viewport(1920.0, 1080.0, 3.0));

        assert!((world.camera.aspect() - 1920.0 / 1080.0).abs() < 1e-6);
        assert_eq!(
            world.post.fxaa.resolution,
            glam::Vec2::new(1.0 / 3840.0, 1.0 / 2160.0)
        );
    }

    #[test]
    fn floor_faces_up_and_receives_shadows() {
        let mut world = World::new(viewport(800.0, 600.0, 1.0));
        let floor = world.add_floor(1.5, 64, Color::from_srgb_hex(0xf5f5f5));
        world.scene.late_update();

        let object = world.scene.get_object(floor.object).unwrap();
        assert!(object.receive_shadow);
        assert!(!object.cast_shadow);

        let normal = object
            .transform
            .get_world_matrix()
            .transform_vector3(Vec3::Z);
        assert!((normal - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn environment_revision_changes_on_replace() {
        let mut world = World::new(viewport(800.0, 600.0, 1.0));
        assert!(world.environment().is_none());

        let pixels = vec![[1.0; 3]; 16 * 8];
        world.set_environment(EnvironmentMap::from_pixels(16, 8, &pixels));
        let first = world.environment().unwrap().1;

        world.set_environment(EnvironmentMap::from_pixels(16, 8, &pixels));
        assert!(world.environment().unwrap().1 > first);
    }
}
