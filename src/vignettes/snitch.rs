use glam::{Quat, Vec3};

use crate::{
    animation::{AnimationMixer, LoopMode},
    asset_pipeline::loader::{AssetManifest, LoadedAssets},
    material_manager::MaterialManager,
    math::color::Color,
    scene_graph::ObjectId,
    vignettes::{find_clip, model_asset, spawn, studio_stage, SetupError, Vignette, ENVIRONMENT},
    world::{SpawnedModel, World},
};

pub const SNITCH_MODEL: &str = "models/snitch.glb";
pub const BROOM_MODEL: &str = "models/broom.glb";
pub const WING_CLIP: &str = "Alas|Action";

const BROOM_HEIGHT: f32 = 0.9;

/// Gold: fully metallic, fairly polished, strong reflections.
pub fn tune_snitch_materials(materials: &mut MaterialManager, spawned: &SpawnedModel) {
    materials.patch(&spawned.materials, |material| {
        material.env_intensity = 1.0;
        material.metallic = 1.0;
        material.roughness = 0.25;
    });
}

pub fn broom_pose(time: f32) -> (Vec3, Quat) {
    let position = Vec3::new(0.0, BROOM_HEIGHT + 0.05 * (0.8 * time).sin(), 0.0);
    let roll = Quat::from_rotation_z(0.08 * (0.6 * time).sin());
    (position, roll)
}

/// Figure-eight around the broom, nose along the path.
pub fn snitch_pose(time: f32) -> (Vec3, Quat) {
    let position = Vec3::new(
        1.2 * (0.7 * time).sin(),
        1.3 + 0.15 * (2.1 * time).sin(),
        0.6 * (1.4 * time).sin(),
    );

    let velocity_x = 1.2 * 0.7 * (0.7 * time).cos();
    let velocity_z = 0.6 * 1.4 * (1.4 * time).cos();
    let yaw = velocity_x.atan2(velocity_z);

    (position, Quat::from_rotation_y(yaw))
}

#[derive(Default)]
pub struct Snitch {
    snitch: Option<ObjectId>,
    broom: Option<ObjectId>,
    mixer: AnimationMixer,
}

impl Vignette for Snitch {
    fn name(&self) -> &'static str {
        "snitch"
    }

    fn manifest(&self) -> AssetManifest {
        AssetManifest::new(&[SNITCH_MODEL, BROOM_MODEL], ENVIRONMENT)
    }

    fn setup(&mut self, world: &mut World) {
        studio_stage(world, Color::from_srgb_hex(0x0b0b14));
    }

    fn on_assets_loaded(&mut self, world: &mut World, assets: LoadedAssets) -> Result<(), SetupError> {
        let broom = spawn(world, model_asset(&assets, BROOM_MODEL)?, "Broom")?;
        let snitch = spawn(world, model_asset(&assets, SNITCH_MODEL)?, "Snitch")?;

        world.set_environment(assets.environment);

        world.cast_shadows(broom.root);
        world.materials.patch(&broom.materials, |material| {
            material.env_intensity = 0.5;
        });
        self.broom = Some(broom.root);

        world.cast_shadows(snitch.root);
        tune_snitch_materials(&mut world.materials, &snitch);
        self.snitch = Some(snitch.root);

        let clip = find_clip(&snitch, WING_CLIP, SNITCH_MODEL)?;
        self.mixer.play(&mut world.scene, clip, LoopMode::PingPong);

        Ok(())
    }

    fn update(&mut self, world: &mut World, dt: f32, elapsed: f32) {
        self.mixer.update(&mut world.scene, dt);

        if let Some(broom) = self.broom {
            let (position, rotation) = broom_pose(elapsed);
            world.place(broom, position, rotation);
        }

        if let Some(snitch) = self.snitch {
            let (position, rotation) = snitch_pose(elapsed);
            world.place(snitch, position, rotation);
        }
    }

    fn debug_ui(&self, ui: &imgui::Ui) {
        let clip_time = self.mixer.action().map_or(0.0, |action| action.time());
        ui.text(format!("Wing clip time: {:.2}", clip_time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broom_hovers_around_its_height() {
        for i in 0..100 {
            let (position, roll) = broom_pose(i as f32 * 0.1);
            assert!((position.y - BROOM_HEIGHT).abs() <= 0.05 + 1e-6);
            assert!(roll.angle_between(Quat::IDENTITY) <= 0.08 + 1e-4);
        }

        assert_eq!(broom_pose(0.0).0, Vec3::new(0.0, BROOM_HEIGHT, 0.0));
    }

    #[test]
    fn snitch_faces_along_its_path() {
        let time = 1.7;
        let (position, rotation) = snitch_pose(time);
        let (ahead, _) = snitch_pose(time + 1e-3);

        let travel = (ahead - position).with_y(0.0).normalize();
        let forward = rotation * Vec3::Z;
        assert!(forward.dot(travel) > 0.999);
    }

    #[test]
    fn snitch_stays_near_the_broom() {
        for i in 0..200 {
            let (position, _) = snitch_pose(i as f32 * 0.05);
            assert!(position.x.abs() <= 1.2 + 1e-6);
            assert!(position.z.abs() <= 0.6 + 1e-6);
            assert!((position.y - 1.3).abs() <= 0.15 + 1e-6);
        }
    }
}
