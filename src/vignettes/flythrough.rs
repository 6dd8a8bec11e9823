use glam::{Quat, Vec3};

use crate::{
    animation::{AnimationMixer, LoopMode},
    asset_pipeline::loader::{AssetManifest, LoadedAssets},
    input::InputEvent,
    math::color::Color,
    scene_graph::ObjectId,
    vignettes::{
        find_clip, model_asset,
        scroll_rig::{rig_pose, ScrollState},
        snitch::{tune_snitch_materials, SNITCH_MODEL, WING_CLIP},
        spawn, SetupError, Vignette, ENVIRONMENT,
    },
    world::World,
};

/// The snitch hovering in the dark; scrolling flies the camera past it.
#[derive(Default)]
pub struct Flythrough {
    scroll: ScrollState,
    snitch: Option<ObjectId>,
    mixer: AnimationMixer,
}

impl Flythrough {
    fn apply_pose(&self, world: &mut World, elapsed: f32) {
        let pose = rig_pose(self.scroll.progress(), elapsed, world.viewport.width);

        if let Some(snitch) = self.snitch {
            world.scene.set_object_transform(
                snitch,
                pose.object_position,
                Quat::IDENTITY,
                Vec3::splat(pose.object_scale),
            );
        }

        world.camera.eye = pose.camera_position;
        world.camera.look_at(pose.camera_target);
    }
}

impl Vignette for Flythrough {
    fn name(&self) -> &'static str {
        "flythrough"
    }

    fn manifest(&self) -> AssetManifest {
        AssetManifest::new(&[SNITCH_MODEL], ENVIRONMENT)
    }

    fn setup(&mut self, world: &mut World) {
        world.background = Color::from_srgb_hex(0x05060a);

        world.camera.fov_y_degrees = 75.0;
        world.light.color = Color::WHITE;
        world.light.intensity = 2.0;
        world.light.position = Vec3::new(0.0, 5.0, 5.0);
        world.light.target = Vec3::ZERO;
        world.light.cast_shadow = false;

        self.apply_pose(world, 0.0);
    }

    fn orbit_target(&self) -> Option<Vec3> {
        None
    }

    fn on_assets_loaded(&mut self, world: &mut World, assets: LoadedAssets) -> Result<(), SetupError> {
        let spawned = spawn(world, model_asset(&assets, SNITCH_MODEL)?, "Snitch")?;
        self.snitch = Some(spawned.root);

        world.set_environment(assets.environment);
        tune_snitch_materials(&mut world.materials, &spawned);

        let clip = find_clip(&spawned, WING_CLIP, SNITCH_MODEL)?;
        self.mixer.play(&mut world.scene, clip, LoopMode::PingPong);

        Ok(())
    }

    fn on_input(&mut self, _world: &mut World, event: &InputEvent) {
        match *event {
            InputEvent::Wheel { delta } => self.scroll.scroll_by(delta),
            InputEvent::TouchMove {
                previous, position, ..
            } => self.scroll.touch_moved(previous.y, position.y),
            _ => {}
        }
    }

    fn update(&mut self, world: &mut World, dt: f32, elapsed: f32) {
        self.scroll.update(dt);
        self.mixer.update(&mut world.scene, dt);
        self.apply_pose(world, elapsed);
    }

    fn debug_ui(&self, ui: &imgui::Ui) {
        ui.text(format!(
            "Scroll: {:.0} -> {:.0}",
            self.scroll.displayed(),
            self.scroll.target()
        ));
        ui.text(format!("Progress: {:.3}", self.scroll.progress()));
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::scene_graph::Object3D;
    use crate::viewport::Viewport;
    use crate::vignettes::scroll_rig::MAX_SCROLL;

    #[test]
    fn setup_places_camera_at_start_pose() {
        let mut world = World::new(Viewport::new(1280.0, 720.0, 1.0, 2.0));
        let mut flythrough = Flythrough::default();
        flythrough.setup(&mut world);

        assert_eq!(world.camera.eye, Vec3::new(0.0, 1.5, 6.0));
        assert_eq!(world.camera.target, Vec3::new(0.0, 2.0, 0.0));
        assert!(flythrough.orbit_target().is_none());
    }

    #[test]
    fn scrolling_to_the_end_reaches_end_pose() {
        let mut world = World::new(Viewport::new(1280.0, 720.0, 1.0, 2.0));
        let mut flythrough = Flythrough::default();
        flythrough.setup(&mut world);

        let snitch = world.scene.add_object(Object3D::named("Snitch"));
        flythrough.snitch = Some(snitch);

        for _ in 0..10 {
            flythrough.on_input(&mut world, &InputEvent::Wheel { delta: 2000.0 });
        }
        assert_eq!(flythrough.scroll.target(), MAX_SCROLL);

        for _ in 0..1200 {
            flythrough.update(&mut world, 1.0 / 60.0, 0.0);
        }

        let transform = world.scene.get_object_transform(snitch).unwrap();
        assert!((transform.translation() - Vec3::new(0.0, -0.2, 0.0)).length() < 1e-3);
        assert!((transform.scale() - Vec3::splat(1.4)).length() < 1e-3);
        assert!((world.camera.eye - Vec3::new(0.0, 0.4, 2.5)).length() < 1e-3);
    }

    #[test]
    fn touch_drag_scrolls() {
        let mut world = World::new(Viewport::new(400.0, 800.0, 2.0, 2.0));
        let mut flythrough = Flythrough::default();

        flythrough.on_input(
            &mut world,
            &InputEvent::TouchMove {
                id: 3,
                previous: Vec2::new(10.0, 600.0),
                position: Vec2::new(10.0, 500.0),
            },
        );
        assert_eq!(flythrough.scroll.target(), 200.0);
    }
}
