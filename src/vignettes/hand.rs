use rand::Rng;

use crate::{
    animation::{AnimationMixer, LoopMode},
    asset_pipeline::loader::{AssetManifest, LoadedAssets},
    input::InputEvent,
    math::color::Color,
    scene_graph::ObjectId,
    vignettes::{
        find_clip,
        hit_reaction::{
            resting_rotation, start_rotation, DamageGrade, Fall, FallStep, HitOutcome,
            LifeCounter, ORIGIN_BACKGROUND, RESTING_HEIGHT, START_POSITION,
        },
        model_asset, spawn, studio_stage, SetupError, Vignette, ENVIRONMENT,
    },
    world::{Floor, World},
};

const MODEL: &str = "models/the_hand.glb";
const CLIP: &str = "GrabHold";

/// A hand idling on a grab animation. Clicks hurt it; out of life, it drops.
pub struct Hand {
    life: LifeCounter,
    fall: Fall,
    hand: Option<ObjectId>,
    floor: Option<Floor>,
    mixer: AnimationMixer,
    hits_enabled: bool,
}

impl Hand {
    pub fn new(rng: &mut impl Rng) -> Self {
        Self::with_life(LifeCounter::random(rng))
    }

    fn with_life(life: LifeCounter) -> Self {
        Self {
            life,
            fall: Fall::default(),
            hand: None,
            floor: None,
            mixer: AnimationMixer::new(),
            hits_enabled: false,
        }
    }

    fn hit(&mut self, world: &mut World) {
        if !self.hits_enabled {
            return;
        }

        match self.life.hit() {
            HitOutcome::Damaged { fraction_lost } => {
                DamageGrade::for_fraction_lost(fraction_lost).apply(&mut world.background, &mut world.post);
                log::debug!("Hit, {} of {} life left", self.life.current(), self.life.max_life());
            }
            HitOutcome::Died => {
                DamageGrade::for_fraction_lost(1.0).apply(&mut world.background, &mut world.post);
                self.mixer.stop_all_actions(&mut world.scene);
                log::info!("The hand is dead");
            }
            HitOutcome::AlreadyDead => {}
        }
    }

    fn fall(&mut self, world: &mut World) {
        let Some(hand) = self.hand else {
            return;
        };
        let Some(translation) = world
            .scene
            .get_object_transform(hand)
            .map(|transform| transform.translation())
        else {
            return;
        };

        match self.fall.step(translation.y) {
            FallStep::Falling { height } => {
                world
                    .scene
                    .set_object_translation(hand, translation.with_y(height));
            }
            FallStep::Landed => {
                world.place(hand, translation.with_y(RESTING_HEIGHT), resting_rotation());
            }
            FallStep::Resting => {}
        }
    }
}

impl Vignette for Hand {
    fn name(&self) -> &'static str {
        "hand"
    }

    fn manifest(&self) -> AssetManifest {
        AssetManifest::new(&[MODEL], ENVIRONMENT)
    }

    fn setup(&mut self, world: &mut World) {
        studio_stage(world, Color::from_srgb_hex(ORIGIN_BACKGROUND));
        self.floor = Some(world.add_floor(1.5, 64, Color::from_srgb_hex(0xf5f5f5)));
    }

    fn on_assets_loaded(&mut self, world: &mut World, assets: LoadedAssets) -> Result<(), SetupError> {
        let asset = model_asset(&assets, MODEL)?;
        let spawned = spawn(world, asset, "Hand")?;
        world.place(spawned.root, START_POSITION, start_rotation());
        self.hand = Some(spawned.root);

        world.set_environment(assets.environment);
        world.cast_shadows(spawned.root);
        world.materials.patch(&spawned.materials, |material| {
            material.env_intensity = 0.15;
        });

        let clip = find_clip(&spawned, CLIP, MODEL)?;
        self.mixer.play(&mut world.scene, clip, LoopMode::PingPong);

        if let Some(floor) = &self.floor {
            world.materials.patch(&[floor.material], |material| {
                material.env_intensity = 0.2;
                material.roughness = 0.9;
                material.metallic = 0.0;
            });
        }

        self.hits_enabled = true;
        Ok(())
    }

    fn on_input(&mut self, world: &mut World, event: &InputEvent) {
        if let InputEvent::Click { .. } | InputEvent::TouchEnd { .. } = event {
            self.hit(world);
        }
    }

    fn update(&mut self, world: &mut World, dt: f32, _elapsed: f32) {
        if self.life.is_dead() {
            self.fall(world);
        } else {
            self.mixer.update(&mut world.scene, dt);
        }
    }

    fn debug_ui(&self, ui: &imgui::Ui) {
        ui.text(format!("Life: {} / {}", self.life.current(), self.life.max_life()));
        ui.text(format!("State: {:?}", self.life.state()));
        if self.life.is_dead() {
            ui.text(format!("Resting: {}", self.fall.is_resting()));
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene_graph::Object3D;
    use crate::viewport::Viewport;

    fn world() -> World {
        World::new(Viewport::new(800.0, 600.0, 1.0, 2.0))
    }

    /// A hand that skipped asset loading: just a root object, hits enabled.
    fn loaded_hand(world: &mut World, max_life: u32) -> (Hand, ObjectId) {
        let mut hand = Hand::with_life(LifeCounter::new(max_life));
        hand.setup(world);

        let root = world.scene.add_object(Object3D::named("Hand"));
        world.place(root, START_POSITION, start_rotation());
        hand.hand = Some(root);
        hand.hits_enabled = true;

        (hand, root)
    }

    fn click() -> InputEvent {
        InputEvent::Click {
            position: glam::Vec2::ZERO,
        }
    }

    #[test]
    fn hits_before_load_are_ignored() {
        let mut world = world();
        let mut hand = Hand::with_life(LifeCounter::new(7));
        hand.setup(&mut world);

        hand.on_input(&mut world, &click());
        assert_eq!(hand.life.current(), 7);
        assert_eq!(world.background, Color::from_srgb_hex(ORIGIN_BACKGROUND));
    }

    #[test]
    fn hits_grade_the_scene() {
        let mut world = world();
        let (mut hand, _) = loaded_hand(&mut world, 8);

        hand.on_input(&mut world, &click());
        hand.on_input(
            &mut world,
            &InputEvent::TouchEnd {
                id: 0,
                position: glam::Vec2::ZERO,
            },
        );

        assert_eq!(hand.life.current(), 6);
        assert_eq!(world.post.depth_of_field.bokeh_scale, 4.0);
        assert_ne!(world.background, Color::from_srgb_hex(ORIGIN_BACKGROUND));
    }

    #[test]
    fn dead_hand_falls_and_comes_to_rest() {
        let mut world = world();
        let (mut hand, root) = loaded_hand(&mut world, 2);

        hand.on_input(&mut world, &click());
        hand.on_input(&mut world, &click());
        assert!(hand.life.is_dead());
        assert_eq!(world.post.depth_of_field.bokeh_scale, 10.0);

        for _ in 0..100 {
            hand.update(&mut world, 1.0 / 60.0, 0.0);
        }

        let transform = world.scene.get_object_transform(root).unwrap();
        assert_eq!(transform.translation(), Vec3::new(0.0, RESTING_HEIGHT, 0.75));
        assert_eq!(transform.rotation(), resting_rotation());
        assert!(hand.fall.is_resting());
    }

    #[test]
    fn hit_after_death_changes_nothing() {
        let mut world = world();
        let (mut hand, _) = loaded_hand(&mut world, 1);

        hand.on_input(&mut world, &click());
        let background = world.background;
        let post = world.post;

        hand.on_input(&mut world, &click());
        assert_eq!(world.background, background);
        assert_eq!(world.post, post);
    }
}
