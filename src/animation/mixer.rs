use glam::{Quat, Vec3};

use crate::animation::clip::{AnimationClip, SampledValue};
use crate::scene_graph::{ObjectId, Scene};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Repeat,
    /// Plays forward, then backward, forever.
    PingPong,
}

struct RestPose {
    object: ObjectId,
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
}

pub struct ClipAction {
    clip: AnimationClip,
    loop_mode: LoopMode,
    // Monotonic play position. Ping-pong folds it over [0, 2 * duration).
    phase: f32,
    pub time_scale: f32,
    rest_pose: Vec<RestPose>,
}

impl ClipAction {
    fn new(clip: AnimationClip, loop_mode: LoopMode, scene: &Scene) -> Self {
        let mut rest_pose: Vec<RestPose> = Vec::new();

        for track in &clip.tracks {
            if rest_pose.iter().any(|pose| pose.object == track.target) {
                continue;
            }

            if let Some(transform) = scene.get_object_transform(track.target) {
                rest_pose.push(RestPose {
                    object: track.target,
                    translation: transform.translation(),
                    rotation: transform.rotation(),
                    scale: transform.scale(),
                });
            }
        }

        Self {
            clip,
            loop_mode,
            phase: 0.0,
            time_scale: 1.0,
            rest_pose,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    /// Current sample time within the clip.
    pub fn time(&self) -> f32 {
        let duration = self.clip.duration;
        if duration <= 0.0 {
            return 0.0;
        }

        match self.loop_mode {
            LoopMode::Once => self.phase.clamp(0.0, duration),
            LoopMode::Repeat => self.phase.rem_euclid(duration),
            LoopMode::PingPong => {
                let folded = self.phase.rem_euclid(2.0 * duration);
                if folded <= duration {
                    folded
                } else {
                    2.0 * duration - folded
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.loop_mode == LoopMode::Once && self.phase >= self.clip.duration
    }

    fn advance(&mut self, dt: f32) {
        self.phase += dt * self.time_scale;

        if self.loop_mode == LoopMode::Once {
            self.phase = self.phase.min(self.clip.duration);
        }
    }

    fn apply(&self, scene: &mut Scene) {
        let time = self.time();

        for track in &self.clip.tracks {
            let Some(object) = scene.get_object_mut(track.target) else {
                continue;
            };

            match track.sample(time) {
                Some(SampledValue::Translation(value)) => object.transform.set_translation(value),
                Some(SampledValue::Rotation(value)) => object.transform.set_rotation(value),
                Some(SampledValue::Scale(value)) => object.transform.set_scale(value),
                None => {}
            }
        }
    }

    fn restore(&self, scene: &mut Scene) {
        for pose in &self.rest_pose {
            scene.set_object_transform(pose.object, pose.translation, pose.rotation, pose.scale);
        }
    }
}

/// Drives one clip action on the objects of a loaded model.
#[derive(Default)]
pub struct AnimationMixer {
    action: Option<ClipAction>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `clip` from its first frame, replacing any running action.
    pub fn play(&mut self, scene: &mut Scene, clip: AnimationClip, loop_mode: LoopMode) {
        self.stop_all_actions(scene);

        log::info!("Playing clip {} ({:?})", clip.name, loop_mode);

        let action = ClipAction::new(clip, loop_mode, scene);
        action.apply(scene);
        self.action = Some(action);
    }

    pub fn action(&self) -> Option<&ClipAction> {
        self.action.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.action.is_some()
    }

    /// Advances the running action by `dt` seconds and poses its targets.
    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        if let Some(action) = &mut self.action {
            action.advance(dt);
            action.apply(scene);
        }
    }

    /// Stops the running action and puts its targets back in their rest pose.
    pub fn stop_all_actions(&mut self, scene: &mut Scene) {
        if let Some(action) = self.action.take() {
            action.restore(scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::{Interpolation, Track, TrackValues};
    use crate::scene_graph::Object3D;

    fn slide_clip(target: ObjectId) -> AnimationClip {
        AnimationClip::new(
            "slide",
            vec![Track {
                target,
                times: vec![0.0, 2.0],
                values: TrackValues::Translation(vec![Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0)]),
                interpolation: Interpolation::Linear,
            }],
        )
    }

    fn x_of(scene: &Scene, id: ObjectId) -> f32 {
        scene.get_object_transform(id).unwrap().translation().x
    }

    #[test]
    fn ping_pong_reflects_at_both_ends() {
        let mut scene = Scene::new();
        let object = scene.add_object(Object3D::named("bone"));
        let mut mixer = AnimationMixer::new();
        mixer.play(&mut scene, slide_clip(object), LoopMode::PingPong);

        mixer.update(&mut scene, 1.5);
        assert!((x_of(&scene, object) - 1.5).abs() < 1e-5);

        // 3.0 is one second past the end, so we're on the way back.
        mixer.update(&mut scene, 1.5);
        assert!((x_of(&scene, object) - 1.0).abs() < 1e-5);

        // 4.5 reflects off the start again.
        mixer.update(&mut scene, 1.5);
        assert!((x_of(&scene, object) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn ping_pong_time_stays_in_range() {
        let mut scene = Scene::new();
        let object = scene.add_object(Object3D::named("bone"));
        let mut mixer = AnimationMixer::new();
        mixer.play(&mut scene, slide_clip(object), LoopMode::PingPong);

        for _ in 0..500 {
            mixer.update(&mut scene, 0.37);
            let time = mixer.action().unwrap().time();
            assert!((0.0..=2.0).contains(&time));
        }
    }

    #[test]
    fn repeat_wraps_and_once_clamps() {
        let mut scene = Scene::new();
        let object = scene.add_object(Object3D::named("bone"));
        let mut mixer = AnimationMixer::new();

        mixer.play(&mut scene, slide_clip(object), LoopMode::Repeat);
        mixer.update(&mut scene, 2.5);
        assert!((mixer.action().unwrap().time() - 0.5).abs() < 1e-5);

        mixer.play(&mut scene, slide_clip(object), LoopMode::Once);
        mixer.update(&mut scene, 5.0);
        assert_eq!(mixer.action().unwrap().time(), 2.0);
        assert!(mixer.action().unwrap().is_finished());
    }

    #[test]
    fn stopping_restores_rest_pose() {
        let mut scene = Scene::new();
        let mut bone = Object3D::named("bone");
        bone.transform.set_translation(Vec3::new(0.0, 0.0, 7.0));
        let object = scene.add_object(bone);

        let mut mixer = AnimationMixer::new();
        mixer.play(&mut scene, slide_clip(object), LoopMode::PingPong);
        mixer.update(&mut scene, 1.0);
        assert!((x_of(&scene, object) - 1.0).abs() < 1e-5);

        mixer.stop_all_actions(&mut scene);
        assert!(!mixer.is_playing());
        let translation = scene.get_object_transform(object).unwrap().translation();
        assert_eq!(translation, Vec3::new(0.0, 0.0, 7.0));

        // A stopped mixer no longer moves anything.
        mixer.update(&mut scene, 1.0);
        assert_eq!(x_of(&scene, object), 0.0);
    }
}
