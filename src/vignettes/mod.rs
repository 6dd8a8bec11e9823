pub mod flythrough;
pub mod hand;
pub mod hit_reaction;
pub mod scroll_rig;
pub mod snitch;

use std::{fmt, str::FromStr};

use glam::Vec3;

use crate::{
    animation::AnimationClip,
    asset_pipeline::loader::{AssetError, AssetManifest, LoadedAssets, ModelAsset},
    input::InputEvent,
    math::color::Color,
    world::{SpawnedModel, World},
};

pub const ENVIRONMENT: &str = "hdr/cyclorama_hard_light_1k.hdr";

/// Stops the setup of a vignette after its assets arrive. The scene keeps
/// rendering whatever was set up before the failure.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error(transparent)]
    Assets(#[from] AssetError),

    #[error("Model {0} was not loaded")]
    MissingModel(String),

    #[error("Failed to spawn {model}: {message}")]
    Spawn { model: String, message: String },

    #[error("Clip {clip} not found in {model}")]
    MissingClip { clip: String, model: String },
}

/// One of the interactive scenes. Setup runs in two steps: `setup` before any
/// asset is loaded, `on_assets_loaded` once the manifest has been fetched.
pub trait Vignette {
    fn name(&self) -> &'static str;

    fn manifest(&self) -> AssetManifest;

    fn setup(&mut self, world: &mut World);

    /// Target for orbit controls, or `None` if the vignette drives the camera.
    fn orbit_target(&self) -> Option<Vec3> {
        Some(Vec3::ZERO)
    }

    fn on_assets_loaded(&mut self, world: &mut World, assets: LoadedAssets) -> Result<(), SetupError>;

    fn on_input(&mut self, _world: &mut World, _event: &InputEvent) {}

    /// Called once per frame with the frame time and the time since start-up.
    fn update(&mut self, world: &mut World, dt: f32, elapsed: f32);

    fn debug_ui(&self, _ui: &imgui::Ui) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VignetteKind {
    Hand,
    Snitch,
    Flythrough,
}

impl VignetteKind {
    pub const ALL: [VignetteKind; 3] = [
        VignetteKind::Hand,
        VignetteKind::Snitch,
        VignetteKind::Flythrough,
    ];

    pub fn name(self) -> &'static str {
        match self {
            VignetteKind::Hand => "hand",
            VignetteKind::Snitch => "snitch",
            VignetteKind::Flythrough => "flythrough",
        }
    }

    pub fn create(self) -> Box<dyn Vignette> {
        match self {
            VignetteKind::Hand => Box::new(hand::Hand::new(&mut rand::thread_rng())),
            VignetteKind::Snitch => Box::new(snitch::Snitch::default()),
            VignetteKind::Flythrough => Box::new(flythrough::Flythrough::default()),
        }
    }
}

impl fmt::Display for VignetteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VignetteKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VignetteKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("Unknown vignette: {}", s))
    }
}

/// Camera and key light shared by the orbitable scenes.
pub fn studio_stage(world: &mut World, background: Color) {
    world.background = background;

    world.camera.fov_y_degrees = 75.0;
    world.camera.eye = Vec3::new(0.0, 1.0, 4.0);
    world.camera.look_at(Vec3::ZERO);

    world.light.color = Color::WHITE;
    world.light.intensity = 2.0;
    world.light.position = Vec3::new(0.0, 5.0, 5.0);
    world.light.target = Vec3::ZERO;
    world.light.cast_shadow = true;
}

pub fn model_asset<'a>(assets: &'a LoadedAssets, file_name: &str) -> Result<&'a ModelAsset, SetupError> {
    assets
        .models
        .iter()
        .find(|model| model.file_name == file_name)
        .ok_or_else(|| SetupError::MissingModel(file_name.to_string()))
}

pub fn spawn(world: &mut World, asset: &ModelAsset, root_name: &str) -> Result<SpawnedModel, SetupError> {
    world
        .spawn_model(asset, root_name)
        .map_err(|e| SetupError::Spawn {
            model: asset.file_name.clone(),
            message: format!("{:#}", e),
        })
}

pub fn find_clip(spawned: &SpawnedModel, clip: &str, model: &str) -> Result<AnimationClip, SetupError> {
    AnimationClip::find_by_name(&spawned.clips, clip)
        .cloned()
        .ok_or_else(|| SetupError::MissingClip {
            clip: clip.to_string(),
            model: model.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_parse_from_their_names() {
        for kind in VignetteKind::ALL {
            assert_eq!(kind.name().parse::<VignetteKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.name());
        }
        assert!("Hand".parse::<VignetteKind>().is_err());
    }

    #[test]
    fn missing_clip_names_clip_and_model() {
        let spawned = SpawnedModel {
            root: {
                let mut scene = crate::scene_graph::Scene::new();
                scene.add_object(crate::scene_graph::Object3D::named("root"))
            },
            clips: vec![AnimationClip::new("Idle", Vec::new())],
            materials: Vec::new(),
        };

        let error = find_clip(&spawned, "GrabHold", "models/the_hand.glb").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Clip GrabHold not found in models/the_hand.glb"
        );
        assert!(find_clip(&spawned, "Idle", "models/the_hand.glb").is_ok());
    }

    #[test]
    fn every_vignette_wants_the_panorama() {
        for kind in VignetteKind::ALL {
            let vignette = kind.create();
            assert_eq!(vignette.manifest().environment, ENVIRONMENT);
            assert_eq!(vignette.name(), kind.name());
        }
    }
}
