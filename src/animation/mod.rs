pub mod clip;
pub mod mixer;
pub mod skin;

pub use clip::AnimationClip;
pub use mixer::{AnimationMixer, LoopMode};
