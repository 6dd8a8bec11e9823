use std::collections::HashMap;

use glam::{Quat, Vec3};

use crate::scene_graph::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
}

#[derive(Debug, Clone)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampledValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

/// Keyframes for one property of one object.
#[derive(Debug, Clone)]
pub struct Track {
    pub target: ObjectId,
    pub times: Vec<f32>,
    pub values: TrackValues,
    pub interpolation: Interpolation,
}

impl Track {
    /// Keyframe pair around `time` and the blend factor between them.
    /// Clamps to the first/last keyframe outside the track's range.
    fn keyframes(&self, time: f32) -> (usize, usize, f32) {
        let last = self.times.len().saturating_sub(1);
        let next = self.times.partition_point(|&t| t <= time);

        if next == 0 {
            return (0, 0, 0.0);
        }
        if next > last {
            return (last, last, 0.0);
        }

        let previous = next - 1;
        if self.interpolation == Interpolation::Step {
            return (previous, previous, 0.0);
        }

        let span = self.times[next] - self.times[previous];
        let factor = if span > 0.0 {
            (time - self.times[previous]) / span
        } else {
            0.0
        };

        (previous, next, factor)
    }

    pub fn sample(&self, time: f32) -> Option<SampledValue> {
        if self.times.is_empty() {
            return None;
        }

        let (a, b, t) = self.keyframes(time);

        let value = match &self.values {
            TrackValues::Translation(values) => {
                SampledValue::Translation(values.get(a)?.lerp(*values.get(b)?, t))
            }
            TrackValues::Rotation(values) => {
                SampledValue::Rotation(values.get(a)?.slerp(*values.get(b)?, t).normalize())
            }
            TrackValues::Scale(values) => {
                SampledValue::Scale(values.get(a)?.lerp(*values.get(b)?, t))
            }
        };

        Some(value)
    }
}

/// A named set of tracks, bound to the objects of one spawned model.
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    pub fn from_gltf(
        animation: &gltf::Animation,
        buffers: &[gltf::buffer::Data],
        node_objects: &HashMap<usize, ObjectId>,
    ) -> AnimationClip {
        use gltf::animation::util::ReadOutputs;

        let name = animation
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Animation {}", animation.index()));

        let mut tracks = Vec::new();

        for channel in animation.channels() {
            let node_index = channel.target().node().index();
            let Some(&target) = node_objects.get(&node_index) else {
                log::warn!("{}: channel targets unknown node {}", name, node_index);
                continue;
            };

            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));
            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs())
            else {
                continue;
            };

            let times = inputs.collect::<Vec<f32>>();

            let (interpolation, cubic) = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Step => (Interpolation::Step, false),
                gltf::animation::Interpolation::Linear => (Interpolation::Linear, false),
                // Sampled at its keyframe values; tangents are dropped.
                gltf::animation::Interpolation::CubicSpline => (Interpolation::Linear, true),
            };

            let values = match outputs {
                ReadOutputs::Translations(values) => {
                    TrackValues::Translation(keyframe_values(values.map(Vec3::from), cubic))
                }
                ReadOutputs::Rotations(values) => TrackValues::Rotation(keyframe_values(
                    values.into_f32().map(Quat::from_array),
                    cubic,
                )),
                ReadOutputs::Scales(values) => {
                    TrackValues::Scale(keyframe_values(values.map(Vec3::from), cubic))
                }
                ReadOutputs::MorphTargetWeights(_) => continue,
            };

            tracks.push(Track {
                target,
                times,
                values,
                interpolation,
            });
        }

        AnimationClip::new(name, tracks)
    }

    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks
            .iter()
            .filter_map(|track| track.times.last().copied())
            .fold(0.0_f32, f32::max);

        Self {
            name: name.into(),
            duration,
            tracks,
        }
    }

    pub fn find_by_name<'a>(clips: &'a [AnimationClip], name: &str) -> Option<&'a AnimationClip> {
        clips.iter().find(|clip| clip.name == name)
    }
}

/// Cubic spline outputs come as (in-tangent, value, out-tangent) triplets.
fn keyframe_values<T>(values: impl Iterator<Item = T>, cubic: bool) -> Vec<T> {
    if cubic {
        values.skip(1).step_by(3).collect()
    } else {
        values.collect()
    }
}

#[cfg(test)]
mod tests {
    use id_arena::Arena;

    use super::*;
    use crate::scene_graph::Object3D;

    fn target() -> ObjectId {
        let mut arena = Arena::<Object3D>::new();
        arena.alloc(Object3D::default())
    }

    fn translation_track(interpolation: Interpolation) -> Track {
        Track {
            target: target(),
            times: vec![0.0, 1.0, 3.0],
            values: TrackValues::Translation(vec![Vec3::ZERO, Vec3::X, Vec3::new(3.0, 0.0, 0.0)]),
            interpolation,
        }
    }

    #[test]
    fn linear_track_interpolates_between_keys() {
        let track = translation_track(Interpolation::Linear);
        assert_eq!(
            track.sample(0.5),
            Some(SampledValue::Translation(Vec3::new(0.5, 0.0, 0.0)))
        );
        assert_eq!(
            track.sample(2.0),
            Some(SampledValue::Translation(Vec3::new(2.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn samples_clamp_outside_the_track() {
        let track = translation_track(Interpolation::Linear);
        assert_eq!(track.sample(-1.0), Some(SampledValue::Translation(Vec3::ZERO)));
        assert_eq!(
            track.sample(10.0),
            Some(SampledValue::Translation(Vec3::new(3.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn step_track_holds_previous_key() {
        let track = translation_track(Interpolation::Step);
        assert_eq!(track.sample(0.99), Some(SampledValue::Translation(Vec3::ZERO)));
        assert_eq!(track.sample(1.0), Some(SampledValue::Translation(Vec3::X)));
    }

    #[test]
    fn duration_is_latest_keyframe() {
        let clip = AnimationClip::new(
            "GrabHold",
            vec![
                translation_track(Interpolation::Linear),
                Track {
                    target: target(),
                    times: vec![0.0, 4.5],
                    values: TrackValues::Scale(vec![Vec3::ONE, Vec3::ONE]),
                    interpolation: Interpolation::Linear,
                },
            ],
        );
        assert_eq!(clip.duration, 4.5);

        let clips = [clip];
        assert!(AnimationClip::find_by_name(&clips, "GrabHold").is_some());
        assert!(AnimationClip::find_by_name(&clips, "grabhold").is_none());
    }

    #[test]
    fn cubic_outputs_keep_only_values() {
        let values = keyframe_values([10, 1, 20, 11, 2, 21].into_iter(), true);
        assert_eq!(values, vec![1, 2]);
    }
}
