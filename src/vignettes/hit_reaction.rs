use glam::{EulerRot, Quat, Vec3};
use rand::Rng;

use crate::effects::PostProcessSettings;
use crate::math::color::Color;
use crate::math::easing::lerp;

pub const BASE_MAX_LIFE: u32 = 7;
pub const MAX_LIFE_BONUS: u32 = 3;

pub const ORIGIN_BACKGROUND: u32 = 0x121212;
pub const BLOOD_BACKGROUND: u32 = 0x2a0808;
const BACKGROUND_SHIFT: f32 = 0.6;

/// Added to the fall velocity once per frame, regardless of frame time.
pub const GRAVITY: f32 = -0.02;
pub const FLOOR_THRESHOLD: f32 = 0.5;
pub const RESTING_HEIGHT: f32 = 0.3;

pub const START_POSITION: Vec3 = Vec3::new(0.0, 1.0, 0.75);

const YAW: f32 = std::f32::consts::PI * 3.0 / 2.0;

pub fn start_rotation() -> Quat {
    Quat::from_euler(EulerRot::XYZ, 0.0, YAW, 0.0)
}

/// Knocked over, lying on the floor.
pub fn resting_rotation() -> Quat {
    use std::f32::consts::PI;
    Quat::from_euler(EulerRot::XYZ, PI * 40.0 / 90.0, YAW, PI * 20.0 / 90.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifeState {
    Alive,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitOutcome {
    Damaged { fraction_lost: f32 },
    /// The hit that took the last point of life. Happens once.
    Died,
    AlreadyDead,
}

#[derive(Debug, Clone)]
pub struct LifeCounter {
    max_life: u32,
    current: u32,
    state: LifeState,
}

impl LifeCounter {
    pub fn new(max_life: u32) -> Self {
        let max_life = max_life.max(1);
        Self {
            max_life,
            current: max_life,
            state: LifeState::Alive,
        }
    }

    /// `7..=10` points of life.
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::new(BASE_MAX_LIFE + rng.gen_range(0..=MAX_LIFE_BONUS))
    }

    pub fn hit(&mut self) -> HitOutcome {
        if self.state == LifeState::Dead {
            return HitOutcome::AlreadyDead;
        }

        self.current = self.current.saturating_sub(1);

        if self.current == 0 {
            self.state = LifeState::Dead;
            HitOutcome::Died
        } else {
            HitOutcome::Damaged {
                fraction_lost: self.fraction_lost(),
            }
        }
    }

    pub fn fraction_lost(&self) -> f32 {
        (self.max_life - self.current) as f32 / self.max_life as f32
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn max_life(&self) -> u32 {
        self.max_life
    }

    pub fn state(&self) -> LifeState {
        self.state
    }

    pub fn is_dead(&self) -> bool {
        self.state == LifeState::Dead
    }
}

/// Scene look for a given amount of damage taken.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageGrade {
    pub background: Color,
    pub bokeh_scale: f32,
    pub bloom_intensity: f32,
    pub hue: f32,
    pub saturation: f32,
}

impl DamageGrade {
    pub fn for_fraction_lost(fraction_lost: f32) -> Self {
        let t = fraction_lost.clamp(0.0, 1.0);

        let origin = Color::from_srgb_hex(ORIGIN_BACKGROUND);
        let blood = Color::from_srgb_hex(BLOOD_BACKGROUND);

        Self {
            background: origin.lerp(blood, t * BACKGROUND_SHIFT),
            bokeh_scale: lerp(2.0, 10.0, t),
            bloom_intensity: lerp(1.2, 4.2, t),
            hue: t * -0.3,
            saturation: t * 0.4,
        }
    }

    pub fn apply(&self, background: &mut Color, post: &mut PostProcessSettings) {
        *background = self.background;
        post.depth_of_field.bokeh_scale = self.bokeh_scale;
        post.bloom.intensity = self.bloom_intensity;
        post.hue_saturation.hue = self.hue;
        post.hue_saturation.saturation = self.saturation;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallStep {
    Falling { height: f32 },
    /// Reached the floor this frame: snap to the resting transform.
    Landed,
    Resting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum FallState {
    Falling { velocity: f32 },
    Resting,
}

/// Gravity drop of a dead hand onto the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fall {
    state: FallState,
}

impl Default for Fall {
    fn default() -> Self {
        Self {
            state: FallState::Falling { velocity: 0.0 },
        }
    }
}

impl Fall {
    /// One frame of the fall, starting from `height`.
    pub fn step(&mut self, height: f32) -> FallStep {
        match self.state {
            FallState::Resting => FallStep::Resting,
            FallState::Falling { velocity } => {
                let velocity = velocity + GRAVITY;
                let height = height + velocity;

                if height <= FLOOR_THRESHOLD {
                    self.state = FallState::Resting;
                    FallStep::Landed
                } else {
                    self.state = FallState::Falling { velocity };
                    FallStep::Falling { height }
                }
            }
        }
    }

    pub fn velocity(&self) -> f32 {
        match self.state {
            FallState::Falling { velocity } => velocity,
            FallState::Resting => 0.0,
        }
    }

    pub fn is_resting(&self) -> bool {
        self.state == FallState::Resting
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn random_max_life_is_seven_to_ten() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let life = LifeCounter::random(&mut rng);
            assert!((7..=10).contains(&life.max_life()));
            assert_eq!(life.current(), life.max_life());
        }
    }

    #[test]
    fn death_fires_exactly_once() {
        for max_life in 7..=10 {
            let mut life = LifeCounter::new(max_life);
            let mut deaths = 0;

            for _ in 0..max_life + 5 {
                if life.hit() == HitOutcome::Died {
                    deaths += 1;
                }
            }

            assert_eq!(deaths, 1);
            assert_eq!(life.current(), 0);
            assert!(life.is_dead());
            assert_eq!(life.hit(), HitOutcome::AlreadyDead);
        }
    }

    #[test]
    fn dies_on_the_last_point_of_life() {
        let mut life = LifeCounter::new(7);
        for _ in 0..6 {
            assert!(matches!(life.hit(), HitOutcome::Damaged { .. }));
        }
        assert_eq!(life.hit(), HitOutcome::Died);
    }

    #[test]
    fn background_drifts_away_from_origin_monotonically() {
        let origin = Color::from_srgb_hex(ORIGIN_BACKGROUND);
        let mut life = LifeCounter::new(10);
        let mut previous = 0.0;

        for _ in 0..12 {
            life.hit();
            let grade = DamageGrade::for_fraction_lost(life.fraction_lost());
            let distance = grade.background.distance(origin);
            assert!(distance >= previous);
            previous = distance;
        }

        assert!(previous > 0.0);
    }

    #[test]
    fn grade_endpoints() {
        let untouched = DamageGrade::for_fraction_lost(0.0);
        assert_eq!(untouched.background, Color::from_srgb_hex(ORIGIN_BACKGROUND));
        assert_eq!(untouched.bokeh_scale, 2.0);
        assert_eq!(untouched.bloom_intensity, 1.2);
        assert_eq!(untouched.hue, 0.0);
        assert_eq!(untouched.saturation, 0.0);

        let dead = DamageGrade::for_fraction_lost(1.0);
        assert_eq!(dead.bokeh_scale, 10.0);
        assert!((dead.bloom_intensity - 4.2).abs() < 1e-6);
        assert!((dead.hue + 0.3).abs() < 1e-6);
        assert!((dead.saturation - 0.4).abs() < 1e-6);

        let expected = Color::from_srgb_hex(ORIGIN_BACKGROUND)
            .lerp(Color::from_srgb_hex(BLOOD_BACKGROUND), 0.6);
        assert!(dead.background.distance(expected) < 1e-6);
    }

    #[test]
    fn grade_writes_post_settings() {
        let mut background = Color::BLACK;
        let mut post = PostProcessSettings::default();

        DamageGrade::for_fraction_lost(0.5).apply(&mut background, &mut post);

        assert_eq!(post.depth_of_field.bokeh_scale, 6.0);
        assert!((post.bloom.intensity - 2.7).abs() < 1e-6);
        assert!((post.hue_saturation.hue + 0.15).abs() < 1e-6);
        assert!((post.hue_saturation.saturation - 0.2).abs() < 1e-6);
        assert_ne!(background, Color::BLACK);
    }

    #[test]
    fn fall_follows_per_frame_gravity() {
        let y0 = START_POSITION.y;
        let mut fall = Fall::default();
        let mut height = y0;
        let mut n = 0;

        loop {
            match fall.step(height) {
                FallStep::Falling { height: next } => {
                    n += 1;
                    height = next;
                    let expected = y0 + GRAVITY * (n * (n + 1)) as f32 / 2.0;
                    assert!((height - expected).abs() < 1e-5);
                }
                FallStep::Landed => break,
                FallStep::Resting => panic!("resting before landing"),
            }
        }

        // Six frames of falling from y = 1 reach 0.58; the seventh would be 0.44.
        assert_eq!(n, 6);
        assert!(fall.is_resting());
        assert_eq!(fall.velocity(), 0.0);
    }

    #[test]
    fn landing_happens_once() {
        let mut fall = Fall::default();
        assert_eq!(fall.step(0.51), FallStep::Landed);

        for _ in 0..10 {
            assert_eq!(fall.step(RESTING_HEIGHT), FallStep::Resting);
        }
    }

    #[test]
    fn start_pose_faces_the_camera() {
        let facing = start_rotation() * Vec3::X;
        assert!((facing - Vec3::Z).length() < 1e-5);

        let resting = resting_rotation();
        assert!(resting.is_normalized());
        assert!(resting.angle_between(start_rotation()) > 0.5);
    }
}
