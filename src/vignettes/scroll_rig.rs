use glam::Vec3;

use crate::math::easing::{damp, lerp, smoothstep};

pub const MAX_SCROLL: f32 = 3000.0;
/// Rate of the exponential approach of the displayed offset, per second.
pub const SCROLL_RATE: f32 = 4.0;
pub const TOUCH_FACTOR: f32 = 2.0;
pub const WIDE_VIEWPORT: f32 = 768.0;

const OBJECT_HEIGHT: (f32, f32) = (2.0, -0.2);
const OBJECT_SCALE: (f32, f32) = (0.6, 1.4);
const FLOAT_FREQUENCY: (f32, f32) = (1.0, 3.0);
const FLOAT_AMPLITUDE: (f32, f32) = (0.3, 0.05);
const CAMERA_HEIGHT: (f32, f32) = (1.5, 0.4);
const CAMERA_DEPTH_START: f32 = 6.0;
const CAMERA_DEPTH_END_WIDE: f32 = 2.5;
const CAMERA_DEPTH_END_NARROW: f32 = 4.0;
const ORBIT_START: f32 = 0.6;
const ORBIT_RADIUS: f32 = 1.5;

/// Wheel and touch input smoothed into a scroll offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollState {
    target: f32,
    displayed: f32,
    max_scroll: f32,
    rate: f32,
}

impl Default for ScrollState {
    fn default() -> Self {
        Self::new(MAX_SCROLL, SCROLL_RATE)
    }
}

impl ScrollState {
    pub fn new(max_scroll: f32, rate: f32) -> Self {
        Self {
            target: 0.0,
            displayed: 0.0,
            max_scroll: max_scroll.max(f32::EPSILON),
            rate,
        }
    }

    /// Positive deltas scroll forward.
    pub fn scroll_by(&mut self, delta: f32) {
        if delta.is_finite() {
            self.target = (self.target + delta).clamp(0.0, self.max_scroll);
        }
    }

    /// Finger moving up the screen scrolls forward.
    pub fn touch_moved(&mut self, previous_y: f32, current_y: f32) {
        self.scroll_by((previous_y - current_y) * TOUCH_FACTOR);
    }

    pub fn update(&mut self, dt: f32) {
        self.displayed = damp(self.displayed, self.target, self.rate, dt.max(0.0));
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn displayed(&self) -> f32 {
        self.displayed
    }

    /// Eased progress in `[0, 1]`.
    pub fn progress(&self) -> f32 {
        smoothstep(self.displayed / self.max_scroll)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigPose {
    pub object_position: Vec3,
    pub object_scale: f32,
    pub camera_position: Vec3,
    /// The camera always looks at the object.
    pub camera_target: Vec3,
}

/// Pose of the object and camera for eased `progress` at `time` seconds.
pub fn rig_pose(progress: f32, time: f32, viewport_width: f32) -> RigPose {
    let p = progress.clamp(0.0, 1.0);
    let mix = |(start, end): (f32, f32)| lerp(start, end, p);

    let frequency = mix(FLOAT_FREQUENCY);
    let amplitude = mix(FLOAT_AMPLITUDE);
    let float = Vec3::new(
        amplitude * (frequency * time).sin(),
        0.0,
        amplitude * (0.5 * frequency * time).sin(),
    );

    let object_position = Vec3::new(0.0, mix(OBJECT_HEIGHT), 0.0) + float;

    let depth_end = if viewport_width >= WIDE_VIEWPORT {
        CAMERA_DEPTH_END_WIDE
    } else {
        CAMERA_DEPTH_END_NARROW
    };

    let orbit_strength = ((p - ORBIT_START) / (1.0 - ORBIT_START)).clamp(0.0, 1.0);
    let orbit = ORBIT_RADIUS
        * orbit_strength
        * Vec3::new((0.5 * time).sin(), 0.0, 1.0 - (0.5 * time).cos());

    let camera_position = Vec3::new(
        0.0,
        mix(CAMERA_HEIGHT),
        lerp(CAMERA_DEPTH_START, depth_end, p),
    ) + orbit;

    RigPose {
        object_position,
        object_scale: mix(OBJECT_SCALE),
        camera_position,
        camera_target: object_position,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_stays_within_bounds() {
        let mut scroll = ScrollState::default();
        for _ in 0..10 {
            scroll.scroll_by(2000.0);
        }
        assert_eq!(scroll.target(), MAX_SCROLL);

        for _ in 0..10 {
            scroll.scroll_by(-2000.0);
        }
        assert_eq!(scroll.target(), 0.0);

        scroll.scroll_by(f32::NAN);
        assert_eq!(scroll.target(), 0.0);
    }

    #[test]
    fn touch_swipe_up_scrolls_forward() {
        let mut scroll = ScrollState::default();
        scroll.touch_moved(500.0, 400.0);
        assert_eq!(scroll.target(), 200.0);
    }

    #[test]
    fn displayed_value_converges() {
        let mut scroll = ScrollState::default();
        scroll.scroll_by(1200.0);

        let mut previous_gap = f32::MAX;
        for _ in 0..120 {
            scroll.update(1.0 / 60.0);
            let gap = (scroll.target() - scroll.displayed()).abs();
            assert!(gap < previous_gap);
            previous_gap = gap;
        }

        for _ in 0..480 {
            scroll.update(1.0 / 60.0);
        }
        assert!((scroll.target() - scroll.displayed()).abs() < 1e-3);
    }

    #[test]
    fn start_pose_is_exact() {
        for width in [400.0, 1280.0] {
            let pose = rig_pose(0.0, 0.0, width);
            assert_eq!(pose.object_position, Vec3::new(0.0, 2.0, 0.0));
            assert_eq!(pose.object_scale, 0.6);
            assert_eq!(pose.camera_position, Vec3::new(0.0, 1.5, 6.0));
            assert_eq!(pose.camera_target, pose.object_position);
        }
    }

    #[test]
    fn end_pose_is_exact() {
        let wide = rig_pose(1.0, 0.0, 1280.0);
        assert_eq!(wide.object_position, Vec3::new(0.0, -0.2, 0.0));
        assert_eq!(wide.object_scale, 1.4);
        assert_eq!(wide.camera_position, Vec3::new(0.0, 0.4, 2.5));

        let narrow = rig_pose(1.0, 0.0, 400.0);
        assert_eq!(narrow.camera_position, Vec3::new(0.0, 0.4, 4.0));
    }

    #[test]
    fn pose_is_deterministic() {
        let a = rig_pose(0.73, 12.5, 900.0);
        let b = rig_pose(0.73, 12.5, 900.0);
        assert_eq!(a, b);
    }

    #[test]
    fn orbit_only_past_threshold() {
        let before = rig_pose(0.5, 3.0, 1280.0);
        assert_eq!(before.camera_position.x, 0.0);

        let after = rig_pose(0.9, 3.0, 1280.0);
        assert!(after.camera_position.x.abs() > 0.1);
    }

    #[test]
    fn progress_is_eased() {
        let mut scroll = ScrollState::new(100.0, 1000.0);
        scroll.scroll_by(25.0);
        scroll.update(1.0);
        assert!((scroll.progress() - smoothstep(0.25)).abs() < 1e-5);
    }
}
