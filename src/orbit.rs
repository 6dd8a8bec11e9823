use std::f32::consts::PI;

use glam::{Vec2, Vec3};

use crate::camera::Camera;

/// Drag-to-orbit and wheel-to-zoom around a fixed target.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    radius: f32,
    // Angle from +Y
    polar: f32,
    // Angle around +Y, measured from +Z
    azimuth: f32,
}

impl OrbitControls {
    const MIN_POLAR: f32 = 0.01;
    const MAX_POLAR: f32 = PI - 0.01;

    /// Starts from the camera's current eye position, then turns the camera to
    /// face `target`.
    pub fn new(camera: &mut Camera, target: Vec3) -> Self {
        let offset = camera.eye - target;
        let radius = offset.length().max(1e-4);
        let polar = (offset.y / radius).clamp(-1.0, 1.0).acos();
        let azimuth = offset.x.atan2(offset.z);

        let controls = Self {
            target,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.5,
            max_distance: 50.0,
            radius,
            polar: polar.clamp(Self::MIN_POLAR, Self::MAX_POLAR),
            azimuth,
        };

        controls.apply(camera);
        controls
    }

    /// `delta` is the cursor travel in logical pixels; `viewport_height` maps a
    /// full-height drag to one full turn.
    pub fn rotate(&mut self, camera: &mut Camera, delta: Vec2, viewport_height: f32) {
        let scale = 2.0 * PI * self.rotate_speed / viewport_height.max(1.0);
        self.azimuth -= delta.x * scale;
        self.polar = (self.polar - delta.y * scale).clamp(Self::MIN_POLAR, Self::MAX_POLAR);
        self.apply(camera);
    }

    /// Positive `steps` zoom in.
    pub fn zoom(&mut self, camera: &mut Camera, steps: f32) {
        let factor = 0.95_f32.powf(steps * self.zoom_speed);
        self.radius = (self.radius * factor).clamp(self.min_distance, self.max_distance);
        self.apply(camera);
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    fn apply(&self, camera: &mut Camera) {
        let (sin_polar, cos_polar) = self.polar.sin_cos();
        let (sin_azimuth, cos_azimuth) = self.azimuth.sin_cos();
        let offset = Vec3::new(
            sin_polar * sin_azimuth,
            cos_polar,
            sin_polar * cos_azimuth,
        ) * self.radius;

        camera.eye = self.target + offset;
        camera.look_at(self.target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(eye: Vec3) -> Camera {
        let mut camera = Camera::perspective(75.0, 1.0, 0.1, 1000.0);
        camera.eye = eye;
        camera
    }

    #[test]
    fn construction_keeps_eye_and_faces_target() {
        let mut camera = camera_at(Vec3::new(0.0, 1.0, 4.0));
        let controls = OrbitControls::new(&mut camera, Vec3::ZERO);

        assert!((camera.eye - Vec3::new(0.0, 1.0, 4.0)).length() < 1e-5);
        assert_eq!(camera.target, Vec3::ZERO);
        assert!((controls.distance() - 17.0_f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn rotation_keeps_distance() {
        let mut camera = camera_at(Vec3::new(0.0, 1.0, 4.0));
        let mut controls = OrbitControls::new(&mut camera, Vec3::ZERO);
        controls.rotate(&mut camera, Vec2::new(120.0, -40.0), 600.0);

        assert!((camera.eye.length() - controls.distance()).abs() < 1e-4);
    }

    #[test]
    fn polar_angle_never_flips_over_the_pole() {
        let mut camera = camera_at(Vec3::new(0.0, 1.0, 4.0));
        let mut controls = OrbitControls::new(&mut camera, Vec3::ZERO);
        controls.rotate(&mut camera, Vec2::new(0.0, 10_000.0), 600.0);

        assert!(camera.eye.y > 0.0);
        assert!(camera.eye.y <= controls.distance());
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 4.0));
        let mut controls = OrbitControls::new(&mut camera, Vec3::ZERO);

        controls.zoom(&mut camera, 1000.0);
        assert_eq!(controls.distance(), controls.min_distance);

        controls.zoom(&mut camera, -1000.0);
        assert_eq!(controls.distance(), controls.max_distance);
    }
}
