use glam::{Mat4, Vec3};

use crate::math::color::Color;

#[derive(Debug, Clone, Copy)]
pub struct ShadowCamera {
    /// Half-extent of the square orthographic frustum.
    pub size: f32,
    pub near: f32,
    pub far: f32,
    pub map_size: u32,
}

impl Default for ShadowCamera {
    fn default() -> Self {
        Self {
            size: 2.0,
            near: 0.5,
            far: 10.0,
            map_size: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DirectionalLight {
    pub position: Vec3,
    pub target: Vec3,
    pub color: Color,
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow: ShadowCamera,
}

impl DirectionalLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            position: Vec3::new(0.0, 1.0, 0.0),
            target: Vec3::ZERO,
            color,
            intensity,
            cast_shadow: false,
            shadow: ShadowCamera::default(),
        }
    }

    /// Unit vector pointing from the lit surface towards the light.
    pub fn direction_to_light(&self) -> Vec3 {
        (self.position - self.target).normalize_or(Vec3::Y)
    }

    pub fn radiance(&self) -> Vec3 {
        self.color.0 * self.intensity
    }

    pub fn view_projection(&self) -> Mat4 {
        let direction = self.direction_to_light();
        let up = if direction.abs_diff_eq(Vec3::Y, 1e-3) || direction.abs_diff_eq(-Vec3::Y, 1e-3) {
            Vec3::Z
        } else {
            Vec3::Y
        };

        let view = Mat4::look_at_rh(self.position, self.target, up);
        let s = self.shadow.size;
        let projection = Mat4::orthographic_rh(-s, s, -s, s, self.shadow.near, self.shadow.far);

        projection * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn light_target_lands_in_shadow_map() {
        let mut light = DirectionalLight::new(Color::WHITE, 2.0);
        light.position = Vec3::new(0.0, 5.0, 5.0);

        let clip = light.view_projection() * Vec3::ZERO.extend(1.0);
        assert!(clip.x.abs() < 1e-5 && clip.y.abs() < 1e-5);
        assert!(clip.z > 0.0 && clip.z < 1.0);
    }

    #[test]
    fn straight_down_light_has_valid_basis() {
        let mut light = DirectionalLight::new(Color::WHITE, 1.0);
        light.position = Vec3::new(0.0, 5.0, 0.0);

        assert!(light.view_projection().is_finite());
    }
}
