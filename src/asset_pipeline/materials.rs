use std::sync::Arc;

use glam::{Vec3, Vec4};

/// Decoded RGBA8 image shared between materials that use the same glTF image.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct PbrMaterialData {
    pub name: String,
    pub base_color_factor: Vec4,
    pub emissive_factor: Vec3,
    pub metallic: f32,
    pub roughness: f32,
    pub normal_scale: f32,
    /// Scales the contribution of the environment map. Zero until the scene
    /// gets an environment.
    pub env_intensity: f32,
    pub double_sided: bool,
    pub base_color: Option<ImageData>,
    pub normal: Option<ImageData>,
    pub metallic_roughness: Option<ImageData>,
}

impl PbrMaterialData {
    pub fn solid(name: impl Into<String>, base_color: Vec3) -> Self {
        Self {
            name: name.into(),
            base_color_factor: base_color.extend(1.0),
            emissive_factor: Vec3::ZERO,
            metallic: 0.0,
            roughness: 1.0,
            normal_scale: 1.0,
            env_intensity: 1.0,
            double_sided: false,
            base_color: None,
            normal: None,
            metallic_roughness: None,
        }
    }
}
