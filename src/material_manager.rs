use std::{collections::HashMap, sync::Arc};

use glam::{Vec3, Vec4};
use id_arena::{Arena, Id};

use crate::asset_pipeline::materials::{ImageData, PbrMaterialData};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GltfMaterialKey {
    pub file_name: String,
    pub material_index: usize,
}

pub type MaterialId = Id<PbrMaterialData>;

pub struct MaterialManager {
    materials: Arena<PbrMaterialData>,
    materials_by_gltf: HashMap<GltfMaterialKey, MaterialId>,
    // Bumped on every mutable access so the renderer knows to re-upload.
    revision: u64,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: Arena::new(),
            materials_by_gltf: HashMap::new(),
            revision: 0,
        }
    }

    pub fn add_material(&mut self, material_data: PbrMaterialData) -> MaterialId {
        self.revision += 1;
        self.materials.alloc(material_data)
    }

    pub fn get(&self, id: MaterialId) -> Option<&PbrMaterialData> {
        self.materials.get(id)
    }

    pub fn get_mut(&mut self, id: MaterialId) -> Option<&mut PbrMaterialData> {
        self.revision += 1;
        self.materials.get_mut(id)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn get_gltf_material(&self, file_name: &str, material_index: usize) -> Option<MaterialId> {
        let key = GltfMaterialKey {
            file_name: file_name.to_string(),
            material_index,
        };
        self.materials_by_gltf.get(&key).cloned()
    }

    pub fn load_all_materials_from_gltf(
        &mut self,
        file_name: &str,
        document: &gltf::Document,
        images: &[gltf::image::Data],
    ) {
        let mut converted: HashMap<usize, Option<ImageData>> = HashMap::new();

        let mut image_for = |texture: gltf::Texture| -> Option<ImageData> {
            let image_index = texture.source().index();
            converted
                .entry(image_index)
                .or_insert_with(|| {
                    let data = images.get(image_index)?;
                    match convert_image_data_to_rgba(data) {
                        Some(image) => Some(image),
                        None => {
                            log::warn!(
                                "{}: unsupported image format {:?} (image {})",
                                file_name,
                                data.format,
                                image_index
                            );
                            None
                        }
                    }
                })
                .clone()
        };

        for material in document.materials() {
            let Some(material_index) = material.index() else {
                continue;
            };

            let key = GltfMaterialKey {
                file_name: file_name.to_string(),
                material_index,
            };

            if self.materials_by_gltf.contains_key(&key) {
                continue;
            }

            let pbr = material.pbr_metallic_roughness();

            let material_data = PbrMaterialData {
                name: material.name().unwrap_or("Unnamed material").to_string(),
                base_color_factor: Vec4::from(pbr.base_color_factor()),
                emissive_factor: Vec3::from(material.emissive_factor()),
                metallic: pbr.metallic_factor(),
                roughness: pbr.roughness_factor(),
                normal_scale: material.normal_texture().map_or(1.0, |n| n.scale()),
                env_intensity: 1.0,
                double_sided: material.double_sided(),
                base_color: pbr
                    .base_color_texture()
                    .and_then(|info| image_for(info.texture())),
                normal: material
                    .normal_texture()
                    .and_then(|info| image_for(info.texture())),
                metallic_roughness: pbr
                    .metallic_roughness_texture()
                    .and_then(|info| image_for(info.texture())),
            };

            let id = self.add_material(material_data);
            self.materials_by_gltf.insert(key, id);
        }
    }

    /// Materials loaded from `file_name`.
    pub fn gltf_materials(&self, file_name: &str) -> Vec<MaterialId> {
        self.materials_by_gltf
            .iter()
            .filter(|(key, _)| key.file_name == file_name)
            .map(|(_, id)| *id)
            .collect()
    }

    /// Applies `patch` to each listed material.
    pub fn patch<F>(&mut self, ids: &[MaterialId], mut patch: F)
    where
        F: FnMut(&mut PbrMaterialData),
    {
        for id in ids {
            if let Some(material) = self.get_mut(*id) {
                patch(material);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialId, &PbrMaterialData)> {
        self.materials.iter()
    }

    pub fn draw_ui(&self, ui: &imgui::Ui) {
        ui.window("Material manager").build(|| {
            ui.text("Materials:");
            ui.separator();

            for (id, material) in self.materials.iter() {
                ui.text(format!(
                    "{}: {} (env {:.2}, rough {:.2}, metal {:.2})",
                    id.index(),
                    material.name,
                    material.env_intensity,
                    material.roughness,
                    material.metallic
                ));
            }
        });
    }
}

fn convert_image_data_to_rgba(data: &gltf::image::Data) -> Option<ImageData> {
    use gltf::image::Format;

    let pixels = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => data
            .pixels
            .chunks_exact(3)
            .flat_map(|p| [p[0], p[1], p[2], 255])
            .collect(),
        Format::R8G8 => data
            .pixels
            .chunks_exact(2)
            .flat_map(|p| [p[0], p[1], 0, 255])
            .collect(),
        Format::R8 => data.pixels.iter().flat_map(|&p| [p, p, p, 255]).collect(),
        _ => return None,
    };

    Some(ImageData {
        width: data.width,
        height: data.height,
        pixels: Arc::new(pixels),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_touches_only_listed_materials() {
        let mut manager = MaterialManager::new();
        let a = manager.add_material(PbrMaterialData::solid("a", Vec3::ONE));
        let b = manager.add_material(PbrMaterialData::solid("b", Vec3::ONE));
        let revision = manager.revision();

        manager.patch(&[a], |material| {
            material.env_intensity = 0.15;
            material.roughness = 0.9;
        });

        assert_eq!(manager.get(a).unwrap().env_intensity, 0.15);
        assert_eq!(manager.get(a).unwrap().roughness, 0.9);
        assert_eq!(manager.get(b).unwrap().env_intensity, 1.0);
        assert!(manager.revision() > revision);
    }

    #[test]
    fn rgb_images_gain_opaque_alpha() {
        let data = gltf::image::Data {
            pixels: vec![1, 2, 3, 4, 5, 6],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };

        let image = convert_image_data_to_rgba(&data).unwrap();
        assert_eq!(*image.pixels, vec![1, 2, 3, 255, 4, 5, 6, 255]);
    }
}
