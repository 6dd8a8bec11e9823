use std::path::{Path, PathBuf};

use crate::asset_pipeline::environment::EnvironmentMap;

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("Failed to load model {path}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("Failed to read environment {path}: {source}")]
    EnvironmentIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode environment {path}: {source}")]
    EnvironmentDecode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Asset load task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Files one vignette needs, relative to the asset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    pub models: Vec<String>,
    pub environment: String,
}

impl AssetManifest {
    pub fn new(models: &[&str], environment: &str) -> Self {
        Self {
            models: models.iter().map(|model| model.to_string()).collect(),
            environment: environment.to_string(),
        }
    }
}

pub struct ModelAsset {
    /// Manifest name, also used to key the model's materials.
    pub file_name: String,
    pub document: gltf::Document,
    pub buffers: Vec<gltf::buffer::Data>,
    pub images: Vec<gltf::image::Data>,
}

impl ModelAsset {
    pub fn default_scene(&self) -> Option<gltf::Scene> {
        self.document
            .default_scene()
            .or_else(|| self.document.scenes().next())
    }
}

/// Everything a manifest names, in manifest order.
pub struct LoadedAssets {
    pub models: Vec<ModelAsset>,
    pub environment: EnvironmentMap,
}

/// Loads every model and the panorama concurrently. The first failure wins;
/// the remaining loads are left to finish on their own.
pub async fn load_assets(root: &Path, manifest: &AssetManifest) -> Result<LoadedAssets, AssetError> {
    log::info!(
        "Loading {} model(s) and {} from {}",
        manifest.models.len(),
        manifest.environment,
        root.display()
    );

    let (models, environment) = tokio::try_join!(
        load_models(root, &manifest.models),
        load_environment(root.join(&manifest.environment)),
    )?;

    Ok(LoadedAssets {
        models,
        environment,
    })
}

async fn load_models(root: &Path, models: &[String]) -> Result<Vec<ModelAsset>, AssetError> {
    // Spawn everything first so the imports overlap.
    let handles = models
        .iter()
        .map(|file_name| {
            let file_name = file_name.clone();
            let path = root.join(&file_name);

            tokio::task::spawn_blocking(move || -> Result<ModelAsset, AssetError> {
                let (document, buffers, images) = gltf::import(&path)
                    .map_err(|source| AssetError::Model { path, source })?;

                Ok(ModelAsset {
                    file_name,
                    document,
                    buffers,
                    images,
                })
            })
        })
        .collect::<Vec<_>>();

    let mut loaded = Vec::with_capacity(handles.len());
    for handle in handles {
        let model = handle.await??;
        log::info!("Loaded model {}", model.file_name);
        loaded.push(model);
    }

    Ok(loaded)
}

async fn load_environment(path: PathBuf) -> Result<EnvironmentMap, AssetError> {
    let environment = tokio::task::spawn_blocking(move || -> Result<_, AssetError> {
        let bytes = std::fs::read(&path).map_err(|source| AssetError::EnvironmentIo {
            path: path.clone(),
            source,
        })?;

        EnvironmentMap::from_hdr_bytes(&bytes)
            .map_err(|source| AssetError::EnvironmentDecode { path, source })
    })
    .await??;

    Ok(environment)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Uncompressed Radiance file with every pixel set to 1.0.
    fn write_flat_hdr(path: &Path, width: usize, height: usize) {
        let mut file = std::fs::File::create(path).unwrap();
        write!(
            file,
            "#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y {} +X {}\n",
            height, width
        )
        .unwrap();

        for _ in 0..width * height {
            file.write_all(&[128, 128, 128, 129]).unwrap();
        }
    }

    #[tokio::test]
    async fn loads_environment_without_models() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("hdr")).unwrap();
        write_flat_hdr(&dir.path().join("hdr/flat.hdr"), 4, 2);

        let manifest = AssetManifest::new(&[], "hdr/flat.hdr");
        let assets = load_assets(dir.path(), &manifest).await.unwrap();

        assert!(assets.models.is_empty());
        assert_eq!(assets.environment.base_size(), (256, 128));
    }

    #[tokio::test]
    async fn missing_model_fails_the_whole_load() {
        let dir = tempfile::tempdir().unwrap();
        write_flat_hdr(&dir.path().join("sky.hdr"), 4, 2);

        let manifest = AssetManifest::new(&["models/the_hand.glb"], "sky.hdr");
        let error = load_assets(dir.path(), &manifest).await.err().unwrap();

        match error {
            AssetError::Model { path, .. } => assert!(path.ends_with("models/the_hand.glb")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_panorama_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = AssetManifest::new(&[], "hdr/missing.hdr");

        let error = load_assets(dir.path(), &manifest).await.err().unwrap();
        assert!(matches!(error, AssetError::EnvironmentIo { .. }));
    }

    #[tokio::test]
    async fn garbage_panorama_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sky.hdr"), b"not a radiance file").unwrap();
        let manifest = AssetManifest::new(&[], "sky.hdr");

        let error = load_assets(dir.path(), &manifest).await.err().unwrap();
        assert!(matches!(error, AssetError::EnvironmentDecode { .. }));
        assert!(error.to_string().contains("sky.hdr"));
    }
}
