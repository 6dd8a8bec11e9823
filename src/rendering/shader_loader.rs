use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, channel},
        Arc, RwLock,
    },
    time::Duration,
};

use anyhow::{anyhow, Context};
use id_arena::{Arena, Id};
use naga::{
    back::wgsl::WriterFlags,
    valid::{Capabilities, ValidationFlags},
};
use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
};
use notify_debouncer_mini::{
    new_debouncer_opt, notify::*, DebounceEventResult, DebouncedEventKind, Debouncer,
};
use pollster::block_on;
use wgpu::{naga, PollType, RenderPipeline};

const SHARED_MODULES_FOLDER: &str = "shared";

pub type PipelineFactory =
    Box<dyn Sync + Send + Fn(&wgpu::Device, &wgpu::ShaderModule) -> wgpu::RenderPipeline>;

#[derive(Debug, Clone)]
pub struct ShaderDefinition {
    pub name: &'static str,
    pub path: &'static str,
}

pub struct ShaderEntry {
    pipeline_id: PipelineId,
    def: ShaderDefinition,
    factory: PipelineFactory,
}

pub type PipelineId = Id<PipelineCacheEntry>;

#[derive(Default)]
pub struct PipelineCacheEntry(Option<wgpu::RenderPipeline>);

impl PipelineCacheEntry {
    pub fn set_pipeline(&mut self, pipeline: wgpu::RenderPipeline) {
        self.0 = Some(pipeline);
    }
}

pub struct PipelineCacheBuilder {
    shaders: Arena<ShaderEntry>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCacheBuilder {
    pub fn new() -> Self {
        Self {
            shaders: Arena::new(),
            pipelines: Arena::new(),
        }
    }

    /// Registers a pipeline built from `shader_def`. The same file may back
    /// several pipelines; all of them are rebuilt when it changes.
    pub fn add_shader(&mut self, shader_def: ShaderDefinition, factory: PipelineFactory) -> PipelineId {
        let pipeline_id = self.pipelines.alloc(PipelineCacheEntry::default());
        self.shaders.alloc(ShaderEntry {
            pipeline_id,
            def: shader_def,
            factory,
        });
        pipeline_id
    }

    pub fn build(self) -> PipelineCache {
        PipelineCache {
            shaders: Arc::new(self.shaders),
            pipelines: self.pipelines,
        }
    }
}

pub struct PipelineCache {
    shaders: Arc<Arena<ShaderEntry>>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCache {
    pub fn get(&self, id: PipelineId) -> Option<&RenderPipeline> {
        self.pipelines.get(id).and_then(|entry| entry.0.as_ref())
    }

    fn get_entry_mut(&mut self, id: PipelineId) -> Option<&mut PipelineCacheEntry> {
        self.pipelines.get_mut(id)
    }
}

struct CompiledPipeline {
    name: &'static str,
    pipeline_id: PipelineId,
    pipeline: wgpu::RenderPipeline,
}

/// Compiles every registered pipeline up front, then watches the shader folder
/// and recompiles on change in the watcher thread.
pub struct ShaderLoader {
    pub cache: PipelineCache,
    receiver: mpsc::Receiver<CompiledPipeline>,
    _debouncer: Debouncer<RecommendedWatcher>,
}

impl ShaderLoader {
    pub fn new(
        device: wgpu::Device,
        cache_builder: PipelineCacheBuilder,
        shader_root: &Path,
    ) -> anyhow::Result<Self> {
        let mut cache = cache_builder.build();
        let shader_root = shader_root
            .canonicalize()
            .with_context(|| format!("Shader folder {} not found", shader_root.display()))?;

        let composer = Arc::new(RwLock::new(create_composer(&shader_root)?));

        let shaders = cache.shaders.clone();
        for (_, entry) in shaders.iter() {
            let pipeline = compile_file(&device, &shader_root, entry, &composer)
                .with_context(|| format!("Failed to compile shader: {}", entry.def.name))?;
            if let Some(cache_entry) = cache.get_entry_mut(entry.pipeline_id) {
                cache_entry.set_pipeline(pipeline);
            }
        }

        let (sender, receiver) = channel();
        let watched_root = shader_root.clone();

        let mut debouncer = new_debouncer_opt(
            notify_debouncer_mini::Config::default().with_timeout(Duration::from_millis(100)),
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    for event in events {
                        if event.kind != DebouncedEventKind::Any {
                            continue;
                        }

                        reload_changed(
                            &device,
                            &watched_root,
                            &shaders,
                            &composer,
                            &event.path,
                            &sender,
                        );
                    }
                }
                Err(e) => log::warn!("Error watching shaders: {}", e),
            },
        )
        .context("Failed to create shader watcher")?;

        debouncer
            .watcher()
            .watch(&shader_root, RecursiveMode::Recursive)
            .context("Failed to watch shader folder")?;

        Ok(Self {
            cache,
            receiver,
            _debouncer: debouncer,
        })
    }

    pub fn load_pending_shaders(&mut self) {
        while let Ok(compiled) = self.receiver.try_recv() {
            if let Some(entry) = self.cache.get_entry_mut(compiled.pipeline_id) {
                log::info!("Shader reloaded: {}", compiled.name);
                entry.set_pipeline(compiled.pipeline);
            }
        }
    }
}

fn reload_changed(
    device: &wgpu::Device,
    shader_root: &Path,
    shaders: &Arena<ShaderEntry>,
    composer: &RwLock<Composer>,
    changed: &Path,
    sender: &mpsc::Sender<CompiledPipeline>,
) {
    let shared_changed = changed
        .parent()
        .is_some_and(|parent| parent.ends_with(SHARED_MODULES_FOLDER));

    if shared_changed {
        // Imports are resolved when modules are added, so start from scratch.
        match create_composer(shader_root) {
            Ok(fresh) => match composer.write() {
                Ok(mut composer) => *composer = fresh,
                Err(_) => return,
            },
            Err(e) => {
                log::error!("Failed to reload shared shader modules: {:#}", e);
                return;
            }
        }
    }

    for (_, entry) in shaders.iter() {
        if !shared_changed && !changed.ends_with(entry.def.path) {
            continue;
        }

        match compile_file(device, shader_root, entry, composer) {
            Ok(pipeline) => {
                let compiled = CompiledPipeline {
                    name: entry.def.name,
                    pipeline_id: entry.pipeline_id,
                    pipeline,
                };
                if sender.send(compiled).is_err() {
                    return;
                }
            }
            Err(e) => log::error!("Failed to reload shader {}: {:#}", entry.def.name, e),
        }
    }
}

fn compile_file(
    device: &wgpu::Device,
    shader_root: &Path,
    entry: &ShaderEntry,
    composer: &RwLock<Composer>,
) -> anyhow::Result<wgpu::RenderPipeline> {
    let path = shader_root.join(entry.def.path);
    let shader_code = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read shader file {}", path.display()))?;

    let file_path = path.to_string_lossy().to_string();

    let module = {
        let mut composer = composer
            .write()
            .map_err(|_| anyhow!("Shader composer lock poisoned"))?;

        composer
            .make_naga_module(NagaModuleDescriptor {
                file_path: &file_path,
                source: &shader_code,
                ..Default::default()
            })
            .map_err(|e| anyhow!("{}", e.emit_to_string(&composer)))
            .context("Failed to create Naga module from shader code")?
    };

    // wgpu validates again when the module is created; this pass only needs
    // enough info to write the composed module back out.
    let info = naga::valid::Validator::new(ValidationFlags::empty(), Capabilities::all())
        .validate(&module)
        .context("Failed to validate Naga module")?;

    let shader_code = naga::back::wgsl::write_string(&module, &info, WriterFlags::empty())
        .context("Failed to convert Naga module to WGSL string")?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(entry.def.name),
        source: wgpu::ShaderSource::Wgsl(shader_code.into()),
    });
    let pipeline = (entry.factory)(device, &shader_module);

    device
        .poll(PollType::Wait)
        .context("Failed to poll device after shader compilation")?;

    if let Some(error) = block_on(device.pop_error_scope()) {
        return Err(anyhow!(
            "Shader compilation failed for {}: {}",
            entry.def.name,
            error
        ));
    }

    Ok(pipeline)
}

fn create_composer(shader_root: &Path) -> anyhow::Result<Composer> {
    let shared_folder: PathBuf = shader_root.join(SHARED_MODULES_FOLDER);
    let shared_files = std::fs::read_dir(&shared_folder).with_context(|| {
        format!(
            "Failed to read shared shader modules from {}",
            shared_folder.display()
        )
    })?;

    let mut paths = shared_files
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.retain(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "wgsl"));
    // Shared modules don't import each other, so any order works.
    paths.sort();

    let mut composer = Composer::default();

    for path in paths {
        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_path = path.to_string_lossy().to_string();

        let result = composer
            .add_composable_module(ComposableModuleDescriptor {
                source: &source,
                file_path: &file_path,
                language: ShaderLanguage::Wgsl,
                ..Default::default()
            })
            .map(|_| ());

        if let Err(e) = result {
            return Err(anyhow!("{}", e.emit_to_string(&composer)))
                .with_context(|| format!("Failed to add shared shader module: {}", file_path));
        }
    }

    Ok(composer)
}
