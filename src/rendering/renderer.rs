use std::{path::Path, sync::Arc, time::Instant};

use anyhow::Context;
use id_arena::Arena;
use wgpu::CommandEncoderDescriptor;
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    demo::DemoState,
    rendering::{
        common::{PhysicalSizeExt, Resolution},
        config::RenderConfig,
        environment_texture::EnvironmentTexture,
        global_uniform::GlobalUniformState,
        imgui_renderer::ImguiRenderer,
        passes::{
            bloom_pass::BloomPass,
            composite_pass::{CompositePass, CompositeUniform},
            fxaa_pass::FxaaPass,
            pbr_pass::{LightingViews, PbrPass},
            render_pass_context::{PassCreationContext, RenderPassContext},
            shadow_pass::ShadowPass,
        },
        render_common::RenderCommon,
        render_material_manager::RenderMaterialManager,
        render_model::RenderModel,
        render_object::RenderObjects,
        render_targets::RenderTargets,
        shader_loader::{PipelineCacheBuilder, ShaderLoader},
    },
    scene_graph::Scene,
};

/// A recorded frame waiting for the overlay and presentation.
pub struct Frame {
    output: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
    encoder: wgpu::CommandEncoder,
}

pub struct Renderer {
    pub window: Arc<Window>,
    surface_size: PhysicalSize<u32>,
    start_time: Instant,

    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,

    common: Arc<RenderCommon>,
    targets: RenderTargets,
    render_models: Arena<RenderModel>,
    objects: RenderObjects,
    materials: RenderMaterialManager,
    environment: EnvironmentTexture,

    shader_loader: ShaderLoader,

    shadow_pass: ShadowPass,
    pbr_pass: PbrPass,
    bloom_pass: BloomPass,
    composite_pass: CompositePass,
    fxaa_pass: FxaaPass,

    imgui_renderer: Option<ImguiRenderer>,
}

impl Renderer {
    pub async fn new(
        window: Arc<Window>,
        demo_state: &DemoState,
        config: &'static RenderConfig,
        imgui: Option<&mut imgui::Context>,
        shader_root: &Path,
    ) -> anyhow::Result<Renderer> {
        let surface_size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
        let surface = instance
            .create_surface(window.clone())
            .context("Failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;

        log::info!("Using adapter {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                label: None,
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Failed to create device")?;

        let common = Arc::new(RenderCommon::new(
            &device,
            &adapter,
            &surface,
            surface_size.to_resolution(),
        )?);

        let world = &demo_state.world;
        let targets = RenderTargets::new(
            &device,
            world.viewport.render_size(),
            config.bloom_downscale,
        );
        let objects = RenderObjects::new(&device);
        let materials = RenderMaterialManager::new(&device, &queue);
        let environment = EnvironmentTexture::new(&device, &queue);

        let mut cache_builder = PipelineCacheBuilder::new();
        let mut context = PassCreationContext {
            device: &device,
            config,
            common: common.clone(),
            cache_builder: &mut cache_builder,
        };

        let shadow_pass = ShadowPass::new(&mut context, &objects, &world.light);
        let pbr_pass = PbrPass::new(
            &mut context,
            &objects,
            &materials,
            LightingViews {
                shadow_map: shadow_pass.map_view(),
                shadow_sampler: shadow_pass.sampler(),
                environment: environment.view(),
            },
        );
        let bloom_pass = BloomPass::new(&mut context, &targets);
        let composite_pass = CompositePass::new(&mut context, &targets);
        let fxaa_pass = FxaaPass::new(&mut context, &targets);

        let shader_loader = ShaderLoader::new(device.clone(), cache_builder, shader_root)?;

        let imgui_renderer = imgui
            .map(|context| ImguiRenderer::new(&device, &queue, common.output_format, context));

        Ok(Self {
            window,
            surface_size,
            start_time: Instant::now(),
            surface,
            device,
            queue,
            common,
            targets,
            render_models: Arena::new(),
            objects,
            materials,
            environment,
            shader_loader,
            shadow_pass,
            pbr_pass,
            bloom_pass,
            composite_pass,
            fxaa_pass,
            imgui_renderer,
        })
    }

    /// Uploads scene models that don't have GPU buffers yet.
    fn upload_models(&mut self, scene: &mut Scene) {
        for (_id, scene_model) in scene.models.iter_mut() {
            if scene_model.render_model.is_some() {
                continue;
            }

            let render_model = RenderModel::from_model(&self.device, &scene_model.model);
            log::debug!(
                "Uploaded model {} with {} primitives",
                scene_model.name,
                render_model.primitives.len()
            );
            scene_model.render_model = Some(self.render_models.alloc(render_model));
        }
    }

    /// `surface_size` is the window's physical size; `render_size` is the size
    /// of the offscreen targets, which the pixel ratio cap can make smaller.
    pub fn resize(&mut self, surface_size: PhysicalSize<u32>, render_size: Resolution) {
        if surface_size.width == 0 || surface_size.height == 0 {
            return;
        }

        self.surface_size = surface_size;
        {
            let mut config = self
                .common
                .output_surface_config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            config.width = surface_size.width;
            config.height = surface_size.height;
            self.surface.configure(&self.device, &config);
        }

        if render_size != self.targets.size() {
            self.targets.resize(render_size);
            self.bloom_pass
                .resize(&self.device, &self.common, &self.targets);
            self.composite_pass
                .resize(&self.device, &self.common, &self.targets);
            self.fxaa_pass
                .resize(&self.device, &self.common, &self.targets);
        }
    }

    /// Reconfigures the surface after it was lost or went out of date.
    pub fn reconfigure(&mut self) {
        self.resize(self.surface_size, self.targets.size());
    }

    fn sync_lighting(&mut self, demo_state: &DemoState) {
        let world = &demo_state.world;

        let environment_changed =
            self.environment
                .sync(&self.device, &self.queue, world.environment());
        let shadow_map_changed = self.shadow_pass.prepare(&world.light);

        if environment_changed || shadow_map_changed {
            self.pbr_pass.set_lighting(
                &self.device,
                LightingViews {
                    shadow_map: self.shadow_pass.map_view(),
                    shadow_sampler: self.shadow_pass.sampler(),
                    environment: self.environment.view(),
                },
            );
        }
    }

    /// Brings GPU state up to date with the world and records every pass up to
    /// the antialiased surface image.
    pub fn render(&mut self, demo_state: &mut DemoState) -> Result<Frame, wgpu::SurfaceError> {
        self.shader_loader.load_pending_shaders();

        self.upload_models(&mut demo_state.world.scene);
        self.materials.sync(&demo_state.world.materials);
        self.sync_lighting(demo_state);

        let world = &demo_state.world;
        let size = self.targets.size();

        self.common.global_uniform.update(
            &self.queue,
            GlobalUniformState::new(
                world,
                size,
                self.shadow_pass.size(),
                self.start_time.elapsed().as_secs_f32(),
            ),
        );
        self.objects.sync(&self.device, &self.queue, &world.scene);

        self.bloom_pass
            .update(&self.queue, &world.post.bloom, self.targets.bloom_size());
        self.composite_pass.update(
            &self.queue,
            CompositeUniform::new(&world.post, &world.camera, size),
        );
        self.fxaa_pass.update(&self.queue, world.post.fxaa.resolution);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut context = RenderPassContext {
                encoder: &mut encoder,
                pipeline_cache: &self.shader_loader.cache,
                common: &self.common,
            };

            self.shadow_pass
                .render(&mut context, &world.light, &self.objects, &self.render_models);
            self.pbr_pass.render(
                &mut context,
                &self.targets,
                world.background,
                &self.objects,
                &self.render_models,
                &self.materials,
            );
            self.bloom_pass.render(&mut context, &self.targets);
            self.composite_pass.render(&mut context, &self.targets);
            self.fxaa_pass.render(&mut context, &view);
        }

        Ok(Frame {
            output,
            view,
            encoder,
        })
    }

    /// Draws the overlay, if any, then submits and presents.
    pub fn finish_frame(&mut self, frame: Frame, imgui: Option<&mut imgui::Context>) {
        let Frame {
            output,
            view,
            mut encoder,
        } = frame;

        if let (Some(renderer), Some(context)) = (self.imgui_renderer.as_mut(), imgui) {
            renderer.render(&view, context, &self.device, &self.queue, &mut encoder);
        }

        self.queue.submit([encoder.finish()]);
        self.window.pre_present_notify();
        output.present();
    }
}
