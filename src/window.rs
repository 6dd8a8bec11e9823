use std::{sync::Arc, time::Instant};

use anyhow::Context;
use glam::Vec2;
use imgui::{FontConfig, FontSource};
use imgui_winit_support::WinitPlatform;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalPosition, PhysicalSize},
    event::{Event, MouseButton, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::{Window, WindowId},
};

use crate::{
    asset_pipeline::loader::{load_assets, AssetError, LoadedAssets},
    demo::DemoState,
    engine,
    input::{wheel_delta, InputEvent, PointerTracker},
    rendering::{config::RenderConfig, renderer::Renderer},
    viewport::Viewport,
    CliOptions,
};

/// Events sent to the event loop from other threads.
pub enum AppEvent {
    AssetsLoaded(Result<LoadedAssets, AssetError>),
}

struct ImguiState {
    context: imgui::Context,
    platform: WinitPlatform,
}

struct App {
    options: CliOptions,
    config: &'static RenderConfig,
    renderer: Option<Renderer>,
    demo_state: DemoState,
    pointer: PointerTracker,
    imgui: Option<ImguiState>,
    last_frame: Instant,
}

impl App {
    fn new(options: CliOptions, config: &'static RenderConfig, demo_state: DemoState) -> Self {
        Self {
            options,
            config,
            renderer: None,
            demo_state,
            pointer: PointerTracker::default(),
            imgui: None,
            last_frame: Instant::now(),
        }
    }

    fn setup_imgui(&mut self, window: &Window) {
        let mut context = imgui::Context::create();
        let mut platform = WinitPlatform::new(&mut context);
        platform.attach_window(
            context.io_mut(),
            window,
            imgui_winit_support::HiDpiMode::Default,
        );

        let font_size = 14.0;
        context.fonts().add_font(&[FontSource::DefaultFontData {
            config: Some(FontConfig {
                oversample_h: 1,
                pixel_snap_h: true,
                size_pixels: font_size,
                ..Default::default()
            }),
        }]);

        // Disable INI support because it's broken in the published version of imgui
        context.set_ini_filename(None);

        self.imgui = Some(ImguiState { context, platform });
    }

    fn create_renderer(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title(format!("vignettes: {}", self.demo_state.name()))
            .with_inner_size(LogicalSize::new(1280.0, 720.0));
        let window = Arc::new(
            event_loop
                .create_window(window_attributes)
                .context("Failed to create window")?,
        );

        self.demo_state.resize(Viewport::from_physical(
            window.inner_size(),
            window.scale_factor(),
            self.config.max_pixel_ratio,
        ));

        if self.config.debug_overlay {
            self.setup_imgui(&window);
        }

        let shader_root = self.options.assets.join("shaders");
        let renderer = pollster::block_on(Renderer::new(
            window.clone(),
            &self.demo_state,
            self.config,
            self.imgui.as_mut().map(|imgui| &mut imgui.context),
            &shader_root,
        ))
        .context("Failed to create renderer")?;

        self.renderer = Some(renderer);
        window.request_redraw();

        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>, scale_factor: f64) {
        let viewport = Viewport::from_physical(size, scale_factor, self.config.max_pixel_ratio);
        self.demo_state.resize(viewport);

        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resize(size, viewport.render_size());
        }
    }

    fn wants_mouse(&self) -> bool {
        self.imgui
            .as_ref()
            .is_some_and(|imgui| imgui.context.io().want_capture_mouse)
    }

    fn dispatch_input(&mut self, event: Option<InputEvent>) {
        if let Some(event) = event {
            if !self.wants_mouse() {
                self.demo_state.handle_input(event);
            }
        }
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        let now = Instant::now();
        let delta_time = now - self.last_frame;
        self.last_frame = now;

        engine::update(&mut self.demo_state, delta_time.as_secs_f32());

        if let Some(ImguiState { context, platform }) = self.imgui.as_mut() {
            context.io_mut().update_delta_time(delta_time);

            if let Err(e) = platform.prepare_frame(context.io_mut(), &renderer.window) {
                log::warn!("Failed to prepare imgui frame: {e}");
            }

            let ui = context.new_frame();
            self.demo_state.draw_ui(ui);
            platform.prepare_render(ui, &renderer.window);
        }

        match renderer.render(&mut self.demo_state) {
            Ok(frame) => {
                renderer.finish_frame(frame, self.imgui.as_mut().map(|imgui| &mut imgui.context));
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                renderer.reconfigure();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Out of memory");
                event_loop.exit();
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timeout");
            }
            Err(other) => {
                log::error!("Unexpected error: {:?}", other);
            }
        }

        renderer.window.request_redraw();
    }
}

fn logical(position: PhysicalPosition<f64>, scale_factor: f64) -> Vec2 {
    let position = position.to_logical::<f32>(scale_factor);
    Vec2::new(position.x, position.y)
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.renderer.is_some() {
            return;
        }

        if let Err(e) = self.create_renderer(event_loop) {
            log::error!("{e:#}");
            event_loop.exit();
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::AssetsLoaded(result) => self.demo_state.assets_loaded(result),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.renderer.as_ref().map(|renderer| renderer.window.clone()) else {
            return;
        };
        let scale_factor = window.scale_factor();

        if let Some(imgui) = self.imgui.as_mut() {
            imgui.platform.handle_event::<()>(
                imgui.context.io_mut(),
                &window,
                &Event::WindowEvent {
                    window_id,
                    event: event.clone(),
                },
            );
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                self.resize(new_size, scale_factor);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.resize(window.inner_size(), scale_factor);
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let event = self.pointer.cursor_moved(logical(position, scale_factor));
                self.dispatch_input(event);
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let event = self.pointer.primary_button(state.is_pressed());
                self.dispatch_input(event);
            }
            WindowEvent::MouseWheel { delta, .. } => {
                self.dispatch_input(Some(InputEvent::Wheel {
                    delta: wheel_delta(delta, scale_factor),
                }));
            }
            WindowEvent::Touch(touch) => {
                let event = self.pointer.touch(
                    touch.phase,
                    touch.id,
                    logical(touch.location, scale_factor),
                );
                self.dispatch_input(event);
            }
            _ => (),
        }
    }
}

/// Starts loading the vignette's assets on `runtime`; the result comes back
/// through `proxy` as a user event.
fn spawn_asset_load(
    runtime: &tokio::runtime::Runtime,
    proxy: EventLoopProxy<AppEvent>,
    options: &CliOptions,
    demo_state: &DemoState,
) {
    let root = options.assets.clone();
    let manifest = demo_state.manifest();

    runtime.spawn(async move {
        let result = load_assets(&root, &manifest).await;
        if proxy.send_event(AppEvent::AssetsLoaded(result)).is_err() {
            log::warn!("Event loop closed before assets finished loading");
        }
    });
}

pub async fn run(options: CliOptions) -> anyhow::Result<()> {
    let event_loop = EventLoop::<AppEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start asset runtime")?;

    let config = RenderConfig {
        debug_overlay: options.debug,
        ..Default::default()
    }
    .leak();

    // Replaced with the real window size once the window exists.
    let viewport = Viewport::new(1280.0, 720.0, 1.0, config.max_pixel_ratio);
    let demo_state = DemoState::new(options.vignette.create(), viewport);

    spawn_asset_load(&runtime, event_loop.create_proxy(), &options, &demo_state);

    let mut app = App::new(options, config, demo_state);
    event_loop.run_app(&mut app)?;

    runtime.shutdown_background();

    Ok(())
}
