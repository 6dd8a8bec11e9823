use crate::{
    asset_pipeline::loader::{AssetError, AssetManifest, LoadedAssets},
    input::{InputEvent, WHEEL_LINE_HEIGHT},
    orbit::OrbitControls,
    vignettes::{SetupError, Vignette},
    viewport::Viewport,
    world::World,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed,
}

/// A running vignette and the world it draws into.
pub struct DemoState {
    pub world: World,
    vignette: Box<dyn Vignette>,
    orbit: Option<OrbitControls>,
    load_status: LoadStatus,
    elapsed: f32,
    frame_time: f32,
}

impl DemoState {
    pub fn new(mut vignette: Box<dyn Vignette>, viewport: Viewport) -> Self {
        let mut world = World::new(viewport);
        vignette.setup(&mut world);

        let orbit = vignette
            .orbit_target()
            .map(|target| OrbitControls::new(&mut world.camera, target));

        log::info!("Started vignette {}", vignette.name());

        Self {
            world,
            vignette,
            orbit,
            load_status: LoadStatus::Loading,
            elapsed: 0.0,
            frame_time: 0.0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.vignette.name()
    }

    pub fn manifest(&self) -> AssetManifest {
        self.vignette.manifest()
    }

    pub fn load_status(&self) -> LoadStatus {
        self.load_status
    }

    /// Finishes setup with the loaded assets. Failures are logged; whatever was
    /// set up so far keeps rendering.
    pub fn assets_loaded(&mut self, result: Result<LoadedAssets, AssetError>) {
        let result = result
            .map_err(SetupError::from)
            .and_then(|assets| self.vignette.on_assets_loaded(&mut self.world, assets));

        self.load_status = match result {
            Ok(()) => {
                log::info!("{} is ready", self.vignette.name());
                LoadStatus::Ready
            }
            Err(e) => {
                log::error!("{} setup failed: {}", self.vignette.name(), e);
                LoadStatus::Failed
            }
        };
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        if let Some(orbit) = &mut self.orbit {
            let camera = &mut self.world.camera;
            let height = self.world.viewport.height;

            match event {
                InputEvent::Drag { delta } => orbit.rotate(camera, delta, height),
                InputEvent::TouchMove {
                    previous, position, ..
                } => orbit.rotate(camera, position - previous, height),
                InputEvent::Wheel { delta } => orbit.zoom(camera, -delta / WHEEL_LINE_HEIGHT),
                _ => {}
            }
        }

        self.vignette.on_input(&mut self.world, &event);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        self.world.resize(viewport);
    }

    pub fn update(&mut self, dt: f32) {
        self.frame_time = dt;
        self.elapsed += dt;
        self.vignette.update(&mut self.world, dt, self.elapsed);
    }

    pub fn draw_ui(&self, ui: &imgui::Ui) {
        ui.window("Stats").build(|| {
            ui.text(format!("Vignette: {}", self.vignette.name()));
            ui.text(format!(
                "Frame: {:.2} ms ({:.0} FPS)",
                self.frame_time * 1000.0,
                if self.frame_time > 0.0 {
                    1.0 / self.frame_time
                } else {
                    0.0
                }
            ));
            ui.text(format!("Assets: {:?}", self.load_status));
            if let Some(orbit) = &self.orbit {
                ui.text(format!("Orbit distance: {:.2}", orbit.distance()));
            }
            ui.separator();
            self.vignette.debug_ui(ui);
        });

        self.world.materials.draw_ui(ui);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vignettes::VignetteKind;

    fn viewport() -> Viewport {
        Viewport::new(1024.0, 768.0, 1.0, 2.0)
    }

    #[test]
    fn failed_load_keeps_the_stage() {
        let mut demo = DemoState::new(VignetteKind::Hand.create(), viewport());
        let objects = demo.world.scene.objects.len();

        let error = AssetError::EnvironmentIo {
            path: "hdr/cyclorama_hard_light_1k.hdr".into(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        demo.assets_loaded(Err(error));

        assert_eq!(demo.load_status(), LoadStatus::Failed);
        assert_eq!(demo.world.scene.objects.len(), objects);
        demo.update(1.0 / 60.0);
    }

    #[test]
    fn orbit_scenes_zoom_on_wheel() {
        let mut demo = DemoState::new(VignetteKind::Snitch.create(), viewport());
        let before = demo.world.camera.eye.length();

        demo.handle_input(InputEvent::Wheel { delta: -300.0 });
        assert!(demo.world.camera.eye.length() < before);
    }

    #[test]
    fn flythrough_wheel_does_not_orbit() {
        let mut demo = DemoState::new(VignetteKind::Flythrough.create(), viewport());
        let eye = demo.world.camera.eye;

        demo.handle_input(InputEvent::Wheel { delta: 300.0 });
        assert_eq!(demo.world.camera.eye, eye);

        demo.update(0.5);
        assert_ne!(demo.world.camera.eye, eye);
    }
}
