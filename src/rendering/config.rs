#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Upper bound for the light's shadow map resolution.
    pub max_shadow_map_size: u32,
    /// Device pixel ratios above this render at this ratio and get upscaled.
    pub max_pixel_ratio: f32,
    /// Bloom runs at the render size divided by this.
    pub bloom_downscale: u32,
    pub debug_overlay: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_shadow_map_size: 4096,
            max_pixel_ratio: 2.0,
            bloom_downscale: 2,
            debug_overlay: false,
        }
    }
}

impl RenderConfig {
    /// Passes keep a `&'static RenderConfig`; it lives as long as the process.
    pub fn leak(self) -> &'static RenderConfig {
        Box::leak(Box::new(self))
    }
}
