pub mod common;
pub mod config;
pub mod environment_texture;
pub mod global_uniform;
pub mod imgui_renderer;
pub mod passes;
pub mod render_common;
pub mod render_material_manager;
pub mod render_model;
pub mod render_object;
pub mod render_targets;
pub mod renderer;
pub mod shader_loader;
pub mod texture;
pub mod util;
