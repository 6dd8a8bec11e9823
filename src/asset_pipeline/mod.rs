pub mod environment;
pub mod generate_tangents;
pub mod loader;
pub mod materials;
