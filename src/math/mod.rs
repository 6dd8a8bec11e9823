pub mod color;
pub mod easing;
