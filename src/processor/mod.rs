//! Image and label transforms.

mod color_jitter;
mod transform;

pub use color_jitter::*;
pub use transform::*;
