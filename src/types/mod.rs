mod aspect;
mod clip;
mod resolution;

pub use aspect::AspectRatio;
pub use clip::{ClipDescriptor, LocalClip};
pub use resolution::Resolution;
