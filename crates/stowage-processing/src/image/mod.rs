//! Image processing module
//!
//! - Resizing with a fit policy (resize)
//! - The derivative pipeline tying resize and encoding together (transformer)

pub mod resize;
pub mod transformer;

pub use resize::ImageResize;
pub use transformer::ImageTransformer;
