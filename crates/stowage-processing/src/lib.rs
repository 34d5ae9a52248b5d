//! Stowage Processing Library
//!
//! The image transform pipeline used to produce cached derivatives: resize with a
//! fit policy, JPEG recompression and PNG re-encoding. Storage engines consume it
//! through the [`DerivativeRenderer`] trait.

#[cfg(feature = "image")]
pub mod compression;
#[cfg(feature = "image")]
pub mod image;
pub mod traits;

#[cfg(feature = "image")]
pub use compression::{ImageCompressor, OutputFormat};
#[cfg(feature = "image")]
pub use image::{ImageResize, ImageTransformer};
pub use traits::DerivativeRenderer;
