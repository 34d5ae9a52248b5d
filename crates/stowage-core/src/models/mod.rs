//! Data models for the application
//!
//! Descriptors exchanged with storage engines and the transform parameters used to
//! address cached image derivatives.

mod storage;
mod transform;

// Re-export all models for convenient imports
pub use storage::*;
pub use transform::*;
