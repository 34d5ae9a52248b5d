//! Core traits for media processing

use bytes::Bytes;
use stowage_core::TransformSpec;

/// Produces derivative bytes from a source image.
///
/// Implementations are synchronous and CPU bound; async callers run them on the
/// blocking pool. `extension` is the source file extension (any case) and
/// decides the output encoding, so the derivative keeps the source's format.
pub trait DerivativeRenderer: Send + Sync {
    fn render(
        &self,
        source: &[u8],
        extension: &str,
        spec: &TransformSpec,
    ) -> Result<Bytes, anyhow::Error>;
}
