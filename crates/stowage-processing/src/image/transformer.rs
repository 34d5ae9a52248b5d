//! Image transformer - the derivative pipeline
//!
//! Decodes the source, applies the thumbnail resize if requested and re-encodes in the
//! source's own format (recompressing JPEG-family sources per the recompress spec).

use crate::compression::{ImageCompressor, OutputFormat};
use crate::image::resize::ImageResize;
use crate::traits::DerivativeRenderer;
use bytes::Bytes;
use image::GenericImageView;
use std::io::Cursor;
use stowage_core::TransformSpec;

/// Main image transformer used by storage engines to build derivatives
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageTransformer;

impl ImageTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Run the pipeline on `data`, encoding the result for a file with extension `ext`.
    pub fn transform(data: &[u8], ext: &str, spec: &TransformSpec) -> Result<Bytes, anyhow::Error> {
        spec.validate()?;
        let output_format = OutputFormat::from_extension(ext)?;

        let cursor = Cursor::new(data);
        let mut img = image::ImageReader::new(cursor)
            .with_guessed_format()?
            .decode()?;

        if let Some(ref thumbnail) = spec.thumbnail {
            tracing::debug!(
                width = thumbnail.width,
                height = thumbnail.height,
                fit = %thumbnail.fit,
                "Applying thumbnail resize"
            );
            img = ImageResize::apply(&img, thumbnail);
        }

        let recompress = match output_format {
            OutputFormat::Jpeg => spec.recompress.as_ref(),
            OutputFormat::Png => None,
        };

        let (width, height) = img.dimensions();
        tracing::debug!(
            output_format = ?output_format,
            width = width,
            height = height,
            recompress = ?recompress,
            "Encoding derivative"
        );

        ImageCompressor::compress(&img, output_format, recompress)
    }
}

impl DerivativeRenderer for ImageTransformer {
    fn render(
        &self,
        source: &[u8],
        extension: &str,
        spec: &TransformSpec,
    ) -> Result<Bytes, anyhow::Error> {
        Self::transform(source, extension, spec)
    }
}
