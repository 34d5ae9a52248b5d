use anyhow::{anyhow, Result};
use bytes::Bytes;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use stowage_core::constants::DEFAULT_JPEG_QUALITY;
use stowage_core::{JpegFormat, RecompressSpec};

/// Output encoding of a derivative. Derivatives keep the source extension, so only
/// the transformable source formats appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Map a source file extension to the encoding its derivative must use.
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.to_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            _ => Err(anyhow!("Unsupported derivative format: {}", ext)),
        }
    }

    pub fn to_mime_type(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Png => "image/png",
        }
    }

    pub fn to_image_format(self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        }
    }
}

/// Main compression service
pub struct ImageCompressor;

impl ImageCompressor {
    /// Encode an image in the given format. `recompress` only affects JPEG output;
    /// without it JPEG is written at the default quality, baseline.
    pub fn compress(
        img: &DynamicImage,
        format: OutputFormat,
        recompress: Option<&RecompressSpec>,
    ) -> Result<Bytes> {
        match format {
            OutputFormat::Jpeg => {
                let (quality, progressive) = match recompress {
                    Some(spec) => (spec.quality, spec.format == JpegFormat::Progressive),
                    None => (DEFAULT_JPEG_QUALITY, false),
                };
                Self::compress_jpeg(img, quality, progressive)
            }
            OutputFormat::Png => Self::compress_png(img),
        }
    }

    /// Compress to JPEG using mozjpeg
    fn compress_jpeg(img: &DynamicImage, quality: u8, progressive: bool) -> Result<Bytes> {
        let rgb_img = img.to_rgb8();
        let (width, height) = rgb_img.dimensions();

        let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
        comp.set_size(width as usize, height as usize);
        comp.set_quality(quality.clamp(1, 100) as f32);
        if progressive {
            comp.set_progressive_mode();
        }
        comp.set_optimize_coding(true);

        let mut comp = comp.start_compress(Vec::new())?;
        comp.write_scanlines(&rgb_img)?;
        let jpeg_data = comp.finish()?;

        Ok(Bytes::from(jpeg_data))
    }

    /// Compress to PNG
    fn compress_png(img: &DynamicImage) -> Result<Bytes> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);

        img.write_to(&mut cursor, ImageFormat::Png)?;

        Ok(Bytes::from(buffer))
    }
}
