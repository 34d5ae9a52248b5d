use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};
use stowage_core::{FitPolicy, ThumbnailSpec};

/// Image resize operations
pub struct ImageResize;

impl ImageResize {
    /// Dimensions the source is scaled to before any crop or letterbox step.
    ///
    /// For `Cover` the result covers the target box (and is cropped afterwards), for
    /// `Contain`/`Inside` it fits inside it, for `Outside` it covers it uncropped.
    pub fn scaled_dimensions(
        orig_width: u32,
        orig_height: u32,
        spec: &ThumbnailSpec,
    ) -> (u32, u32) {
        let width_ratio = spec.width as f64 / orig_width.max(1) as f64;
        let height_ratio = spec.height as f64 / orig_height.max(1) as f64;

        let scale = match spec.fit {
            FitPolicy::Fill => return (spec.width, spec.height),
            FitPolicy::Cover | FitPolicy::Outside => width_ratio.max(height_ratio),
            FitPolicy::Contain | FitPolicy::Inside => width_ratio.min(height_ratio),
        };

        let width = ((orig_width as f64 * scale).round() as u32).max(1);
        let height = ((orig_height as f64 * scale).round() as u32).max(1);

        match spec.fit {
            // Rounding must never leave the cover box smaller than the target.
            FitPolicy::Cover => (width.max(spec.width), height.max(spec.height)),
            FitPolicy::Contain | FitPolicy::Inside => {
                (width.min(spec.width), height.min(spec.height))
            }
            _ => (width, height),
        }
    }

    /// Select appropriate filter type based on resize ratio
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width.max(1) as f32;
        let height_ratio = orig_height as f32 / new_height.max(1) as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            imageops::FilterType::CatmullRom
        } else {
            imageops::FilterType::Lanczos3
        }
    }

    /// Resize image to exact dimensions
    pub fn resize_image(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let filter = Self::select_filter(orig_width, orig_height, width, height);
        img.resize_exact(width, height, filter)
    }

    /// Apply a thumbnail spec according to its fit policy
    pub fn apply(img: &DynamicImage, spec: &ThumbnailSpec) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();
        let (scaled_width, scaled_height) =
            Self::scaled_dimensions(orig_width, orig_height, spec);
        let scaled = Self::resize_image(img, scaled_width, scaled_height);

        match spec.fit {
            FitPolicy::Cover => {
                let x = (scaled_width - spec.width) / 2;
                let y = (scaled_height - spec.height) / 2;
                scaled.crop_imm(x, y, spec.width, spec.height)
            }
            FitPolicy::Contain => Self::letterbox(&scaled, spec.width, spec.height),
            FitPolicy::Fill | FitPolicy::Inside | FitPolicy::Outside => scaled,
        }
    }

    /// Center an image on a white canvas of the target size
    fn letterbox(img: &DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
        let (width, height) = img.dimensions();

        let bg_color = Rgba([255u8, 255u8, 255u8, 255u8]);
        let canvas_img = RgbaImage::from_pixel(target_width, target_height, bg_color);
        let mut canvas = DynamicImage::ImageRgba8(canvas_img);

        let x_offset = target_width.saturating_sub(width) / 2;
        let y_offset = target_height.saturating_sub(height) / 2;
        imageops::overlay(&mut canvas, img, x_offset as i64, y_offset as i64);

        canvas
    }
}
