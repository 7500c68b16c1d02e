use anyhow::{Context, Result};
use image::DynamicImage;
use image::imageops::FilterType;

/// Tesseract degrades noticeably below this edge length.
const MIN_DIMENSION: u32 = 300;

/// Decodes the request payload and upscales small images. The returned image
/// is what script detection sees; the sweep works on [`preprocess`]ed copies.
pub(crate) fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(bytes).with_context(|| "failed to decode image")?;
    Ok(upscale_if_small(image))
}

fn upscale_if_small(image: DynamicImage) -> DynamicImage {
    let (width, height) = (image.width(), image.height());
    if width >= MIN_DIMENSION && height >= MIN_DIMENSION {
        return image;
    }
    let scale = (MIN_DIMENSION as f32 / width as f32).max(MIN_DIMENSION as f32 / height as f32);
    let new_width = (width as f32 * scale).round() as u32;
    let new_height = (height as f32 * scale).round() as u32;
    image.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Grayscale, moderate contrast boost and a light sharpen. Aggressive values
/// hurt Devanagari and Sinhala glyph shapes more than they help.
pub(crate) fn preprocess(image: &DynamicImage) -> DynamicImage {
    let gray = DynamicImage::ImageLuma8(image.to_luma8());
    let boosted = gray.adjust_contrast(25.0);
    boosted.unsharpen(1.0, 2)
}
