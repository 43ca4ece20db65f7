//! JPEG renderer for image answers. Implements ImageEncoder with the `image` crate.

use crate::domain::EncodingError;
use crate::ports::ImageEncoder;
use base64::{Engine as _, engine::general_purpose};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage};
use tracing::debug;

/// Decodes any format the `image` crate understands, downscales, re-encodes as JPEG.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegImageEncoder;

impl JpegImageEncoder {
    pub fn new() -> Self {
        Self
    }

    fn fit(image: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
        if image.width() <= max_width && image.height() <= max_height {
            return image;
        }
        // resize() keeps the aspect ratio within the bounds.
        image.resize(max_width, max_height, FilterType::Triangle)
    }
}

impl ImageEncoder for JpegImageEncoder {
    fn render_jpeg(
        &self,
        image: &[u8],
        max_width: u32,
        max_height: u32,
        quality: u8,
    ) -> Result<String, EncodingError> {
        let decoded = image::load_from_memory(image)
            .map_err(|e| EncodingError::UnreadableImage(e.to_string()))?;
        let rgb = Self::fit(decoded, max_width, max_height).to_rgb8();

        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
            .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
            .map_err(|e| EncodingError::UnreadableImage(e.to_string()))?;

        debug!(
            width = rgb.width(),
            height = rgb.height(),
            quality,
            bytes = buf.len(),
            "jpeg rendered"
        );
        Ok(general_purpose::STANDARD.encode(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageOutputFormat, RgbImage};
    use std::io::Cursor;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
            .unwrap();
        bytes
    }

    fn decode(payload: &str) -> DynamicImage {
        let jpeg = general_purpose::STANDARD.decode(payload).unwrap();
        image::load_from_memory(&jpeg).unwrap()
    }

    #[test]
    fn test_large_image_is_downscaled_within_bounds() {
        let out = JpegImageEncoder::new()
            .render_jpeg(&png(1600, 1200), 800, 600, 80)
            .unwrap();
        let img = decode(&out);
        assert_eq!((img.width(), img.height()), (800, 600));
    }

    #[test]
    fn test_small_image_is_not_upscaled() {
        let out = JpegImageEncoder::new()
            .render_jpeg(&png(120, 90), 800, 600, 80)
            .unwrap();
        let img = decode(&out);
        assert_eq!((img.width(), img.height()), (120, 90));
    }

    #[test]
    fn test_lower_quality_is_not_larger() {
        let source = png(640, 480);
        let encoder = JpegImageEncoder::new();
        let high = encoder.render_jpeg(&source, 800, 600, 90).unwrap();
        let low = encoder.render_jpeg(&source, 800, 600, 10).unwrap();
        assert!(low.len() <= high.len());
    }

    #[test]
    fn test_garbage_is_unreadable() {
        let err = JpegImageEncoder::new()
            .render_jpeg(b"not an image", 800, 600, 90)
            .unwrap_err();
        assert!(matches!(err, EncodingError::UnreadableImage(_)));
    }
}
