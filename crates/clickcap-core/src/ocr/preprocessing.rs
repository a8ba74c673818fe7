//! Image preprocessing for glyph detection and character recognition.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, rotate_about_center};
use ndarray::Array4;
use tracing::debug;

use crate::error::OcrError;
use crate::models::BoundingBox;

/// Fill value for letterbox padding, matching the detector's training setup.
const LETTERBOX_FILL: u8 = 114;

/// Background used when rotation grows the canvas.
const ROTATION_FILL: Rgb<u8> = Rgb([255, 255, 255]);

/// Image preprocessor for the captcha pipeline.
pub struct ImagePreprocessor {
    /// Target height for the recognition model.
    rec_target_height: u32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            rec_target_height: 64,
        }
    }

    /// Letterbox an image into a `size`×`size` detector input.
    ///
    /// The image is scaled by `r = min(size/h, size/w)`, pasted at the top-left
    /// corner of a canvas filled with 114 and returned as an NCHW tensor of raw
    /// 0-255 values together with `r`.
    pub fn letterbox(
        &self,
        image: &DynamicImage,
        size: u32,
    ) -> Result<(Array4<f32>, f32), OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 || size == 0 {
            return Err(OcrError::InvalidImage(format!(
                "cannot letterbox {}x{} image into {}",
                width, height, size
            )));
        }

        let ratio = (size as f32 / height as f32).min(size as f32 / width as f32);
        let new_width = ((width as f32 * ratio) as u32).clamp(1, size);
        let new_height = ((height as f32 * ratio) as u32).clamp(1, size);

        debug!(
            "Letterboxing {}x{} -> {}x{} (ratio {:.4})",
            width, height, new_width, new_height, ratio
        );

        let resized = image
            .resize_exact(new_width, new_height, FilterType::Triangle)
            .to_rgb8();

        let side = size as usize;
        let mut tensor = Array4::<f32>::from_elem((1, 3, side, side), LETTERBOX_FILL as f32);

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32;
            }
        }

        Ok((tensor, ratio))
    }

    /// Preprocess a glyph crop for the recognition model.
    ///
    /// Grayscale, height fixed at 64 with the width following the aspect ratio,
    /// normalized to `[-1, 1]`. Output shape is `[1, 1, 64, W]`.
    pub fn preprocess_for_recognition(
        &self,
        image: &DynamicImage,
    ) -> Result<Array4<f32>, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::InvalidImage("empty glyph crop".to_string()));
        }

        let target_height = self.rec_target_height;
        let target_width =
            ((width as f32 * target_height as f32 / height as f32) as u32).max(1);

        let gray = image
            .resize_exact(target_width, target_height, FilterType::Lanczos3)
            .to_luma8();

        let mut tensor =
            Array4::<f32>::zeros((1, 1, target_height as usize, target_width as usize));

        for (x, y, pixel) in gray.enumerate_pixels() {
            let value = pixel[0] as f32 / 255.0;
            tensor[[0, 0, y as usize, x as usize]] = (value - 0.5) / 0.5;
        }

        Ok(tensor)
    }

    /// Crop a glyph region, clamped to the image bounds.
    pub fn crop_region(&self, image: &DynamicImage, bbox: &BoundingBox) -> DynamicImage {
        let x1 = bbox.x1.min(image.width());
        let y1 = bbox.y1.min(image.height());
        let x2 = bbox.x2.min(image.width());
        let y2 = bbox.y2.min(image.height());

        let width = x2.saturating_sub(x1).max(1);
        let height = y2.saturating_sub(y1).max(1);

        image.crop_imm(x1, y1, width, height)
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotate counter-clockwise by `degrees`, growing the canvas so no glyph
/// pixels are cut off and filling the new background with white.
pub fn rotate_expand(image: &DynamicImage, degrees: f32) -> DynamicImage {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let theta = degrees.to_radians();
    let (sin, cos) = (theta.sin().abs(), theta.cos().abs());
    let new_width = ((width as f32 * cos + height as f32 * sin).round() as u32).max(1);
    let new_height = ((width as f32 * sin + height as f32 * cos).round() as u32).max(1);

    let mut canvas = RgbImage::from_pixel(new_width, new_height, ROTATION_FILL);
    let offset_x = (i64::from(new_width) - i64::from(width)) / 2;
    let offset_y = (i64::from(new_height) - i64::from(height)) / 2;
    imageops::overlay(&mut canvas, &rgb, offset_x, offset_y);

    // imageproc rotates clockwise for positive angles.
    let rotated = rotate_about_center(&canvas, -theta, Interpolation::Bilinear, ROTATION_FILL);

    DynamicImage::ImageRgb8(rotated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use pretty_assertions::assert_eq;

    fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
    }

    #[test]
    fn test_letterbox_scales_and_pads() {
        let preprocessor = ImagePreprocessor::new();
        let (tensor, ratio) = preprocessor.letterbox(&solid(208, 104, 0), 416).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 416, 416]);
        assert!((ratio - 2.0).abs() < 1e-6);
        // Image area is black, padding below it keeps the fill value.
        assert_eq!(tensor[[0, 0, 10, 10]], 0.0);
        assert_eq!(tensor[[0, 2, 300, 10]], 114.0);
    }

    #[test]
    fn test_letterbox_rejects_empty_size() {
        let preprocessor = ImagePreprocessor::new();
        assert!(preprocessor.letterbox(&solid(10, 10, 0), 0).is_err());
    }

    #[test]
    fn test_recognition_tensor_keeps_aspect() {
        let preprocessor = ImagePreprocessor::new();
        let tensor = preprocessor
            .preprocess_for_recognition(&solid(40, 20, 255))
            .unwrap();

        assert_eq!(tensor.shape(), &[1, 1, 64, 128]);
        assert!((tensor[[0, 0, 0, 0]] - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_crop_region_clamps() {
        let preprocessor = ImagePreprocessor::new();
        let image = solid(50, 40, 0);

        let crop = preprocessor.crop_region(&image, &BoundingBox::new(10, 5, 30, 25));
        assert_eq!(crop.dimensions(), (20, 20));

        let crop = preprocessor.crop_region(&image, &BoundingBox::new(40, 30, 90, 90));
        assert_eq!(crop.dimensions(), (10, 10));
    }

    #[test]
    fn test_rotate_zero_keeps_size() {
        let rotated = rotate_expand(&solid(30, 20, 0), 0.0);
        assert_eq!(rotated.dimensions(), (30, 20));
    }

    #[test]
    fn test_rotate_expands_canvas_with_white() {
        let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 40, Luma([0])));

        let rotated = rotate_expand(&image, 15.0);
        let (w, h) = rotated.dimensions();
        assert!(w > 40 && h > 40);

        // The corners of the grown canvas are background.
        let rgb = rotated.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([255, 255, 255]));
        // The center is still glyph ink.
        assert_eq!(rgb.get_pixel(w / 2, h / 2), &Rgb([0, 0, 0]));
    }
}
