//! Image geometry operations.
//!
//! Provides aspect-preserving resizing for the sidebar photo plus the crop
//! and threshold steps used to turn a map tile into a monochrome image.

use super::PipelineError;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

/// Compute the fitted size for a source image
///
/// Width becomes `target_width` and height follows the aspect ratio. When
/// the height exceeds `max_height`, both sides shrink so the height equals
/// `max_height` exactly.
pub fn fitted_dimensions(
    src_width: u32,
    src_height: u32,
    target_width: u32,
    max_height: Option<u32>,
) -> Result<(u32, u32), PipelineError> {
    if target_width == 0 {
        return Err(PipelineError::Configuration(
            "target width must be greater than 0".to_string(),
        ));
    }
    if max_height == Some(0) {
        return Err(PipelineError::Configuration(
            "maximum height must be greater than 0".to_string(),
        ));
    }
    if src_width == 0 || src_height == 0 {
        return Err(PipelineError::Input(format!(
            "cannot resize a {}x{} image",
            src_width, src_height
        )));
    }

    let ratio = target_width as f64 / src_width as f64;
    let mut new_width = target_width;
    let mut new_height = ((src_height as f64 * ratio).round() as u32).max(1);

    if let Some(max_height) = max_height {
        if new_height > max_height {
            let shrink = max_height as f64 / new_height as f64;
            new_width = ((new_width as f64 * shrink).round() as u32).max(1);
            new_height = max_height;
        }
    }

    Ok((new_width, new_height))
}

/// Resize an image to the sidebar width, preserving aspect ratio
///
/// Uses Lanczos resampling since the result is quantized again afterwards.
/// An image that already has the fitted size is returned untouched.
pub fn fit_to_width(
    img: GrayImage,
    target_width: u32,
    max_height: Option<u32>,
) -> Result<GrayImage, PipelineError> {
    let (src_width, src_height) = img.dimensions();
    let (new_width, new_height) = fitted_dimensions(src_width, src_height, target_width, max_height)?;

    if (new_width, new_height) == (src_width, src_height) {
        tracing::debug!("Image already {}x{}, skipping resize", src_width, src_height);
        return Ok(img);
    }

    tracing::info!(
        "Resizing image from {}x{} to {}x{}",
        src_width,
        src_height,
        new_width,
        new_height
    );

    Ok(imageops::resize(&img, new_width, new_height, FilterType::Lanczos3))
}

/// Remove the attribution strip from the bottom of a map tile
///
/// The strip is 3% of the height with a 10 px minimum. Images not taller
/// than the strip are returned as-is.
pub fn crop_attribution_strip(img: GrayImage) -> GrayImage {
    let strip = ((img.height() as f64 * 0.03) as u32).max(10);
    if img.height() <= strip {
        tracing::warn!("Image too small to crop attribution strip");
        return img;
    }

    let kept = img.height() - strip;
    tracing::info!("Cropped attribution strip ({}px) from bottom", strip);
    imageops::crop_imm(&img, 0, 0, img.width(), kept).to_image()
}

/// Resize to exact dimensions (used for map tiles)
pub fn resize_exact(img: GrayImage, width: u32, height: u32) -> GrayImage {
    if img.dimensions() == (width, height) {
        return img;
    }
    tracing::debug!(
        "Scaling {}x{} -> {}x{}",
        img.width(),
        img.height(),
        width,
        height
    );
    imageops::resize(&img, width, height, FilterType::Lanczos3)
}

/// Pure black and white: values above `threshold` become white
pub fn threshold(mut img: GrayImage, threshold: u8) -> GrayImage {
    for pixel in img.pixels_mut() {
        *pixel = Luma([if pixel.0[0] > threshold { 255 } else { 0 }]);
    }
    img
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fit_preserves_aspect_ratio() {
        let img = GrayImage::from_pixel(400, 300, Luma([128]));
        let out = fit_to_width(img, 240, None).unwrap();
        assert_eq!(out.dimensions(), (240, 180));
    }

    #[test]
    fn test_fit_rounds_height() {
        // 333 * 100 / 700 = 47.57
        assert_eq!(fitted_dimensions(700, 333, 100, None).unwrap(), (100, 48));
    }

    #[test]
    fn test_fit_caps_height() {
        // Portrait: 240 wide would be 480 tall
        let (width, height) = fitted_dimensions(300, 600, 240, Some(330)).unwrap();
        assert_eq!(height, 330);
        assert_eq!(width, 165);

        let img = GrayImage::from_pixel(300, 600, Luma([50]));
        let out = fit_to_width(img, 240, Some(330)).unwrap();
        assert_eq!(out.dimensions(), (165, 330));
    }

    #[test]
    fn test_fit_is_noop_at_target_size() {
        let img = GrayImage::from_fn(240, 100, |x, y| Luma([(x ^ y) as u8]));
        let out = fit_to_width(img.clone(), 240, Some(330)).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_fit_rejects_zero_target() {
        let err = fit_to_width(GrayImage::new(10, 10), 0, None).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_fit_rejects_empty_image() {
        let err = fit_to_width(GrayImage::new(0, 10), 240, None).unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }

    #[test]
    fn test_crop_attribution_strip() {
        let out = crop_attribution_strip(GrayImage::new(100, 1000));
        assert_eq!(out.dimensions(), (100, 970));

        let out = crop_attribution_strip(GrayImage::new(100, 200));
        assert_eq!(out.dimensions(), (100, 190));

        let out = crop_attribution_strip(GrayImage::new(100, 8));
        assert_eq!(out.dimensions(), (100, 8));
    }

    #[test]
    fn test_threshold() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[200, 201, 12][x as usize]]));
        let out = threshold(img, 200);
        let values: Vec<u8> = out.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![0, 255, 0]);
    }
}
