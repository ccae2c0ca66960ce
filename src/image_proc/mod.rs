//! Image processing module.
//!
//! Turns an arbitrary photo into an e-ink ready sidebar:
//! grayscale → contrast → adaptive palette + dithering → fit to width →
//! caption → vertical stack. Every stage takes its input by value and
//! returns a fresh image.

pub mod contrast;
pub mod dither;
pub mod transform;

pub use contrast::{ContrastStrategy, normalize_contrast};
pub use dither::{PaletteOptions, dither_to_levels, quantize};
pub use transform::{crop_attribution_strip, fit_to_width, fitted_dimensions, resize_exact, threshold};

use crate::render::{PhotoMetadata, TextStyle, compose_sidebar, render_metadata};
use image::{DynamicImage, GrayImage};
use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid input image: {0}")]
    Input(String),
}

/// Reject zero-sized images
pub fn ensure_not_empty(img: &GrayImage, stage: &str) -> Result<(), PipelineError> {
    if img.width() == 0 || img.height() == 0 {
        return Err(PipelineError::Input(format!(
            "{} received a {}x{} image",
            stage,
            img.width(),
            img.height()
        )));
    }
    Ok(())
}

/// Everything the sidebar pipeline needs, fixed for one run
#[derive(Debug, Clone, PartialEq)]
pub struct SidebarOptions {
    pub contrast: ContrastStrategy,
    pub palette: PaletteOptions,
    /// Width of the sidebar and target width of the photo
    pub sidebar_width: u32,
    /// Height budget for the fitted photo
    pub max_photo_height: Option<u32>,
    pub text: TextStyle,
}

impl Default for SidebarOptions {
    fn default() -> Self {
        Self {
            contrast: ContrastStrategy::Adaptive {
                clip_limit: 2.0,
                tile_grid_size: 8,
            },
            palette: PaletteOptions::default(),
            sidebar_width: 240,
            max_photo_height: Some(330),
            text: TextStyle::default(),
        }
    }
}

impl SidebarOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.contrast.validate()?;
        self.palette.validate()?;
        if self.sidebar_width == 0 {
            return Err(PipelineError::Configuration(
                "sidebar width must be greater than 0".to_string(),
            ));
        }
        if self.max_photo_height == Some(0) {
            return Err(PipelineError::Configuration(
                "max photo height must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete e-inkification of a photo into a sidebar image
///
/// Options are checked before any pixel is touched, so configuration
/// errors surface even for a broken photo.
pub fn einkify_photo(
    photo: DynamicImage,
    meta: &PhotoMetadata,
    options: &SidebarOptions,
) -> Result<GrayImage, PipelineError> {
    options.validate()?;
    if photo.width() == 0 || photo.height() == 0 {
        return Err(PipelineError::Input(format!(
            "photo is {}x{}",
            photo.width(),
            photo.height()
        )));
    }

    tracing::info!("Processing photo: {}", meta.name);

    let gray = match photo {
        DynamicImage::ImageLuma8(gray) => gray,
        other => {
            tracing::info!("Converted to grayscale");
            other.into_luma8()
        }
    };

    let enhanced = normalize_contrast(gray, &options.contrast)?;
    let quantized = quantize(enhanced, &options.palette)?;
    let fitted = fit_to_width(quantized, options.sidebar_width, options.max_photo_height)?;

    let caption = render_metadata(meta, fitted.width(), &options.text)?;
    compose_sidebar(&fitted, &caption.image, options.sidebar_width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DESCRIPTION_MAX_LINES, FontFace, LOCATION_MAX_LINES, NAME_MAX_LINES};
    use image::Luma;

    fn mid_gray_photo() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(400, 300, Luma([128])))
    }

    #[test]
    fn test_end_to_end_sidebar() {
        let options = SidebarOptions::default();
        let description = "Pallas's cats live in grasslands and rocky steppe, ".repeat(4);
        let description = &description[..200];
        let meta = PhotoMetadata::new("Test Subject", "Test Location, Country", description);

        let sidebar = einkify_photo(mid_gray_photo(), &meta, &options).unwrap();

        let (photo_width, photo_height) = fitted_dimensions(400, 300, 240, Some(330)).unwrap();
        assert_eq!((photo_width, photo_height), (240, 180));

        let caption = render_metadata(&meta, photo_width, &options.text).unwrap();
        assert!(caption.line_count <= NAME_MAX_LINES + LOCATION_MAX_LINES + DESCRIPTION_MAX_LINES);

        assert_eq!(sidebar.width(), 240);
        assert_eq!(sidebar.height(), photo_height + caption.image.height());
    }

    #[test]
    fn test_empty_caption_fields_shrink_sidebar() {
        let options = SidebarOptions::default();
        let full = PhotoMetadata::new("Test Subject", "Somewhere", "Some words here");
        let bare = PhotoMetadata::new("Test Subject", "", "");

        let tall = einkify_photo(mid_gray_photo(), &full, &options).unwrap();
        let short = einkify_photo(mid_gray_photo(), &bare, &options).unwrap();

        let line = FontFace::for_size(options.text.font_size).height() + options.text.line_spacing;
        assert_eq!(short.height(), 180 + line + 2 * options.text.padding);
        assert_eq!(tall.height() - short.height(), 2 * line);
    }

    #[test]
    fn test_color_photo_is_converted() {
        let photo = DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            120,
            240,
            image::Rgb([200, 30, 30]),
        ));
        let meta = PhotoMetadata::new("Red", "", "");
        let sidebar = einkify_photo(photo, &meta, &SidebarOptions::default()).unwrap();
        // Portrait photo capped at 330 px tall: 165 wide, centered
        assert_eq!(sidebar.width(), 240);
        assert!(sidebar.height() > 330);
    }

    #[test]
    fn test_configuration_checked_before_input() {
        let options = SidebarOptions {
            palette: PaletteOptions {
                colors: 1,
                dithering: true,
            },
            ..SidebarOptions::default()
        };
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
        let err = einkify_photo(empty, &PhotoMetadata::default(), &options).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_empty_photo_is_input_error() {
        let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 5));
        let err = einkify_photo(empty, &PhotoMetadata::default(), &SidebarOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Input(_)));
    }
}
