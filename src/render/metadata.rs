//! Photo caption rendering: name, location and description.

use super::canvas::{FontFace, LumaCanvas, Weight};
use super::text::TextBlock;
use crate::image_proc::PipelineError;
use image::GrayImage;

/// Location value that means "not known"
pub const LOCATION_PLACEHOLDER: &str = "Unknown";

/// Maximum lines per field
pub const NAME_MAX_LINES: usize = 1;
pub const LOCATION_MAX_LINES: usize = 2;
pub const DESCRIPTION_MAX_LINES: usize = 4;

/// Textual metadata of a photo
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhotoMetadata {
    pub name: String,
    pub location: String,
    pub description: String,
}

impl PhotoMetadata {
    pub fn new(name: &str, location: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            description: description.to_string(),
        }
    }

    /// Location worth printing, if any
    fn shown_location(&self) -> Option<&str> {
        let location = self.location.trim();
        (!location.is_empty() && location != LOCATION_PLACEHOLDER).then_some(location)
    }
}

/// Caption font and spacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    /// Requested glyph height in pixels
    pub font_size: u32,
    /// Extra pixels between lines
    pub line_spacing: u32,
    /// Padding above, below and left of the text
    pub padding: u32,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 14,
            line_spacing: 4,
            padding: 5,
        }
    }
}

/// Rendered caption
#[derive(Debug, Clone)]
pub struct MetadataCanvas {
    pub image: GrayImage,
    /// Number of text lines drawn
    pub line_count: usize,
}

/// Render the caption onto a canvas of `width` sized to its content
///
/// The name is drawn in bold. An empty or placeholder location and an
/// empty description take no space at all.
pub fn render_metadata(
    meta: &PhotoMetadata,
    width: u32,
    style: &TextStyle,
) -> Result<MetadataCanvas, PipelineError> {
    if width == 0 {
        return Err(PipelineError::Configuration(
            "caption width must be greater than 0".to_string(),
        ));
    }

    let face = FontFace::for_size(style.font_size);
    let available = width.saturating_sub(style.padding * 2);

    let mut blocks = vec![TextBlock::wrap(
        &meta.name,
        face,
        Weight::Bold,
        available,
        NAME_MAX_LINES,
    )];
    if let Some(location) = meta.shown_location() {
        blocks.push(TextBlock::wrap(
            &format!("Location: {}", location),
            face,
            Weight::Regular,
            available,
            LOCATION_MAX_LINES,
        ));
    }
    if !meta.description.trim().is_empty() {
        blocks.push(TextBlock::wrap(
            &meta.description,
            face,
            Weight::Regular,
            available,
            DESCRIPTION_MAX_LINES,
        ));
    }

    let line_count = blocks.iter().map(|b| b.lines.len()).sum();
    let text_height: u32 = blocks.iter().map(|b| b.height(style.line_spacing)).sum();
    let height = text_height + style.padding * 2;

    tracing::debug!(
        "Caption: {} lines, {}x{} using {:?}",
        line_count,
        width,
        height,
        face
    );

    let mut canvas = LumaCanvas::new(width, height);
    let left = style.padding as i32;
    let mut y = style.padding as i32;
    for block in &blocks {
        y = block.draw(&mut canvas, left, y, style.line_spacing);
    }

    Ok(MetadataCanvas {
        image: canvas.into_image(),
        line_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_height(style: &TextStyle) -> u32 {
        FontFace::for_size(style.font_size).height() + style.line_spacing
    }

    #[test]
    fn test_height_matches_line_count() {
        let style = TextStyle::default();
        let meta = PhotoMetadata::new(
            "Test Subject",
            "Test Location, Country",
            "A short description.",
        );
        let caption = render_metadata(&meta, 240, &style).unwrap();

        assert_eq!(caption.line_count, 3);
        assert_eq!(caption.image.width(), 240);
        assert_eq!(
            caption.image.height(),
            3 * line_height(&style) + 2 * style.padding
        );
    }

    #[test]
    fn test_empty_fields_are_skipped() {
        let style = TextStyle::default();
        let meta = PhotoMetadata::new("Test Subject", "", "");
        let caption = render_metadata(&meta, 240, &style).unwrap();

        assert_eq!(caption.line_count, 1);
        assert_eq!(caption.image.height(), line_height(&style) + 2 * style.padding);
    }

    #[test]
    fn test_placeholder_location_is_skipped() {
        let style = TextStyle::default();
        let meta = PhotoMetadata::new("Test Subject", "Unknown", "");
        let caption = render_metadata(&meta, 240, &style).unwrap();
        assert_eq!(caption.line_count, 1);
    }

    #[test]
    fn test_line_caps() {
        let style = TextStyle::default();
        let long = "word ".repeat(200);
        let meta = PhotoMetadata::new(&long, &long, &long);
        let caption = render_metadata(&meta, 120, &style).unwrap();

        assert_eq!(
            caption.line_count,
            NAME_MAX_LINES + LOCATION_MAX_LINES + DESCRIPTION_MAX_LINES
        );
        assert_eq!(
            caption.image.height(),
            7 * line_height(&style) + 2 * style.padding
        );
    }

    #[test]
    fn test_text_is_drawn() {
        let meta = PhotoMetadata::new("Test Subject", "", "");
        let caption = render_metadata(&meta, 240, &TextStyle::default()).unwrap();
        assert!(caption.image.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn test_zero_width_rejected() {
        let meta = PhotoMetadata::new("Test Subject", "", "");
        let err = render_metadata(&meta, 0, &TextStyle::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
