//! Sidebar and full-frame composition.

use super::canvas::LumaCanvas;
use crate::image_proc::{PipelineError, ensure_not_empty};
use image::{GrayImage, imageops};

/// Placement of a sub-image on a parent canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl LayoutRect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Panel geometry for the final frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOptions {
    pub width: u32,
    pub height: u32,
    /// Stroke width of the vertical divider between map and sidebar
    pub divider_width: u32,
}

impl Default for FrameOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 480,
            divider_width: 2,
        }
    }
}

impl FrameOptions {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.width == 0 || self.height == 0 {
            return Err(PipelineError::Configuration(format!(
                "frame size {}x{} must be non-zero",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Final panel image
#[derive(Debug, Clone)]
pub struct ComposedFrame {
    pub image: GrayImage,
    /// The sidebar was taller than the panel and lost its bottom rows
    pub sidebar_cropped: bool,
}

/// Horizontal offset that centers `inner` within `outer`
fn centered(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

/// Where the photo and caption go on a sidebar of `sidebar_width`
pub fn sidebar_layout(
    photo: (u32, u32),
    caption: (u32, u32),
    sidebar_width: u32,
) -> (LayoutRect, LayoutRect) {
    let photo_rect = LayoutRect::new(centered(sidebar_width, photo.0), 0, photo.0, photo.1);
    let caption_rect = LayoutRect::new(
        centered(sidebar_width, caption.0),
        photo_rect.bottom(),
        caption.0,
        caption.1,
    );
    (photo_rect, caption_rect)
}

/// Stack the photo over its caption, both centered in the sidebar width
///
/// The result is exactly `sidebar_width` wide and as tall as photo plus
/// caption.
pub fn compose_sidebar(
    photo: &GrayImage,
    caption: &GrayImage,
    sidebar_width: u32,
) -> Result<GrayImage, PipelineError> {
    if sidebar_width == 0 {
        return Err(PipelineError::Configuration(
            "sidebar width must be greater than 0".to_string(),
        ));
    }
    ensure_not_empty(photo, "sidebar compositor")?;
    for (what, width) in [("photo", photo.width()), ("caption", caption.width())] {
        if width > sidebar_width {
            return Err(PipelineError::Input(format!(
                "{} width {} exceeds sidebar width {}",
                what, width, sidebar_width
            )));
        }
    }

    let (photo_rect, caption_rect) = sidebar_layout(photo.dimensions(), caption.dimensions(), sidebar_width);

    let mut canvas = LumaCanvas::new(sidebar_width, caption_rect.bottom());
    canvas.paste(photo, photo_rect.x as i64, photo_rect.y as i64);
    canvas.paste(caption, caption_rect.x as i64, caption_rect.y as i64);

    tracing::info!("Final sidebar image size: {}x{}", canvas.width(), canvas.height());
    Ok(canvas.into_image())
}

/// Where the primary content, divider and sidebar go on the frame
///
/// Returns `(primary, divider, sidebar)`; the sidebar rect is already
/// clipped to the frame height.
pub fn frame_layout(
    primary: (u32, u32),
    sidebar: (u32, u32),
    options: &FrameOptions,
) -> (LayoutRect, LayoutRect, LayoutRect) {
    let primary_rect = LayoutRect::new(0, 0, primary.0, primary.1);
    let divider_rect = LayoutRect::new(primary.0, 0, options.divider_width, options.height);

    let sidebar_height = sidebar.1.min(options.height);
    let sidebar_rect = LayoutRect::new(
        divider_rect.right(),
        centered(options.height, sidebar_height),
        sidebar.0,
        sidebar_height,
    );
    (primary_rect, divider_rect, sidebar_rect)
}

/// Place primary content, divider and sidebar on a white panel-sized canvas
///
/// A sidebar taller than the panel is cropped from the top rather than
/// scaled; the returned frame flags it.
pub fn compose_frame(
    primary: &GrayImage,
    sidebar: &GrayImage,
    options: &FrameOptions,
) -> Result<ComposedFrame, PipelineError> {
    options.validate()?;
    ensure_not_empty(primary, "frame compositor (primary)")?;
    ensure_not_empty(sidebar, "frame compositor (sidebar)")?;

    let (primary_rect, divider_rect, sidebar_rect) =
        frame_layout(primary.dimensions(), sidebar.dimensions(), options);

    if primary_rect.right() > options.width || primary_rect.bottom() > options.height {
        tracing::warn!(
            "Primary content {}x{} exceeds frame {}x{}, clipping",
            primary_rect.width,
            primary_rect.height,
            options.width,
            options.height
        );
    }
    if sidebar_rect.right() > options.width {
        tracing::warn!(
            "Sidebar ends at x={} beyond frame width {}, clipping",
            sidebar_rect.right(),
            options.width
        );
    }

    let sidebar_cropped = sidebar.height() > options.height;
    let mut canvas = LumaCanvas::new(options.width, options.height);
    canvas.paste(primary, 0, 0);
    canvas.fill_rect(
        divider_rect.x as i32,
        divider_rect.y as i32,
        divider_rect.width,
        divider_rect.height,
    );

    if sidebar_cropped {
        tracing::warn!(
            "Sidebar height {} exceeds frame height {}, cropping bottom (lossy)",
            sidebar.height(),
            options.height
        );
        let cropped = imageops::crop_imm(sidebar, 0, 0, sidebar.width(), options.height).to_image();
        canvas.paste(&cropped, sidebar_rect.x as i64, sidebar_rect.y as i64);
    } else {
        canvas.paste(sidebar, sidebar_rect.x as i64, sidebar_rect.y as i64);
    }

    tracing::info!("Composed layout: {}x{}", options.width, options.height);
    Ok(ComposedFrame {
        image: canvas.into_image(),
        sidebar_cropped,
    })
}
