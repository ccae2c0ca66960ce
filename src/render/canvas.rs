//! Drawing surface and font faces.
//!
//! [`LumaCanvas`] wraps an 8-bit luminance image and implements the
//! embedded-graphics `DrawTarget` trait, so text and primitives from the
//! embedded-graphics ecosystem can be drawn straight into pipeline images.

use core::convert::Infallible;
use embedded_graphics::{
    mono_font::{
        MonoFont, MonoTextStyle,
        iso_8859_1::{
            FONT_6X13, FONT_6X13_BOLD, FONT_7X14, FONT_7X14_BOLD, FONT_9X15, FONT_9X15_BOLD,
            FONT_9X18, FONT_9X18_BOLD,
        },
    },
    pixelcolor::{Gray8, GrayColor},
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text, renderer::TextRenderer},
};
use image::{GrayImage, Luma};

/// Ink color for text and rules
pub const INK: Gray8 = Gray8::BLACK;

/// Background fill (max luminance)
pub const PAPER: u8 = 255;

/// Luminance image usable as an embedded-graphics draw target
pub struct LumaCanvas {
    image: GrayImage,
}

impl LumaCanvas {
    /// Create a blank (white) canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: GrayImage::from_pixel(width, height, Luma([PAPER])),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Paste an opaque image with its top-left corner at (x, y), clipped to the canvas
    pub fn paste(&mut self, img: &GrayImage, x: i64, y: i64) {
        image::imageops::replace(&mut self.image, img, x, y);
    }

    /// Draw a single line of text with its top edge at `top`
    pub fn draw_text(&mut self, text: &str, style: MonoTextStyle<'_, Gray8>, left: i32, top: i32) {
        let Ok(_) = Text::with_baseline(text, Point::new(left, top), style, Baseline::Top).draw(self);
    }

    /// Fill a solid rectangle with ink
    pub fn fill_rect(&mut self, left: i32, top: i32, width: u32, height: u32) {
        let Ok(()) = Rectangle::new(Point::new(left, top), Size::new(width, height))
            .into_styled(PrimitiveStyle::with_fill(INK))
            .draw(self);
    }

    pub fn into_image(self) -> GrayImage {
        self.image
    }
}

impl DrawTarget for LumaCanvas {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.image.dimensions();
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if x < width && y < height {
                self.image.put_pixel(x, y, Luma([color.luma()]));
            }
        }
        Ok(())
    }
}

impl OriginDimensions for LumaCanvas {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

/// Font weight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Weight {
    Regular,
    Bold,
}

/// A matching regular/bold pair of monospace bitmap fonts
#[derive(Clone, Copy)]
pub struct FontFace {
    regular: &'static MonoFont<'static>,
    bold: &'static MonoFont<'static>,
}

/// Available faces, smallest first
const FACES: [FontFace; 4] = [
    FontFace {
        regular: &FONT_6X13,
        bold: &FONT_6X13_BOLD,
    },
    FontFace {
        regular: &FONT_7X14,
        bold: &FONT_7X14_BOLD,
    },
    FontFace {
        regular: &FONT_9X15,
        bold: &FONT_9X15_BOLD,
    },
    FontFace {
        regular: &FONT_9X18,
        bold: &FONT_9X18_BOLD,
    },
];

impl FontFace {
    /// Largest face whose glyph height fits in `px`, else the smallest one
    pub fn for_size(px: u32) -> Self {
        FACES
            .iter()
            .rev()
            .find(|face| face.height() <= px)
            .copied()
            .unwrap_or(FACES[0])
    }

    /// Largest available face
    pub fn largest() -> Self {
        FACES[FACES.len() - 1]
    }

    /// Glyph cell height in pixels
    pub fn height(&self) -> u32 {
        self.regular.character_size.height
    }

    pub fn style(&self, weight: Weight) -> MonoTextStyle<'static, Gray8> {
        let font = match weight {
            Weight::Regular => self.regular,
            Weight::Bold => self.bold,
        };
        MonoTextStyle::new(font, INK)
    }

    /// Rendered width of `text` in pixels
    pub fn measure(&self, text: &str, weight: Weight) -> u32 {
        self.style(weight)
            .measure_string(text, Point::zero(), Baseline::Top)
            .bounding_box
            .size
            .width
    }
}

impl std::fmt::Debug for FontFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self.regular.character_size;
        write!(f, "FontFace({}x{})", size.width, size.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_font_for_size() {
        assert_eq!(FontFace::for_size(14).height(), 14);
        assert_eq!(FontFace::for_size(16).height(), 15);
        assert_eq!(FontFace::for_size(40).height(), 18);
        assert_eq!(FontFace::for_size(8).height(), 13);
    }

    #[test]
    fn test_measure_is_monospace() {
        let face = FontFace::for_size(14);
        let one = face.measure("a", Weight::Regular);
        assert!(one > 0);
        assert_eq!(face.measure("abcd", Weight::Regular), one * 4);
        assert_eq!(face.measure("", Weight::Regular), 0);
    }

    #[test]
    fn test_draw_text_leaves_ink() {
        let mut canvas = LumaCanvas::new(60, 20);
        let face = FontFace::for_size(14);
        canvas.draw_text("Hi", face.style(Weight::Bold), 2, 2);
        let image = canvas.into_image();
        assert!(image.pixels().any(|p| p.0[0] == 0));
    }

    #[test]
    fn test_bold_is_heavier() {
        let face = FontFace::for_size(14);
        let ink = |weight| {
            let mut canvas = LumaCanvas::new(120, 20);
            canvas.draw_text("Manul", face.style(weight), 0, 0);
            canvas.into_image().pixels().filter(|p| p.0[0] == 0).count()
        };
        assert!(ink(Weight::Bold) > ink(Weight::Regular));
    }

    #[test]
    fn test_drawing_is_clipped() {
        let mut canvas = LumaCanvas::new(10, 10);
        canvas.fill_rect(-5, -5, 30, 30);
        let image = canvas.into_image();
        assert!(image.pixels().all(|p| p.0[0] == 0));
    }
}
