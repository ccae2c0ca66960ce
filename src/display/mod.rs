//! Display output.
//!
//! Frames go either to the Waveshare 7.5" V2 panel over SPI or, in test
//! mode, to a PNG file.

pub mod epd7in5v2;
pub mod interface;

pub use epd7in5v2::Epd7in5V2;
pub use interface::InterfaceError;

use crate::image_proc::dither_to_levels;
use image::GrayImage;
use std::path::PathBuf;
use thiserror::Error;

/// Display errors
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Panel interface error: {0}")]
    Interface(#[from] InterfaceError),

    #[error("Display not initialized")]
    NotInitialized,

    #[error("Invalid buffer size: expected {expected}, got {actual}")]
    InvalidBufferSize { expected: usize, actual: usize },

    #[error("Frame is {actual_width}x{actual_height}, panel needs {width}x{height}")]
    FrameSize {
        width: u32,
        height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Failed to save frame: {0}")]
    Save(#[from] image::ImageError),
}

/// Pack a luminance frame into the panel's 1-bit format
///
/// Gray levels are dithered against pure black and white first. Bits are
/// MSB first within each byte; a set bit is white.
pub fn to_panel_buffer(frame: &GrayImage, width: u32, height: u32) -> Result<Vec<u8>, DisplayError> {
    if frame.dimensions() != (width, height) {
        return Err(DisplayError::FrameSize {
            width,
            height,
            actual_width: frame.width(),
            actual_height: frame.height(),
        });
    }

    let mono = dither_to_levels(frame, &[0, 255]);
    let row_bytes = width.div_ceil(8) as usize;
    let mut buffer = vec![0u8; row_bytes * height as usize];

    for (x, y, pixel) in mono.enumerate_pixels() {
        if pixel.0[0] > 127 {
            buffer[y as usize * row_bytes + x as usize / 8] |= 0x80 >> (x % 8);
        }
    }
    Ok(buffer)
}

/// Where finished frames go
pub enum FrameSink {
    /// Test mode: write a PNG
    File(PathBuf),
    Panel(Epd7in5V2),
}

impl FrameSink {
    /// Open the panel, falling back to a file when the hardware is unavailable
    pub fn panel_or_file(fallback: PathBuf) -> Self {
        match Epd7in5V2::new() {
            Ok(panel) => FrameSink::Panel(panel),
            Err(e) => {
                tracing::error!("Failed to initialize e-ink display: {}", e);
                tracing::info!("Falling back to test mode");
                FrameSink::File(fallback)
            }
        }
    }

    /// Push a finished frame
    pub fn show(&mut self, frame: &GrayImage) -> Result<(), DisplayError> {
        match self {
            FrameSink::File(path) => {
                frame.save(&*path)?;
                tracing::info!("Test mode: Saved output to {}", path.display());
                Ok(())
            }
            FrameSink::Panel(panel) => {
                let buffer = to_panel_buffer(frame, epd7in5v2::WIDTH, epd7in5v2::HEIGHT)?;
                panel.init()?;
                panel.display(&buffer)?;
                tracing::info!("Display updated successfully");
                Ok(())
            }
        }
    }

    /// Blank the panel (no-op for files)
    pub fn clear(&mut self) -> Result<(), DisplayError> {
        match self {
            FrameSink::File(_) => Ok(()),
            FrameSink::Panel(panel) => panel.clear(),
        }
    }

    /// Put the panel to sleep (no-op for files)
    pub fn sleep(&mut self) -> Result<(), DisplayError> {
        match self {
            FrameSink::File(_) => Ok(()),
            FrameSink::Panel(panel) => panel.sleep(),
        }
    }
}
