//! Contrast normalization for luminance images.
//!
//! Two strategies are available:
//! - Adaptive: contrast limited adaptive histogram equalization (CLAHE) over
//!   a grid of tiles, bilinearly blended between tile centers
//! - Linear boost: scales each pixel's distance from mid-gray

use super::PipelineError;
use image::{GrayImage, Luma};

/// Pivot for the linear boost
const MID_GRAY: f32 = 127.0;

/// Number of luminance levels
const LEVELS: usize = 256;

/// Contrast enhancement strategy
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ContrastStrategy {
    /// Tile-local histogram equalization with a clip limit
    Adaptive {
        /// Relative clip limit (OpenCV semantics); 0 disables clipping
        clip_limit: f32,
        /// Number of tiles along each axis
        tile_grid_size: u32,
    },
    /// Global scale of the deviation from mid-gray
    LinearBoost {
        /// Multiplier applied to `value - 127`
        factor: f32,
    },
}

impl ContrastStrategy {
    /// Build a strategy from its configured name and parameters.
    ///
    /// Accepted names are `adaptive` and `linear_boost`.
    pub fn from_name(
        name: &str,
        clip_limit: f32,
        tile_grid_size: u32,
        factor: f32,
    ) -> Result<Self, PipelineError> {
        let strategy = match name.trim().to_ascii_lowercase().as_str() {
            "adaptive" => ContrastStrategy::Adaptive {
                clip_limit,
                tile_grid_size,
            },
            "linear_boost" => ContrastStrategy::LinearBoost { factor },
            other => {
                return Err(PipelineError::Configuration(format!(
                    "unknown contrast strategy '{}'",
                    other
                )));
            }
        };
        strategy.validate()?;
        Ok(strategy)
    }

    /// Check the strategy parameters
    pub fn validate(&self) -> Result<(), PipelineError> {
        match *self {
            ContrastStrategy::Adaptive {
                clip_limit,
                tile_grid_size,
            } => {
                if tile_grid_size == 0 {
                    return Err(PipelineError::Configuration(
                        "tile_grid_size must be at least 1".to_string(),
                    ));
                }
                if !clip_limit.is_finite() || clip_limit < 0.0 {
                    return Err(PipelineError::Configuration(format!(
                        "clip_limit {} must be a non-negative number",
                        clip_limit
                    )));
                }
            }
            ContrastStrategy::LinearBoost { factor } => {
                if !factor.is_finite() || factor < 0.0 {
                    return Err(PipelineError::Configuration(format!(
                        "contrast boost {} must be a non-negative number",
                        factor
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Enhance contrast of a luminance image, returning a new image of the same size
pub fn normalize_contrast(
    img: GrayImage,
    strategy: &ContrastStrategy,
) -> Result<GrayImage, PipelineError> {
    super::ensure_not_empty(&img, "contrast normalizer")?;
    strategy.validate()?;

    match *strategy {
        ContrastStrategy::Adaptive {
            clip_limit,
            tile_grid_size,
        } => {
            tracing::info!(
                "Applying CLAHE contrast enhancement (clip {}, grid {}x{})",
                clip_limit,
                tile_grid_size,
                tile_grid_size
            );
            Ok(equalize_adaptive(&img, clip_limit, tile_grid_size))
        }
        ContrastStrategy::LinearBoost { factor } => {
            tracing::info!("Applying contrast boost: {}x", factor);
            Ok(linear_boost(img, factor))
        }
    }
}

/// Scale each pixel's deviation from mid-gray, clamped to 0..=255
fn linear_boost(mut img: GrayImage, factor: f32) -> GrayImage {
    let mut lut = [0u8; LEVELS];
    for (value, entry) in lut.iter_mut().enumerate() {
        let boosted = MID_GRAY + (value as f32 - MID_GRAY) * factor;
        *entry = boosted.round().clamp(0.0, 255.0) as u8;
    }

    for pixel in img.pixels_mut() {
        pixel.0[0] = lut[pixel.0[0] as usize];
    }
    img
}

/// Tile layout along one axis
#[derive(Debug, Clone, Copy)]
struct Axis {
    tiles: u32,
    tile_len: u32,
    len: u32,
}

impl Axis {
    /// Split `len` pixels into at most `requested` non-empty tiles
    fn new(len: u32, requested: u32) -> Self {
        let requested = requested.clamp(1, len);
        let tile_len = len.div_ceil(requested);
        let tiles = len.div_ceil(tile_len);
        Self {
            tiles,
            tile_len,
            len,
        }
    }

    fn bounds(&self, tile: u32) -> (u32, u32) {
        let start = tile * self.tile_len;
        (start, (start + self.tile_len).min(self.len))
    }

    /// Neighbouring tile indices and the weight of the second one
    fn neighbours(&self, pos: u32) -> (usize, usize, f32) {
        let t = (pos as f32 + 0.5) / self.tile_len as f32 - 0.5;
        let lower = t.floor();
        let weight = t - lower;
        let last = self.tiles as i64 - 1;
        let first = (lower as i64).clamp(0, last) as usize;
        let second = (lower as i64 + 1).clamp(0, last) as usize;
        (first, second, weight)
    }
}

/// Contrast limited adaptive histogram equalization
fn equalize_adaptive(img: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (width, height) = img.dimensions();
    let x_axis = Axis::new(width, grid);
    let y_axis = Axis::new(height, grid);

    tracing::debug!(
        "CLAHE tiles: {}x{} of {}x{} px",
        x_axis.tiles,
        y_axis.tiles,
        x_axis.tile_len,
        y_axis.tile_len
    );

    // One lookup table per tile, row-major
    let mut luts: Vec<[u8; LEVELS]> = Vec::with_capacity((x_axis.tiles * y_axis.tiles) as usize);
    for ty in 0..y_axis.tiles {
        for tx in 0..x_axis.tiles {
            let (x0, x1) = x_axis.bounds(tx);
            let (y0, y1) = y_axis.bounds(ty);
            luts.push(tile_lut(img, x0..x1, y0..y1, clip_limit));
        }
    }

    let tiles_x = x_axis.tiles as usize;
    GrayImage::from_fn(width, height, |x, y| {
        let value = img.get_pixel(x, y).0[0] as usize;
        let (tx1, tx2, xa) = x_axis.neighbours(x);
        let (ty1, ty2, ya) = y_axis.neighbours(y);

        let top = luts[ty1 * tiles_x + tx1][value] as f32 * (1.0 - xa)
            + luts[ty1 * tiles_x + tx2][value] as f32 * xa;
        let bottom = luts[ty2 * tiles_x + tx1][value] as f32 * (1.0 - xa)
            + luts[ty2 * tiles_x + tx2][value] as f32 * xa;
        let blended = top * (1.0 - ya) + bottom * ya;

        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Clipped, redistributed cumulative histogram of one tile as a lookup table
fn tile_lut(
    img: &GrayImage,
    xs: std::ops::Range<u32>,
    ys: std::ops::Range<u32>,
    clip_limit: f32,
) -> [u8; LEVELS] {
    let mut hist = [0u32; LEVELS];
    for y in ys.clone() {
        for x in xs.clone() {
            hist[img.get_pixel(x, y).0[0] as usize] += 1;
        }
    }

    let area = (xs.len() * ys.len()) as u32;

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / LEVELS as f32) as u32).max(1);
        let mut excess = 0u32;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }

        let batch = excess / LEVELS as u32;
        let mut residual = excess % LEVELS as u32;
        for bin in hist.iter_mut() {
            *bin += batch;
        }
        if residual > 0 {
            let step = (LEVELS as u32 / residual).max(1) as usize;
            let mut i = 0;
            while i < LEVELS && residual > 0 {
                hist[i] += 1;
                residual -= 1;
                i += step;
            }
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; LEVELS];
    let mut sum = 0u32;
    for (entry, count) in lut.iter_mut().zip(hist.iter()) {
        sum += count;
        *entry = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }
    lut
}
