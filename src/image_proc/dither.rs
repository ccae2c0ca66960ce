//! Adaptive palette quantization with Floyd-Steinberg dithering.
//!
//! Reduces a luminance image to a small set of gray levels chosen from the
//! image's own histogram (median cut). The indexed form is only used
//! internally; callers always get a luminance image back.
//!
//! Error diffusion uses the memory-optimized row-by-row approach: only the
//! current and next row of accumulated error are kept.

use super::PipelineError;
use image::{GrayImage, Luma};

const LEVELS: usize = 256;

/// Palette quantization options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteOptions {
    /// Number of gray levels in the palette (at least 2)
    pub colors: u32,
    /// Diffuse quantization error to neighbouring pixels
    pub dithering: bool,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            colors: 4,
            dithering: true,
        }
    }
}

impl PaletteOptions {
    /// Check the palette size
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.colors < 2 || self.colors > LEVELS as u32 {
            return Err(PipelineError::Configuration(format!(
                "palette_colors {} must be between 2 and {}",
                self.colors, LEVELS
            )));
        }
        Ok(())
    }
}

/// Palette-indexed image, private to the quantizer
struct IndexedImage {
    width: u32,
    height: u32,
    palette: Vec<u8>,
    indices: Vec<u8>,
}

impl IndexedImage {
    fn into_luma(self) -> GrayImage {
        let IndexedImage {
            width,
            height,
            palette,
            indices,
        } = self;
        GrayImage::from_fn(width, height, |x, y| {
            let index = indices[y as usize * width as usize + x as usize];
            Luma([palette[index as usize]])
        })
    }
}

/// Quantize a luminance image to an adaptive palette
///
/// The result holds at most `options.colors` distinct values. The palette
/// is the median cut of the image's histogram; with dithering enabled and
/// fewer distinct levels than requested, black and white are added so a
/// flat input still gets a texture.
pub fn quantize(img: GrayImage, options: &PaletteOptions) -> Result<GrayImage, PipelineError> {
    options.validate()?;
    super::ensure_not_empty(&img, "palette quantizer")?;

    let mut palette = median_cut(&histogram(&img), options.colors as usize);
    if options.dithering {
        palette = pad_levels(palette, options.colors as usize);
    }

    tracing::info!(
        "Quantizing to {} levels {} dithering: {:?}",
        palette.len(),
        if options.dithering { "with" } else { "without" },
        palette
    );

    let indexed = if options.dithering {
        diffuse(&img, &palette)
    } else {
        map_nearest(&img, &palette)
    };

    Ok(indexed.into_luma())
}

/// Floyd-Steinberg against a fixed set of levels, returning a luminance image
///
/// Used for the final 1-bit conversion where the palette is not adaptive.
pub fn dither_to_levels(img: &GrayImage, levels: &[u8]) -> GrayImage {
    let mut palette = levels.to_vec();
    palette.sort_unstable();
    palette.dedup();
    if palette.is_empty() {
        palette.push(0);
    }
    diffuse(img, &palette).into_luma()
}

fn histogram(img: &GrayImage) -> [u32; LEVELS] {
    let mut hist = [0u32; LEVELS];
    for pixel in img.pixels() {
        hist[pixel.0[0] as usize] += 1;
    }
    hist
}

/// A contiguous range of luminance values and its population
#[derive(Debug, Clone, Copy)]
struct Bucket {
    lo: usize,
    hi: usize,
    count: u64,
}

impl Bucket {
    fn new(hist: &[u32; LEVELS], lo: usize, hi: usize) -> Self {
        let count = hist[lo..=hi].iter().map(|&c| c as u64).sum();
        Self { lo, hi, count }
    }

    fn distinct(&self, hist: &[u32; LEVELS]) -> usize {
        hist[self.lo..=self.hi].iter().filter(|&&c| c > 0).count()
    }

    /// Weighted mean of the bucket, rounded
    fn level(&self, hist: &[u32; LEVELS]) -> u8 {
        let weighted: u64 = (self.lo..=self.hi)
            .map(|v| v as u64 * hist[v] as u64)
            .sum();
        ((weighted as f64 / self.count.max(1) as f64).round()) as u8
    }

    /// Split at the weighted median so both halves stay populated
    fn split(&self, hist: &[u32; LEVELS]) -> Option<(Bucket, Bucket)> {
        let occupied: Vec<usize> = (self.lo..=self.hi).filter(|&v| hist[v] > 0).collect();
        if occupied.len() < 2 {
            return None;
        }

        let half = self.count.div_ceil(2);
        let mut running = 0u64;
        let mut cut = occupied[0];
        for &v in &occupied[..occupied.len() - 1] {
            running += hist[v] as u64;
            cut = v;
            if running >= half {
                break;
            }
        }

        Some((Bucket::new(hist, self.lo, cut), Bucket::new(hist, cut + 1, self.hi)))
    }
}

/// Median cut over a luminance histogram, returning sorted distinct levels
fn median_cut(hist: &[u32; LEVELS], colors: usize) -> Vec<u8> {
    let Some(lo) = hist.iter().position(|&c| c > 0) else {
        return vec![0];
    };
    let hi = hist.iter().rposition(|&c| c > 0).unwrap_or(lo);

    let mut buckets = vec![Bucket::new(hist, lo, hi)];
    while buckets.len() < colors {
        // Most populated bucket that can still be split
        let candidate = buckets
            .iter()
            .enumerate()
            .filter(|(_, b)| b.distinct(hist) > 1)
            .max_by_key(|(_, b)| b.count)
            .map(|(i, _)| i);

        let Some(index) = candidate else {
            break;
        };
        let Some((left, right)) = buckets[index].split(hist) else {
            break;
        };
        buckets[index] = left;
        buckets.insert(index + 1, right);
    }

    // Buckets are disjoint and ordered, so their rounded means are too
    let mut levels: Vec<u8> = buckets.iter().map(|b| b.level(hist)).collect();
    levels.dedup();
    levels
}

/// Fill unused palette slots with black and white
///
/// Median-cut levels are never altered. A single level with only two slots
/// is replaced by black and white, since one extreme alone cannot texture
/// a flat gray.
fn pad_levels(mut levels: Vec<u8>, colors: usize) -> Vec<u8> {
    if levels.len() >= colors {
        return levels;
    }
    if levels.len() < 2 && colors == 2 {
        return vec![0, 255];
    }

    for extreme in [0u8, 255] {
        if levels.len() < colors && !levels.contains(&extreme) {
            levels.push(extreme);
        }
    }
    levels.sort_unstable();
    levels.dedup();
    levels
}

/// Index of the closest palette entry
#[inline]
fn nearest_index(value: i16, palette: &[u8]) -> usize {
    palette
        .iter()
        .enumerate()
        .min_by_key(|(_, level)| (value - **level as i16).abs())
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn map_nearest(img: &GrayImage, palette: &[u8]) -> IndexedImage {
    let mut lut = [0u8; LEVELS];
    for (value, entry) in lut.iter_mut().enumerate() {
        *entry = nearest_index(value as i16, palette) as u8;
    }

    IndexedImage {
        width: img.width(),
        height: img.height(),
        palette: palette.to_vec(),
        indices: img.pixels().map(|p| lut[p.0[0] as usize]).collect(),
    }
}

/// Floyd-Steinberg error diffusion (7/16 right, 3/16 below-left,
/// 5/16 below, 1/16 below-right)
fn diffuse(img: &GrayImage, palette: &[u8]) -> IndexedImage {
    let (width, height) = img.dimensions();
    let width_usize = width as usize;
    let height_usize = height as usize;

    // Error range stays well within i16
    let mut curr_row: Vec<i16> = vec![0; width_usize];
    let mut next_row: Vec<i16> = vec![0; width_usize];
    let mut indices = vec![0u8; width_usize * height_usize];

    for y in 0..height_usize {
        for (x, slot) in curr_row.iter_mut().enumerate() {
            *slot += img.get_pixel(x as u32, y as u32).0[0] as i16;
        }

        for x in 0..width_usize {
            let value = curr_row[x].clamp(0, 255);
            let index = nearest_index(value, palette);
            let err = value - palette[index] as i16;

            if x + 1 < width_usize {
                curr_row[x + 1] += err * 7 / 16;
            }

            if y + 1 < height_usize {
                if x > 0 {
                    next_row[x - 1] += err * 3 / 16;
                }
                next_row[x] += err * 5 / 16;
                if x + 1 < width_usize {
                    next_row[x + 1] += err / 16;
                }
            }

            indices[y * width_usize + x] = index as u8;
        }

        std::mem::swap(&mut curr_row, &mut next_row);
        next_row.iter_mut().for_each(|e| *e = 0);
    }

    IndexedImage {
        width,
        height,
        palette: palette.to_vec(),
        indices,
    }
}
