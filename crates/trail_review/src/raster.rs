use std::fmt;

use image::{GenericImageView, GrayImage, ImageBuffer, Luma};

use crate::error::{Result, ReviewError};

/// Detector intensities, 32-bit float, one channel.
pub type ScienceImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Per-pixel trail labels; 0 is background, otherwise the owning trail id.
pub type Segmentation = ImageBuffer<Luma<u16>, Vec<u16>>;

/// Boolean trail mask stored as 0 / [`MASKED`].
pub type TrailMask = GrayImage;

pub const MASKED: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterShape {
    pub width: u32,
    pub height: u32,
}

impl RasterShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn of<I: GenericImageView>(image: &I) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for RasterShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Mask and segmentation of one chip. The mask is set exactly where the segmentation is nonzero.
#[derive(Debug, Clone, PartialEq)]
pub struct TrailRasters {
    pub mask: TrailMask,
    pub segmentation: Segmentation,
}

impl TrailRasters {
    pub fn empty(shape: RasterShape) -> Self {
        Self {
            mask: TrailMask::new(shape.width, shape.height),
            segmentation: Segmentation::new(shape.width, shape.height),
        }
    }

    pub fn shape(&self) -> RasterShape {
        RasterShape::of(&self.segmentation)
    }

    pub fn masked_pixels(&self) -> usize {
        self.mask.pixels().filter(|p| p[0] != 0).count()
    }
}

/// The live raster triple: binned image, mask and segmentation, all the same shape.
#[derive(Debug, Clone)]
pub struct ChipRasters {
    pub image: ScienceImage,
    pub trails: TrailRasters,
    pub bin_factor: u32,
}

impl ChipRasters {
    /// Bins `raw` down to the segmentation shape and checks the triple is co-registered.
    pub fn assemble(raw: &ScienceImage, mask: TrailMask, segmentation: Segmentation) -> Result<Self> {
        let shape = RasterShape::of(&segmentation);
        let bin_factor = bin_factor(RasterShape::of(raw), shape)?;
        let image = block_sum(raw, bin_factor);

        for found in [RasterShape::of(&image), RasterShape::of(&mask)] {
            if found != shape {
                return Err(ReviewError::ShapeMismatch { expected: shape, found });
            }
        }

        Ok(Self {
            image,
            trails: TrailRasters { mask, segmentation },
            bin_factor,
        })
    }

    pub fn shape(&self) -> RasterShape {
        self.trails.shape()
    }
}

/// Integer downsampling ratio between a raw chip and its mask, from the row counts.
pub fn bin_factor(raw: RasterShape, binned: RasterShape) -> Result<u32> {
    if binned.is_empty() || raw.height < binned.height {
        return Err(ReviewError::ShapeMismatch {
            expected: raw,
            found: binned,
        });
    }
    Ok(raw.height / binned.height)
}

/// Sums `factor` x `factor` blocks, ignoring non-finite pixels. Partial edge blocks are dropped.
pub fn block_sum(raw: &ScienceImage, factor: u32) -> ScienceImage {
    let factor = factor.max(1);
    let width = raw.width() / factor;
    let height = raw.height() / factor;

    ImageBuffer::from_fn(width, height, |bx, by| {
        let mut sum = 0.0f32;
        for y in by * factor..(by + 1) * factor {
            for x in bx * factor..(bx + 1) * factor {
                let value = raw.get_pixel(x, y)[0];
                if value.is_finite() {
                    sum += value;
                }
            }
        }
        Luma([sum])
    })
}

/// Median of the finite values, `None` if there are none.
pub fn finite_median(values: &mut Vec<f32>) -> Option<f32> {
    values.retain(|v| v.is_finite());
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
