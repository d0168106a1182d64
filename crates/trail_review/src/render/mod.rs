//! Diagnostic figures for the analyst.
//!
//! Chips are stacked vertically, WFC1 on top, each drawn as a stretched grayscale image with the
//! accepted-trail mask tinted over it. Trail figures additionally highlight the trail under review
//! and plot its cross-section profile underneath.

use std::fs;
use std::path::Path;

use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use tracing::{debug, warn};

use crate::{
    error::Result,
    raster::{finite_median, ChipRasters, ScienceImage, TrailMask, TrailRasters},
    traits::{DiagnosticRenderer, RenderOutcome},
    types::{Catalog, Extension, TrailProfile, TrailRecord, TrailStatus},
};

pub mod colors {
    use image::Rgb;

    pub const ACCEPTED: Rgb<u8> = Rgb([0, 200, 0]);
    pub const REJECTED: Rgb<u8> = Rgb([220, 40, 40]);
    pub const PENDING: Rgb<u8> = Rgb([255, 200, 0]);
    pub const HIGHLIGHT: Rgb<u8> = Rgb([255, 0, 255]);
    pub const PROFILE: Rgb<u8> = Rgb([255, 255, 255]);
    pub const CENTER: Rgb<u8> = Rgb([0, 255, 255]);
    pub const WIDTH: Rgb<u8> = Rgb([255, 165, 0]);
    pub const BACKGROUND: Rgb<u8> = Rgb([20, 20, 20]);
}

const STATUS_BAR_HEIGHT: u32 = 6;
const PROFILE_PANEL_HEIGHT: u32 = 80;
const CHIP_GAP: u32 = 2;

/// One chip as it should appear in a figure.
#[derive(Debug, Clone, Copy)]
pub struct ChipView<'a> {
    pub extension: Extension,
    pub image: &'a ScienceImage,
    pub trails: &'a TrailRasters,
    /// Footprint of the trail under review, if it lives on this chip.
    pub highlight: Option<&'a TrailMask>,
    /// Catalog whose trail centerlines are drawn on top.
    pub catalog: Option<&'a Catalog>,
}

impl<'a> ChipView<'a> {
    pub fn of(extension: Extension, rasters: &'a ChipRasters, catalog: &'a Catalog) -> Self {
        Self {
            extension,
            image: &rasters.image,
            trails: &rasters.trails,
            highlight: None,
            catalog: Some(catalog),
        }
    }

    pub fn with_highlight(mut self, mask: &'a TrailMask) -> Self {
        self.highlight = Some(mask);
        self
    }
}

/// Sorts chips top to bottom in review order.
pub fn review_order(mut views: Vec<ChipView<'_>>) -> Vec<ChipView<'_>> {
    views.sort_by_key(|view| Extension::REVIEW_ORDER.iter().position(|e| *e == view.extension));
    views
}

/// Everything a per-trail figure shows.
#[derive(Debug, Clone)]
pub struct TrailDiagnostic<'a> {
    pub image_name: &'a str,
    pub chips: Vec<ChipView<'a>>,
    pub record: &'a TrailRecord,
    pub profile: Option<&'a TrailProfile>,
}

/// Everything a whole-image figure shows.
#[derive(Debug, Clone)]
pub struct ImageDiagnostic<'a> {
    pub image_name: &'a str,
    pub chips: Vec<ChipView<'a>>,
}

/// Renders figures as PNG files.
#[derive(Debug, Clone, Copy)]
pub struct PngRenderer {
    /// The stretch spans `median - low_sigma * sigma` to `median + high_sigma * sigma`.
    pub low_sigma: f32,
    pub high_sigma: f32,
    /// Mask tint opacity, 0 to 1.
    pub tint: f32,
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self {
            low_sigma: 1.0,
            high_sigma: 5.0,
            tint: 0.4,
        }
    }
}

impl PngRenderer {
    fn status_color(status: TrailStatus) -> Rgb<u8> {
        if status.is_accepted() {
            colors::ACCEPTED
        } else if status == TrailStatus::DEMOTED || status == TrailStatus::REJECTED {
            colors::REJECTED
        } else {
            colors::PENDING
        }
    }

    /// Grayscale stretch of `image` around its median.
    fn stretched(&self, image: &ScienceImage) -> RgbImage {
        let mut finite: Vec<f32> = image.pixels().map(|p| p[0]).filter(|v| v.is_finite()).collect();
        let count = finite.len().max(1) as f32;
        let mean = finite.iter().sum::<f32>() / count;
        let sigma = (finite.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / count).sqrt();
        let median = finite_median(&mut finite).unwrap_or(0.0);

        let lo = median - self.low_sigma * sigma;
        let hi = (median + self.high_sigma * sigma).max(lo + f32::EPSILON);

        RgbImage::from_fn(image.width(), image.height(), |x, y| {
            let value = image.get_pixel(x, y)[0];
            let level = if value.is_finite() {
                (((value - lo) / (hi - lo)).clamp(0.0, 1.0) * 255.0).round() as u8
            } else {
                0
            };
            Rgb([level, level, level])
        })
    }

    fn tint(&self, canvas: &mut RgbImage, mask: &TrailMask, color: Rgb<u8>, top: u32) {
        for (x, y, pixel) in mask.enumerate_pixels() {
            if pixel[0] == 0 || y + top >= canvas.height() || x >= canvas.width() {
                continue;
            }
            let target = canvas.get_pixel_mut(x, y + top);
            for channel in 0..3 {
                let blended = f32::from(target[channel]) * (1.0 - self.tint) + f32::from(color[channel]) * self.tint;
                target[channel] = blended.round() as u8;
            }
        }
    }

    /// Draws the chips from `top` down and returns the row below the last one.
    fn draw_chips(&self, canvas: &mut RgbImage, chips: &[ChipView<'_>], mut top: u32) -> u32 {
        for chip in chips {
            let panel = self.stretched(chip.image);
            image::imageops::replace(canvas, &panel, 0, i64::from(top));
            self.tint(canvas, &chip.trails.mask, colors::ACCEPTED, top);
            if let Some(highlight) = chip.highlight {
                self.tint(canvas, highlight, colors::HIGHLIGHT, top);
            }
            if let Some(catalog) = chip.catalog {
                for record in catalog.trails() {
                    let [p0, p1] = record.endpoints;
                    draw_line_segment_mut(
                        canvas,
                        (p0[0] as f32, p0[1] as f32 + top as f32),
                        (p1[0] as f32, p1[1] as f32 + top as f32),
                        Self::status_color(record.status),
                    );
                }
            }
            top += chip.image.height() + CHIP_GAP;
        }
        top
    }

    fn draw_profile(&self, canvas: &mut RgbImage, profile: &TrailProfile, top: u32) {
        let width = canvas.width();
        let height = PROFILE_PANEL_HEIGHT;
        if width < 2 || profile.values.len() < 2 {
            return;
        }

        let finite: Vec<f32> = profile.values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
        let Some((min, max)) = finite.iter().fold(None, |acc: Option<(f32, f32)>, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        }) else {
            return;
        };
        let span = (max - min).max(f32::EPSILON);

        let last = (profile.values.len() - 1) as f32;
        let x_of = |index: f64| index as f32 / last * (width - 1) as f32;
        let y_of = |value: f32| top as f32 + (height - 1) as f32 * (1.0 - (value - min) / span);

        let half_width = profile.width / 2.0;
        for (offset, color) in [
            (profile.center, colors::CENTER),
            (profile.center - half_width, colors::WIDTH),
            (profile.center + half_width, colors::WIDTH),
        ] {
            let x = x_of(offset);
            draw_line_segment_mut(canvas, (x, top as f32), (x, (top + height - 1) as f32), color);
        }

        let points: Vec<Option<(f32, f32)>> = profile
            .values
            .iter()
            .enumerate()
            .map(|(i, v)| v.filter(|v| v.is_finite()).map(|v| (x_of(i as f64), y_of(v))))
            .collect();
        for pair in points.windows(2) {
            if let [Some(a), Some(b)] = pair {
                draw_line_segment_mut(canvas, *a, *b, colors::PROFILE);
            }
        }
    }

    fn write(canvas: &RgbImage, output: &Path) -> Result<RenderOutcome> {
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent)?;
        }
        canvas.save_with_format(output, ImageFormat::Png)?;
        debug!("Rendered {}", output.display());
        Ok(RenderOutcome::Written)
    }

    fn skip(output: &Path, overwrite: bool) -> bool {
        if !overwrite && output.exists() {
            warn!("{} already exists, not overwriting", output.display());
            return true;
        }
        false
    }
}

fn canvas_for(chips: &[ChipView<'_>], extra: u32) -> RgbImage {
    let width = chips.iter().map(|c| c.image.width()).max().unwrap_or(1).max(1);
    let height: u32 = chips.iter().map(|c| c.image.height() + CHIP_GAP).sum::<u32>() + extra;
    RgbImage::from_pixel(width, height.max(1), colors::BACKGROUND)
}

impl DiagnosticRenderer for PngRenderer {
    fn render_trail(&self, view: &TrailDiagnostic<'_>, output: &Path, overwrite: bool) -> Result<RenderOutcome> {
        if Self::skip(output, overwrite) {
            return Ok(RenderOutcome::Skipped);
        }

        let mut canvas = canvas_for(&view.chips, STATUS_BAR_HEIGHT + PROFILE_PANEL_HEIGHT);
        let bar = Rect::at(0, 0).of_size(canvas.width(), STATUS_BAR_HEIGHT);
        draw_filled_rect_mut(&mut canvas, bar, Self::status_color(view.record.status));

        let bottom = self.draw_chips(&mut canvas, &view.chips, STATUS_BAR_HEIGHT);
        if let Some(profile) = view.profile {
            self.draw_profile(&mut canvas, profile, bottom);
        }

        debug!("Trail {} of {}: {}", view.record.id, view.image_name, view.record.status);
        Self::write(&canvas, output)
    }

    fn render_image(&self, view: &ImageDiagnostic<'_>, output: &Path, overwrite: bool) -> Result<RenderOutcome> {
        if Self::skip(output, overwrite) {
            return Ok(RenderOutcome::Skipped);
        }

        let mut canvas = canvas_for(&view.chips, 0);
        self.draw_chips(&mut canvas, &view.chips, 0);

        debug!("Image {} with {} chips", view.image_name, view.chips.len());
        Self::write(&canvas, output)
    }
}
