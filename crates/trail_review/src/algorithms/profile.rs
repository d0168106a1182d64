use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Result, ReviewError},
    raster::{finite_median, ScienceImage},
    types::Point,
};

/// Median cross-section of a trail, one value per perpendicular offset.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSection {
    pub values: Vec<Option<f32>>,
    /// Index of the centerline within `values`.
    pub center: f64,
}

/// Samples the binned image along a trail to build its cross-section.
///
/// For every offset in `[-buffer, buffer]` the image is sampled at unit steps along the trail,
/// shifted perpendicular by that offset. Offsets with fewer than `min_count` finite samples are
/// reported as `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileExtractor {
    pub buffer: u32,
    pub min_count: usize,
}

impl Default for ProfileExtractor {
    fn default() -> Self {
        Self {
            buffer: 100,
            min_count: 25,
        }
    }
}

impl ProfileExtractor {
    pub fn new(buffer: u32, min_count: usize) -> Self {
        Self { buffer, min_count }
    }

    pub fn extract(&self, image: &ScienceImage, endpoints: [Point; 2]) -> Result<CrossSection> {
        let [p0, p1] = endpoints;
        let (dx, dy) = (p1[0] - p0[0], p1[1] - p0[1]);
        let length = dx.hypot(dy);
        if !length.is_finite() || length < f64::EPSILON {
            return Err(ReviewError::validation("trail endpoints must be distinct"));
        }

        let (ux, uy) = (dx / length, dy / length);
        let (nx, ny) = (-uy, ux);
        let steps = length.floor() as u32;
        let buffer = i64::from(self.buffer);

        let mut samples = Vec::with_capacity(steps as usize + 1);
        let values = (-buffer..=buffer)
            .map(|offset| {
                samples.clear();
                let offset = offset as f64;
                for step in 0..=steps {
                    let t = f64::from(step);
                    let x = p0[0] + ux * t + nx * offset;
                    let y = p0[1] + uy * t + ny * offset;
                    if let Some(value) = sample(image, x, y) {
                        samples.push(value);
                    }
                }
                let finite = samples.iter().filter(|v| v.is_finite()).count();
                if finite < self.min_count {
                    None
                } else {
                    finite_median(&mut samples)
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "Extracted profile over {} offsets, {} with enough signal",
            values.len(),
            values.iter().filter(|v| v.is_some()).count()
        );

        Ok(CrossSection {
            values,
            center: f64::from(self.buffer),
        })
    }
}

/// Nearest-pixel lookup, `None` outside the raster.
fn sample(image: &ScienceImage, x: f64, y: f64) -> Option<f32> {
    let (xi, yi) = (x.round(), y.round());
    if xi < 0.0 || yi < 0.0 || xi >= f64::from(image.width()) || yi >= f64::from(image.height()) {
        return None;
    }
    Some(image.get_pixel(xi as u32, yi as u32)[0])
}
