use geo::{BoundingRect, Contains};
use geo_types::{Coord, LineString, Point, Polygon};
use image::Luma;

use crate::{
    error::{Result, ReviewError},
    raster::{RasterShape, TrailRasters, MASKED},
    traits::MaskGenerator,
    types::TrailGeometry,
};

/// Rasterizes each trail as a rectangle of its width around the segment between its endpoints.
///
/// A pixel belongs to a trail when its center lies strictly inside the rectangle. Trails are
/// painted in order, so where two footprints overlap the later trail owns the pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct FootprintMaskGenerator;

impl FootprintMaskGenerator {
    /// Polygon covering one trail, with the width raised to `min_width`.
    pub fn footprint(trail: &TrailGeometry, min_width: f64) -> Polygon<f64> {
        let half = trail.width.max(min_width) / 2.0;
        let [p0, p1] = trail.endpoints;
        let length = trail.length();

        // Unit vector along the trail, and its normal. Zero-length trails become a square.
        let (ux, uy) = if length > f64::EPSILON {
            ((p1[0] - p0[0]) / length, (p1[1] - p0[1]) / length)
        } else {
            (1.0, 0.0)
        };
        let (nx, ny) = (-uy * half, ux * half);
        let (ex, ey) = if length > f64::EPSILON { (0.0, 0.0) } else { (half, 0.0) };

        let a = Coord { x: p0[0] - ex, y: p0[1] - ey };
        let b = Coord { x: p1[0] + ex, y: p1[1] + ey };

        Polygon::new(
            LineString::from(vec![
                Coord { x: a.x + nx, y: a.y + ny },
                Coord { x: b.x + nx, y: b.y + ny },
                Coord { x: b.x - nx, y: b.y - ny },
                Coord { x: a.x - nx, y: a.y - ny },
                Coord { x: a.x + nx, y: a.y + ny },
            ]),
            vec![],
        )
    }
}

impl MaskGenerator for FootprintMaskGenerator {
    fn generate(&self, shape: RasterShape, trails: &[TrailGeometry], min_width: f64) -> Result<TrailRasters> {
        let mut rasters = TrailRasters::empty(shape);
        if shape.is_empty() {
            return Ok(rasters);
        }

        for trail in trails {
            let label = u16::try_from(trail.id)
                .ok()
                .filter(|label| *label != 0)
                .ok_or_else(|| {
                    ReviewError::validation(format!(
                        "trail id {} cannot be stored in a 16-bit segmentation",
                        trail.id
                    ))
                })?;

            let polygon = Self::footprint(trail, min_width);
            let Some(bounds) = polygon.bounding_rect() else {
                continue;
            };

            let max_x = f64::from(shape.width - 1);
            let max_y = f64::from(shape.height - 1);
            let x0 = bounds.min().x.floor().clamp(0.0, max_x) as u32;
            let x1 = bounds.max().x.ceil().clamp(0.0, max_x) as u32;
            let y0 = bounds.min().y.floor().clamp(0.0, max_y) as u32;
            let y1 = bounds.max().y.ceil().clamp(0.0, max_y) as u32;

            for y in y0..=y1 {
                for x in x0..=x1 {
                    if polygon.contains(&Point::new(f64::from(x), f64::from(y))) {
                        rasters.segmentation.put_pixel(x, y, Luma([label]));
                        rasters.mask.put_pixel(x, y, Luma([MASKED]));
                    }
                }
            }
        }

        Ok(rasters)
    }
}
