use tracing::debug;

use crate::{
    editor::CatalogEditor,
    error::{Result, ReviewError},
    raster::{ChipRasters, RasterShape, TrailRasters},
    traits::MaskGenerator,
    types::{Catalog, TrailGeometry, TrailRecord},
};

/// Width of a full, unbinned detector chip in pixels.
pub const REFERENCE_CHIP_WIDTH: f64 = 4096.0;

/// Default width floor in unbinned pixels.
pub const DEFAULT_MIN_MASK_WIDTH: f64 = 40.0;

/// Keeps mask and segmentation rasters in step with the accepted trails of a catalog.
pub struct MaskSynchronizer<'g, G: ?Sized> {
    generator: &'g G,
    /// Width floor in unbinned detector pixels.
    min_mask_width: f64,
}

impl<'g, G: MaskGenerator + ?Sized> MaskSynchronizer<'g, G> {
    pub fn new(generator: &'g G, min_mask_width: f64) -> Self {
        Self {
            generator,
            min_mask_width,
        }
    }

    /// Width floor in binned pixels for rasters binned by `bin_factor`.
    pub fn floor(&self, bin_factor: u32) -> f64 {
        self.min_mask_width / f64::from(bin_factor.max(1))
    }

    /// Width floor scaled by the raster width relative to a full chip, for when the raw image
    /// is not at hand.
    pub fn floor_for_shape(&self, shape: RasterShape) -> f64 {
        self.min_mask_width * f64::from(shape.width) / REFERENCE_CHIP_WIDTH
    }

    /// Rasters for the accepted subset of `catalog`, all zero if nothing is accepted.
    pub fn rasters_for(&self, catalog: &Catalog, shape: RasterShape, min_width: f64) -> Result<TrailRasters> {
        let accepted: Vec<TrailGeometry> = catalog.accepted().map(TrailRecord::geometry).collect();
        if accepted.is_empty() {
            debug!("No accepted trails, clearing rasters");
            return Ok(TrailRasters::empty(shape));
        }

        debug!("Generating rasters for {} accepted trails", accepted.len());
        let rasters = self.generator.generate(shape, &accepted, min_width)?;
        if rasters.shape() != shape {
            return Err(ReviewError::ShapeMismatch {
                expected: shape,
                found: rasters.shape(),
            });
        }
        Ok(rasters)
    }

    /// Regenerates the live rasters if the editor has unsynchronized changes.
    pub fn synchronize(&self, editor: &mut CatalogEditor, chip: &mut ChipRasters) -> Result<bool> {
        if !editor.masks_stale() {
            return Ok(false);
        }
        chip.trails = self.rasters_for(editor.catalog(), chip.shape(), self.floor(chip.bin_factor))?;
        editor.mark_synchronized();
        Ok(true)
    }

    /// Footprint of one trail on its own, used to highlight it in diagnostics.
    pub fn single_trail(&self, record: &TrailRecord, shape: RasterShape, bin_factor: u32) -> Result<TrailRasters> {
        self.generator.generate(shape, &[record.geometry()], self.floor(bin_factor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        algorithms::FootprintMaskGenerator,
        raster::{ScienceImage, MASKED},
        types::TrailStatus,
    };

    fn catalog() -> Catalog {
        Catalog::new(
            vec![],
            vec![
                TrailRecord::new(1, TrailStatus::ACCEPTED, [[1.0, 4.0], [14.0, 4.0]], 1.0),
                TrailRecord::new(2, TrailStatus::DEMOTED, [[1.0, 10.0], [14.0, 10.0]], 1.0),
            ],
        )
    }

    fn chip() -> ChipRasters {
        ChipRasters {
            image: ScienceImage::new(16, 16),
            trails: TrailRasters::empty(RasterShape::new(16, 16)),
            bin_factor: 4,
        }
    }

    #[test]
    fn test_accepting_trail_paints_its_pixels() {
        let generator = FootprintMaskGenerator;
        let sync = MaskSynchronizer::new(&generator, 4.0);
        let mut editor = CatalogEditor::new(catalog());
        let mut chip = chip();

        editor.set_status(2, TrailStatus::ACCEPTED).expect("Should accept trail");
        assert!(sync.synchronize(&mut editor, &mut chip).expect("Should synchronize"));

        let record = editor.catalog().find(2).expect("Should find trail");
        let alone = sync
            .single_trail(record, chip.shape(), chip.bin_factor)
            .expect("Should rasterize trail");
        for (x, y, pixel) in alone.mask.enumerate_pixels() {
            if pixel[0] == MASKED {
                assert_eq!(chip.trails.mask.get_pixel(x, y)[0], MASKED);
                assert_eq!(chip.trails.segmentation.get_pixel(x, y)[0], 2);
            }
        }
        assert!(alone.masked_pixels() > 0);
        assert!(!editor.masks_stale());
    }

    #[test]
    fn test_empty_accepted_subset_clears_rasters() {
        let generator = FootprintMaskGenerator;
        let sync = MaskSynchronizer::new(&generator, 4.0);
        let mut editor = CatalogEditor::new(catalog());
        let mut chip = chip();
        chip.trails = sync
            .rasters_for(editor.catalog(), chip.shape(), 1.0)
            .expect("Should rasterize");
        assert!(chip.trails.masked_pixels() > 0);

        editor.set_status(1, TrailStatus::REJECTED).expect("Should reject trail");
        sync.synchronize(&mut editor, &mut chip).expect("Should synchronize");

        assert_eq!(chip.trails, TrailRasters::empty(RasterShape::new(16, 16)));
    }

    #[test]
    fn test_floor_scales_with_binning() {
        let generator = FootprintMaskGenerator;
        let sync = MaskSynchronizer::new(&generator, DEFAULT_MIN_MASK_WIDTH);

        assert_eq!(sync.floor(4), 10.0);
        assert_eq!(sync.floor(0), 40.0);
        assert_eq!(sync.floor_for_shape(RasterShape::new(1024, 512)), 10.0);
    }

    #[test]
    fn test_floor_widens_narrow_trails() {
        let generator = FootprintMaskGenerator;
        let sync = MaskSynchronizer::new(&generator, 12.0);
        let mut editor = CatalogEditor::new(catalog());
        let mut chip = chip();
        editor.set_width(1, 0.5).expect("Should set width");

        sync.synchronize(&mut editor, &mut chip).expect("Should synchronize");

        // Floor is 12 / 4 = 3 binned pixels: rows 3, 4 and 5
        assert_eq!(chip.trails.masked_pixels(), 12 * 3);
    }

    #[test]
    fn test_clean_editor_is_left_alone() {
        let generator = FootprintMaskGenerator;
        let sync = MaskSynchronizer::new(&generator, 4.0);
        let mut editor = CatalogEditor::new(catalog());
        let mut chip = chip();

        assert!(!sync.synchronize(&mut editor, &mut chip).expect("Should synchronize"));
        assert_eq!(chip.trails.masked_pixels(), 0);
    }
}
