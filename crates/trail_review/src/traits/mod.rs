use std::path::Path;

use crate::{
    error::Result,
    raster::{RasterShape, ScienceImage, Segmentation, TrailMask, TrailRasters},
    render::{ImageDiagnostic, TrailDiagnostic},
    types::{Catalog, Extension, TrailGeometry, TrailId, TrailProfile},
};

/// Trait for loading and saving trail catalogs
pub trait CatalogStore {
    /// Load the catalog of one chip; a missing table is `NotFound`, an empty one is not an error
    fn load_catalog(&self, image: &str, extension: Extension) -> Result<Catalog>;

    /// Overwrite the catalog of one chip
    fn save_catalog(&self, catalog: &Catalog, image: &str, extension: Extension) -> Result<()>;
}

/// Trait for loading and saving the per-chip rasters and profile artifacts
pub trait RasterStore {
    /// Load the raw detector raster
    fn load_original(&self, image: &str, extension: Extension) -> Result<ScienceImage>;

    fn load_mask(&self, image: &str, extension: Extension) -> Result<TrailMask>;

    fn load_segmentation(&self, image: &str, extension: Extension) -> Result<Segmentation>;

    fn save_mask(&self, mask: &TrailMask, image: &str, extension: Extension) -> Result<()>;

    fn save_segmentation(&self, segmentation: &Segmentation, image: &str, extension: Extension) -> Result<()>;

    fn load_profile(&self, image: &str, extension: Extension, id: TrailId) -> Result<TrailProfile>;

    fn save_profile(&self, profile: &TrailProfile, image: &str, extension: Extension, id: TrailId) -> Result<()>;
}

/// Trait for turning trail geometries into mask and segmentation rasters
pub trait MaskGenerator {
    /// Rasterize `trails` onto a raster of `shape`. Widths below `min_width` are raised to it.
    /// Must be deterministic for identical inputs.
    fn generate(&self, shape: RasterShape, trails: &[TrailGeometry], min_width: f64) -> Result<TrailRasters>;
}

/// Whether a render call produced a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Written,
    /// The artifact already existed and overwrite was off
    Skipped,
}

/// Trait for producing diagnostic figures
pub trait DiagnosticRenderer {
    fn render_trail(&self, view: &TrailDiagnostic<'_>, output: &Path, overwrite: bool) -> Result<RenderOutcome>;

    fn render_image(&self, view: &ImageDiagnostic<'_>, output: &Path, overwrite: bool) -> Result<RenderOutcome>;
}

impl<T: MaskGenerator + ?Sized> MaskGenerator for &T {
    fn generate(&self, shape: RasterShape, trails: &[TrailGeometry], min_width: f64) -> Result<TrailRasters> {
        (**self).generate(shape, trails, min_width)
    }
}
