use tracing::debug;

use crate::{
    error::Result,
    raster::ChipRasters,
    traits::{CatalogStore, RasterStore},
    types::{Catalog, Extension},
};

/// Catalog plus co-registered rasters of one (image, extension) pair.
#[derive(Debug, Clone)]
pub struct ChipState {
    pub catalog: Catalog,
    pub rasters: ChipRasters,
}

/// Loads catalog, mask, segmentation and original image of one chip.
///
/// The catalog is read first so a chip with no catalog fails with `NotFound` before any raster
/// is decoded.
pub fn load_chip<S>(store: &S, image: &str, extension: Extension) -> Result<ChipState>
where
    S: CatalogStore + RasterStore + ?Sized,
{
    let catalog = store.load_catalog(image, extension)?;
    let mask = store.load_mask(image, extension)?;
    let segmentation = store.load_segmentation(image, extension)?;
    let raw = store.load_original(image, extension)?;
    let rasters = ChipRasters::assemble(&raw, mask, segmentation)?;

    debug!(
        "Loaded {} ext {}: {} trails, bin factor {}, rasters {}",
        image,
        extension,
        catalog.len(),
        rasters.bin_factor,
        rasters.shape()
    );
    Ok(ChipState { catalog, rasters })
}
