use std::fs;
use std::path::Path;

use image::ImageFormat;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use crate::{
    error::{Result, ReviewError},
    io::layout::ReviewLayout,
    raster::{ScienceImage, Segmentation, TrailMask},
    traits::{CatalogStore, RasterStore},
    types::{Catalog, Extension, TrailId, TrailProfile},
};

/// Catalog and raster store backed by the review directory layout.
#[derive(Debug, Clone)]
pub struct FsStore {
    layout: ReviewLayout,
}

impl FsStore {
    pub fn new(layout: ReviewLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &ReviewLayout {
        &self.layout
    }
}

fn require(what: &'static str, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ReviewError::not_found(what, path))
    }
}

fn read_json<T: DeserializeOwned>(what: &'static str, path: &Path) -> Result<T> {
    require(what, path)?;
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');
    fs::write(path, json)?;
    debug!("Wrote {}", path.display());
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

impl CatalogStore for FsStore {
    fn load_catalog(&self, image: &str, extension: Extension) -> Result<Catalog> {
        let catalog: Catalog = read_json("catalog", &self.layout.catalog(image, extension))?;
        Ok(catalog.normalized())
    }

    fn save_catalog(&self, catalog: &Catalog, image: &str, extension: Extension) -> Result<()> {
        write_json(catalog, &self.layout.catalog(image, extension))
    }
}

impl RasterStore for FsStore {
    fn load_original(&self, image: &str, extension: Extension) -> Result<ScienceImage> {
        let path = self.layout.original(image, extension);
        require("original image", &path)?;
        Ok(image::open(&path)?.to_luma32f())
    }

    fn load_mask(&self, image: &str, extension: Extension) -> Result<TrailMask> {
        let path = self.layout.mask(image, extension);
        require("mask", &path)?;
        Ok(image::open(&path)?.to_luma8())
    }

    fn load_segmentation(&self, image: &str, extension: Extension) -> Result<Segmentation> {
        let path = self.layout.segmentation(image, extension);
        require("segmentation", &path)?;
        Ok(image::open(&path)?.to_luma16())
    }

    fn save_mask(&self, mask: &TrailMask, image: &str, extension: Extension) -> Result<()> {
        let path = self.layout.mask(image, extension);
        ensure_parent(&path)?;
        mask.save_with_format(&path, ImageFormat::Png)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn save_segmentation(&self, segmentation: &Segmentation, image: &str, extension: Extension) -> Result<()> {
        let path = self.layout.segmentation(image, extension);
        ensure_parent(&path)?;
        segmentation.save_with_format(&path, ImageFormat::Png)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn load_profile(&self, image: &str, extension: Extension, id: TrailId) -> Result<TrailProfile> {
        read_json("profile", &self.layout.profile(image, extension, id))
    }

    fn save_profile(&self, profile: &TrailProfile, image: &str, extension: Extension, id: TrailId) -> Result<()> {
        write_json(profile, &self.layout.profile(image, extension, id))
    }
}
