use tracing::debug;

use crate::{
    error::{Result, ReviewError},
    types::{Catalog, Point, TrailId, TrailRecord, TrailStatus, MISSING_MEASUREMENT},
};

/// Geometry of a trail entered by the analyst, in binned raster coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewTrail {
    pub endpoints: [Point; 2],
    pub width: f64,
    pub status: TrailStatus,
}

/// In-memory edits to the live catalog.
///
/// Every successful mutation marks the catalog dirty and the rasters stale. The two flags are
/// cleared separately: `mark_synchronized` after the rasters have been regenerated and
/// `mark_saved` once the catalog and rasters are on disk.
#[derive(Debug, Clone)]
pub struct CatalogEditor {
    catalog: Catalog,
    dirty: bool,
    masks_stale: bool,
}

impl CatalogEditor {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            dirty: false,
            masks_stale: false,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// True when the mask/segmentation no longer reflect the accepted subset.
    pub fn masks_stale(&self) -> bool {
        self.masks_stale
    }

    pub fn mark_synchronized(&mut self) {
        self.masks_stale = false;
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.masks_stale = true;
    }

    pub fn set_status(&mut self, id: TrailId, status: TrailStatus) -> Result<()> {
        let record = self.catalog.find_mut(id).ok_or(ReviewError::UnknownTrail(id))?;
        debug!("Trail {}: status {} -> {}", id, record.status.0, status.0);
        record.status = status;
        self.touch();
        Ok(())
    }

    pub fn set_width(&mut self, id: TrailId, width: f64) -> Result<()> {
        validate_width(width)?;
        let record = self.catalog.find_mut(id).ok_or(ReviewError::UnknownTrail(id))?;
        debug!("Trail {}: width {} -> {}", id, record.width, width);
        record.width = width;
        self.touch();
        Ok(())
    }

    /// Appends a record with a fresh id and every auxiliary column set to the missing sentinel.
    pub fn insert(&mut self, trail: NewTrail) -> Result<TrailId> {
        validate_width(trail.width)?;
        let [p0, p1] = trail.endpoints;
        if p0.iter().chain(p1.iter()).any(|c| !c.is_finite()) {
            return Err(ReviewError::validation("trail endpoints must be finite numbers"));
        }
        if p0 == p1 {
            return Err(ReviewError::validation("trail endpoints must be distinct"));
        }

        let id = self.catalog.next_id();
        let mut record = TrailRecord::new(id, trail.status, trail.endpoints, trail.width);
        for column in &self.catalog.columns {
            record.aux.insert(column.clone(), MISSING_MEASUREMENT.into());
        }
        self.catalog.trails.push(record);
        self.touch();
        Ok(id)
    }
}

fn validate_width(width: f64) -> Result<()> {
    if width.is_finite() && width > 0.0 {
        Ok(())
    } else {
        Err(ReviewError::validation(format!("width must be a positive number, got {width}")))
    }
}

/// Parses analyst input for a new trail width.
pub fn parse_width(input: &str) -> Result<f64> {
    let width = input
        .trim()
        .parse::<f64>()
        .map_err(|_| ReviewError::validation(format!("'{}' is not a number", input.trim())))?;
    validate_width(width)?;
    Ok(width)
}
