//! Bulk demotion of trails whose orientation falls in known-bad angle ranges.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    editor::CatalogEditor,
    error::Result,
    io::ReviewLayout,
    raster::RasterShape,
    sync::MaskSynchronizer,
    traits::{CatalogStore, MaskGenerator, RasterStore},
    types::{Extension, TrailId, TrailStatus},
};

const LOG_SEPARATOR: &str = "    ";

/// Open interval of trail angles in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AngleRange(pub f64, pub f64);

impl AngleRange {
    pub fn contains(&self, theta: f64) -> bool {
        theta > self.0 && theta < self.1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AdjustOptions {
    /// Accepted trails with `theta` strictly inside any of these ranges are demoted.
    pub bad_theta_ranges: Vec<AngleRange>,
    /// Regenerate mask and segmentation of every catalog that changed.
    pub remake_masks: bool,
    /// Audit log, relative to the review directory unless absolute.
    pub log_file: PathBuf,
}

impl Default for AdjustOptions {
    fn default() -> Self {
        Self {
            bad_theta_ranges: vec![AngleRange(0.0, 3.0), AngleRange(87.0, 94.0), AngleRange(176.0, 180.0)],
            remake_masks: true,
            log_file: PathBuf::from("catalog_adjustments.txt"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    pub id: TrailId,
    pub from: TrailStatus,
    pub to: TrailStatus,
}

/// Demotes accepted trails whose `theta` lies inside a bad range. Trails without a numeric
/// `theta` are left alone.
pub fn demote_bad_angles(editor: &mut CatalogEditor, ranges: &[AngleRange]) -> Result<Vec<Adjustment>> {
    let targets: Vec<TrailId> = editor
        .catalog()
        .accepted()
        .filter(|trail| match trail.aux_f64("theta") {
            Some(theta) => ranges.iter().any(|range| range.contains(theta)),
            None => {
                debug!("Trail {} has no theta, leaving it alone", trail.id);
                false
            }
        })
        .map(|trail| trail.id)
        .collect();

    let mut adjustments = Vec::with_capacity(targets.len());
    for id in targets {
        editor.set_status(id, TrailStatus::DEMOTED)?;
        adjustments.push(Adjustment {
            id,
            from: TrailStatus::ACCEPTED,
            to: TrailStatus::DEMOTED,
        });
    }
    Ok(adjustments)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdjustReport {
    pub checked: usize,
    pub changed: usize,
    pub demoted: usize,
    pub failed: usize,
}

/// Applies [`demote_bad_angles`] to every catalog of a review directory.
pub struct CatalogAdjuster<'a, S: ?Sized, G: ?Sized> {
    store: &'a S,
    generator: &'a G,
    layout: &'a ReviewLayout,
    options: &'a AdjustOptions,
    min_mask_width: f64,
}

impl<'a, S, G> CatalogAdjuster<'a, S, G>
where
    S: CatalogStore + RasterStore + ?Sized,
    G: MaskGenerator + ?Sized,
{
    pub fn new(
        store: &'a S,
        generator: &'a G,
        layout: &'a ReviewLayout,
        options: &'a AdjustOptions,
        min_mask_width: f64,
    ) -> Self {
        Self {
            store,
            generator,
            layout,
            options,
            min_mask_width,
        }
    }

    pub fn log_path(&self) -> PathBuf {
        self.layout.review_dir.join(&self.options.log_file)
    }

    /// Adjusts each catalog in turn. A catalog that fails is logged and skipped.
    pub fn run(&self, catalogs: &[(String, Extension)]) -> Result<AdjustReport> {
        let log_path = self.log_path();
        if let Some(parent) = log_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut log = OpenOptions::new().create(true).append(true).open(&log_path)?;

        let mut report = AdjustReport::default();
        for (image, extension) in catalogs {
            report.checked += 1;
            match self.adjust(image, *extension, &mut log) {
                Ok(0) => debug!("{} ext {}: no changes necessary", image, extension),
                Ok(demoted) => {
                    report.changed += 1;
                    report.demoted += demoted;
                }
                Err(err) => {
                    error!("Failed to adjust {} ext {}: {}", image, extension, err);
                    report.failed += 1;
                }
            }
        }

        info!(
            "Checked {} catalogs: {} changed, {} trails demoted, {} failed",
            report.checked, report.changed, report.demoted, report.failed
        );
        Ok(report)
    }

    fn adjust(&self, image: &str, extension: Extension, log: &mut impl Write) -> Result<usize> {
        let catalog = self.store.load_catalog(image, extension)?;
        let mut editor = CatalogEditor::new(catalog);
        let adjustments = demote_bad_angles(&mut editor, &self.options.bad_theta_ranges)?;
        if adjustments.is_empty() {
            return Ok(0);
        }

        info!("Demoting {} trails in {} ext {}", adjustments.len(), image, extension);
        self.store.save_catalog(editor.catalog(), image, extension)?;
        write_audit(log, &self.layout.catalog(image, extension), &adjustments)?;

        if self.options.remake_masks {
            let shape = RasterShape::of(&self.store.load_segmentation(image, extension)?);
            let sync = MaskSynchronizer::new(self.generator, self.min_mask_width);
            let rasters = sync.rasters_for(editor.catalog(), shape, sync.floor_for_shape(shape).floor())?;
            self.store.save_segmentation(&rasters.segmentation, image, extension)?;
            self.store.save_mask(&rasters.mask, image, extension)?;
        }
        Ok(adjustments.len())
    }
}

fn write_audit(log: &mut impl Write, catalog: &Path, adjustments: &[Adjustment]) -> Result<()> {
    let now = Local::now().format("%m/%d/%Y, %H:%M:%S");
    writeln!(log, "{}{LOG_SEPARATOR}{now}", catalog.display())?;
    for adjustment in adjustments {
        writeln!(
            log,
            "{}{LOG_SEPARATOR}status{LOG_SEPARATOR}{}{LOG_SEPARATOR}{}",
            adjustment.id, adjustment.from.0, adjustment.to.0
        )?;
    }
    Ok(())
}
