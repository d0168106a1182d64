//! Batch re-rendering of every persisted diagnostic figure.

use tracing::{error, info, warn};

use crate::{
    chip::{ChipState, load_chip},
    error::Result,
    io::ReviewLayout,
    render::{ChipView, ImageDiagnostic, TrailDiagnostic, review_order},
    sync::MaskSynchronizer,
    traits::{CatalogStore, DiagnosticRenderer, MaskGenerator, RasterStore, RenderOutcome},
    types::{Extension, TrailProfile, TrailRecord},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub written: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RefreshReport {
    fn record(&mut self, outcome: Result<RenderOutcome>, what: &str) {
        match outcome {
            Ok(RenderOutcome::Written) => self.written += 1,
            Ok(RenderOutcome::Skipped) => self.skipped += 1,
            Err(err) => {
                error!("Failed to render {}: {}", what, err);
                self.failed += 1;
            }
        }
    }
}

pub struct DiagnosticRefresh<'a, S: ?Sized, G: ?Sized, R: ?Sized> {
    store: &'a S,
    generator: &'a G,
    renderer: &'a R,
    layout: &'a ReviewLayout,
    min_mask_width: f64,
    overwrite: bool,
}

impl<'a, S, G, R> DiagnosticRefresh<'a, S, G, R>
where
    S: CatalogStore + RasterStore + ?Sized,
    G: MaskGenerator + ?Sized,
    R: DiagnosticRenderer + ?Sized,
{
    pub fn new(store: &'a S, generator: &'a G, renderer: &'a R, layout: &'a ReviewLayout, min_mask_width: f64) -> Self {
        Self {
            store,
            generator,
            renderer,
            layout,
            min_mask_width,
            overwrite: false,
        }
    }

    /// Replace figures that already exist instead of skipping them.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Renders every trail figure of every chip, then one whole-image figure per image.
    pub fn run(&self, images: &[String]) -> RefreshReport {
        let mut report = RefreshReport::default();
        for image in images {
            let chips: Vec<(Extension, ChipState)> = Extension::REVIEW_ORDER
                .iter()
                .filter_map(|&extension| match load_chip(self.store, image, extension) {
                    Ok(chip) => Some((extension, chip)),
                    Err(err) => {
                        warn!("Skipping {} ext {}: {}", image, extension, err);
                        None
                    }
                })
                .collect();
            if chips.is_empty() {
                report.failed += 1;
                continue;
            }

            let views = review_order(
                chips
                    .iter()
                    .map(|(extension, chip)| ChipView::of(*extension, &chip.rasters, &chip.catalog))
                    .collect(),
            );

            for (extension, chip) in &chips {
                for record in chip.catalog.trails() {
                    let what = format!("trail {} of {} ext {}", record.id, image, extension);
                    report.record(self.render_trail(image, *extension, chip, record, &views), &what);
                }
            }

            let diagnostic = ImageDiagnostic {
                image_name: image,
                chips: views,
            };
            report.record(
                self.renderer
                    .render_image(&diagnostic, &self.layout.image_diagnostic(image), self.overwrite),
                image,
            );
        }

        info!(
            "🖼️ Diagnostics: {} written, {} skipped, {} failed",
            report.written, report.skipped, report.failed
        );
        report
    }

    fn render_trail(
        &self,
        image: &str,
        extension: Extension,
        chip: &ChipState,
        record: &TrailRecord,
        views: &[ChipView<'_>],
    ) -> Result<RenderOutcome> {
        let sync = MaskSynchronizer::new(self.generator, self.min_mask_width);
        let highlight = sync.single_trail(record, chip.rasters.shape(), chip.rasters.bin_factor)?;
        let profile = self.profile(image, extension, record)?;

        let chips = views
            .iter()
            .map(|view| {
                if view.extension == extension {
                    view.with_highlight(&highlight.mask)
                } else {
                    *view
                }
            })
            .collect();
        let diagnostic = TrailDiagnostic {
            image_name: image,
            chips,
            record,
            profile: profile.as_ref(),
        };
        self.renderer.render_trail(
            &diagnostic,
            &self.layout.trail_diagnostic(image, extension, record.id),
            self.overwrite,
        )
    }

    /// A trail without a stored profile is drawn without the profile panel.
    fn profile(&self, image: &str, extension: Extension, record: &TrailRecord) -> Result<Option<TrailProfile>> {
        match self.store.load_profile(image, extension, record.id) {
            Ok(profile) => Ok(Some(profile)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
