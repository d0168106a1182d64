//! Interactive review of every detected trail across a set of images.
//!
//! The session walks image by image, WFC1 before WFC2, through each chip's catalog. Trails whose
//! status is below the active filter are skipped. When a chip has nothing left to review the
//! session moves to the next chip, and after the last chip of an image it stops in image review
//! so the analyst can add trails the detector missed.

mod scratch;

#[cfg(test)]
mod tests;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr};
use tracing::{debug, error, info, warn};

pub use scratch::ScratchSpace;

use crate::{
    algorithms::{FootprintMaskGenerator, ProfileExtractor},
    chip::{load_chip, ChipState},
    editor::{parse_width, CatalogEditor, NewTrail},
    error::{Result, ReviewError},
    io::ReviewLayout,
    raster::ChipRasters,
    render::{review_order, ChipView, ImageDiagnostic, PngRenderer, TrailDiagnostic},
    sync::{MaskSynchronizer, DEFAULT_MIN_MASK_WIDTH},
    traits::{CatalogStore, DiagnosticRenderer, MaskGenerator, RasterStore},
    types::{Catalog, Extension, Point, TrailId, TrailProfile, TrailRecord, TrailStatus},
};

/// Tunables of a review session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SessionOptions {
    /// Review only accepted trails at start; `false` reviews everything.
    pub inspect_good_only: bool,
    /// Mask width floor in unbinned pixels.
    pub min_mask_width: f64,
    pub profile: ProfileExtractor,
    /// External image viewer, program followed by arguments.
    pub viewer_command: Option<String>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            inspect_good_only: true,
            min_mask_width: DEFAULT_MIN_MASK_WIDTH,
            profile: ProfileExtractor::default(),
            viewer_command: None,
        }
    }
}

/// Minimum status a trail needs to be reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StatusFilter {
    #[strum(to_string = "accepted only")]
    AcceptedOnly,
    #[strum(to_string = "everything")]
    Everything,
}

impl StatusFilter {
    pub fn threshold(self) -> TrailStatus {
        match self {
            Self::AcceptedOnly => TrailStatus::ACCEPTED,
            Self::Everything => TrailStatus::REJECTED,
        }
    }

    pub fn admits(self, status: TrailStatus) -> bool {
        status >= self.threshold()
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::AcceptedOnly => Self::Everything,
            Self::Everything => Self::AcceptedOnly,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ReviewMode {
    /// Focused on one trail of the live catalog
    Trail,
    /// Focused on the whole image after its trails are done
    Image,
    Ended,
}

/// Position of the session in the image list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub image: usize,
    pub extension: Extension,
}

impl Cursor {
    /// First chip of image `image`.
    pub fn start_of(image: usize) -> Self {
        Self {
            image,
            extension: Extension::Wfc1,
        }
    }

    /// The chip reviewed after this one: WFC2 of the same image, then WFC1 of the next.
    pub fn following(self) -> Self {
        match self.extension {
            Extension::Wfc1 => Self {
                image: self.image,
                extension: Extension::Wfc2,
            },
            Extension::Wfc2 => Self::start_of(self.image + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoOutcome {
    NothingToUndo,
    Reverted,
}

/// The one (image, extension) pair held in memory.
struct LiveChip {
    cursor: Cursor,
    editor: CatalogEditor,
    rasters: ChipRasters,
    /// The other chip of the image, read-only, for combined diagnostics.
    companion: Option<ChipState>,
}

/// Pre-edit state of the trail under review.
#[derive(Debug, Default)]
struct TrailBackup {
    profile: Option<TrailProfile>,
    diagnostic: Option<Vec<u8>>,
}

fn saving(path: PathBuf) -> impl FnOnce(ReviewError) -> ReviewError {
    move |source| ReviewError::Save {
        path,
        source: Box::new(source),
    }
}

fn copy_into(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

pub struct ReviewSession<S, G = FootprintMaskGenerator, R = PngRenderer> {
    store: S,
    generator: G,
    renderer: R,
    layout: ReviewLayout,
    options: SessionOptions,
    images: Vec<String>,
    scratch: ScratchSpace,

    mode: ReviewMode,
    cursor: Cursor,
    filter: StatusFilter,
    live: Option<LiveChip>,
    trail_index: Option<usize>,
    profile: Option<TrailProfile>,
    backup: TrailBackup,
}

impl<S> ReviewSession<S>
where
    S: CatalogStore + RasterStore,
{
    /// Session with the footprint mask generator and the PNG renderer.
    pub fn with_defaults(store: S, layout: ReviewLayout, images: Vec<String>, options: SessionOptions) -> Result<Self> {
        Self::new(store, FootprintMaskGenerator, PngRenderer::default(), layout, images, options)
    }
}

impl<S, G, R> ReviewSession<S, G, R>
where
    S: CatalogStore + RasterStore,
    G: MaskGenerator,
    R: DiagnosticRenderer,
{
    pub fn new(
        store: S,
        generator: G,
        renderer: R,
        layout: ReviewLayout,
        images: Vec<String>,
        options: SessionOptions,
    ) -> Result<Self> {
        let filter = if options.inspect_good_only {
            StatusFilter::AcceptedOnly
        } else {
            StatusFilter::Everything
        };
        Ok(Self {
            store,
            generator,
            renderer,
            layout,
            options,
            images,
            scratch: ScratchSpace::new()?,
            mode: ReviewMode::Ended,
            cursor: Cursor::start_of(0),
            filter,
            live: None,
            trail_index: None,
            profile: None,
            backup: TrailBackup::default(),
        })
    }

    // --- State ---

    pub fn mode(&self) -> ReviewMode {
        self.mode
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn filter(&self) -> StatusFilter {
        self.filter
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn current_image(&self) -> Option<&str> {
        self.live.as_ref().map(|live| self.images[live.cursor.image].as_str())
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.live.as_ref().map(|live| live.editor.catalog())
    }

    pub fn rasters(&self) -> Option<&ChipRasters> {
        self.live.as_ref().map(|live| &live.rasters)
    }

    pub fn current_trail(&self) -> Option<&TrailRecord> {
        if self.mode != ReviewMode::Trail {
            return None;
        }
        self.catalog().zip(self.trail_index).and_then(|(catalog, i)| catalog.get(i))
    }

    pub fn profile(&self) -> Option<&TrailProfile> {
        self.profile.as_ref()
    }

    /// True iff the live catalog or rasters differ from what is on disk.
    pub fn is_dirty(&self) -> bool {
        self.live.as_ref().is_some_and(|live| live.editor.is_dirty())
    }

    /// Diagnostic the analyst should be looking at: the working copy if there are unsaved edits,
    /// otherwise the persisted figure.
    pub fn current_diagnostic(&self) -> Option<PathBuf> {
        let live = self.live.as_ref()?;
        let image = &self.images[live.cursor.image];
        let (working, persisted) = match self.mode {
            ReviewMode::Trail => {
                let id = self.current_trail()?.id;
                (
                    self.scratch.trail_diagnostic(),
                    self.layout.trail_diagnostic(image, live.cursor.extension, id),
                )
            }
            ReviewMode::Image => (self.scratch.image_diagnostic(), self.layout.image_diagnostic(image)),
            ReviewMode::Ended => return None,
        };
        [working, persisted].into_iter().find(|path| path.is_file())
    }

    // --- Navigation ---

    /// Opens the first image and positions at its first reviewable trail.
    pub fn start(&mut self) -> Result<()> {
        info!("Starting review of {} images", self.images.len());
        self.open_from(Cursor::start_of(0));
        Ok(())
    }

    /// Saves pending edits, then moves to the next reviewable trail, chip or image.
    pub fn advance(&mut self) -> Result<()> {
        self.require_mode(ReviewMode::Trail, "next trail")?;
        if self.is_dirty() {
            self.save()?;
        }
        if self.enter_next_trail() {
            return Ok(());
        }
        match self.cursor.extension {
            Extension::Wfc2 => self.enter_image_review(),
            Extension::Wfc1 => self.open_from(self.cursor.following()),
        }
        Ok(())
    }

    /// Moves on to the next image without saving.
    pub fn advance_image(&mut self) -> Result<()> {
        self.require_mode(ReviewMode::Image, "next image")?;
        self.open_from(self.cursor.following());
        Ok(())
    }

    /// Restarts trail review of the current image.
    pub fn reexamine(&mut self) -> Result<()> {
        self.require_mode(ReviewMode::Image, "re-examine")?;
        self.open_from(Cursor::start_of(self.cursor.image));
        Ok(())
    }

    /// Abandons unsaved edits and opens image `index`.
    pub fn jump_to_image(&mut self, index: usize) -> Result<()> {
        if index >= self.images.len() {
            return Err(ReviewError::validation(format!(
                "image index {index} is out of range, there are {} images",
                self.images.len()
            )));
        }
        if self.is_dirty() {
            warn!("Discarding unsaved changes to {}", self.images[self.cursor.image]);
        }
        self.open_from(Cursor::start_of(index));
        Ok(())
    }

    /// Switches between reviewing accepted trails only and reviewing everything, then restarts
    /// the current image.
    pub fn toggle_filter(&mut self) -> Result<()> {
        if self.is_dirty() {
            warn!("Discarding unsaved changes to {}", self.images[self.cursor.image]);
        }
        self.filter = self.filter.toggled();
        info!("Now reviewing {} trails", self.filter);
        self.open_from(Cursor::start_of(self.cursor.image));
        Ok(())
    }

    pub fn quit(&mut self) {
        if self.is_dirty() {
            warn!("Quitting with unsaved changes");
        }
        self.live = None;
        self.mode = ReviewMode::Ended;
        info!("👋 Review session ended");
    }

    /// Loads chips starting at `start` until one has something to review.
    ///
    /// Chips whose files cannot be loaded are skipped. A chip without reviewable trails hands
    /// over to the next chip, except WFC2 which stops in image review.
    fn open_from(&mut self, start: Cursor) {
        let mut cursor = start;
        loop {
            self.cursor = cursor;
            self.live = None;
            self.trail_index = None;
            self.profile = None;
            self.backup = TrailBackup::default();

            let Some(image) = self.images.get(cursor.image).cloned() else {
                info!("No more images to review");
                self.mode = ReviewMode::Ended;
                return;
            };

            info!(
                "Image {} ({}/{}), extension {}",
                image,
                cursor.image + 1,
                self.images.len(),
                cursor.extension
            );
            match self.load_live(cursor) {
                Ok(live) => self.live = Some(live),
                Err(err) if err.is_not_found() => {
                    warn!("Skipping {} extension {}: {}", image, cursor.extension, err);
                    cursor = cursor.following();
                    continue;
                }
                Err(err) => {
                    error!("Skipping {} extension {}: {}", image, cursor.extension, err);
                    cursor = cursor.following();
                    continue;
                }
            }

            if let Err(err) = self.scratch.reset_image(&self.layout.image_diagnostic(&image)) {
                warn!("Could not prepare image diagnostic: {}", err);
            }
            if self.enter_next_trail() {
                return;
            }
            if cursor.extension == Extension::Wfc2 {
                self.enter_image_review();
                return;
            }
            debug!("Nothing to review on {} extension {}", image, cursor.extension);
            cursor = cursor.following();
        }
    }

    fn load_live(&self, cursor: Cursor) -> Result<LiveChip> {
        let image = self.images.get(cursor.image).ok_or(ReviewError::NothingLoaded)?;
        let ChipState { catalog, rasters } = load_chip(&self.store, image, cursor.extension)?;

        let companion = match load_chip(&self.store, image, cursor.extension.other()) {
            Ok(state) => Some(state),
            Err(err) => {
                warn!(
                    "Extension {} of {} unavailable for diagnostics: {}",
                    cursor.extension.other(),
                    image,
                    err
                );
                None
            }
        };

        Ok(LiveChip {
            cursor,
            editor: CatalogEditor::new(catalog),
            rasters,
            companion,
        })
    }

    /// Positions at the next trail after the current one that passes the filter.
    fn enter_next_trail(&mut self) -> bool {
        let Some(live) = self.live.as_ref() else {
            return false;
        };
        let start = self.trail_index.map_or(0, |i| i + 1);
        let filter = self.filter;

        let next = live
            .editor
            .catalog()
            .trails()
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, trail)| {
                let admitted = filter.admits(trail.status);
                if !admitted {
                    debug!("Skipping trail {} with status {}", trail.id, trail.status);
                }
                admitted
            })
            .map(|(index, _)| index);

        match next {
            Some(index) => {
                self.enter_trail(index);
                true
            }
            None => false,
        }
    }

    fn enter_trail(&mut self, index: usize) {
        let Some(live) = self.live.as_ref() else {
            return;
        };
        let Some(record) = live.editor.catalog().get(index) else {
            return;
        };
        let image = &self.images[live.cursor.image];
        let extension = live.cursor.extension;
        let id = record.id;

        self.profile = match self.store.load_profile(image, extension, id) {
            Ok(profile) => Some(profile),
            Err(err) if err.is_not_found() => {
                debug!("No stored profile for trail {}, extracting one", id);
                match self.options.profile.extract(&live.rasters.image, record.endpoints) {
                    Ok(section) => Some(TrailProfile {
                        values: section.values,
                        center: section.center,
                        width: record.width,
                        avg_flux: None,
                        snr: None,
                        extension,
                        image: image.clone(),
                    }),
                    Err(err) => {
                        warn!("Could not extract a profile for trail {}: {}", id, err);
                        None
                    }
                }
            }
            Err(err) => {
                warn!("No profile for trail {}: {}", id, err);
                None
            }
        };
        let diagnostic = fs::read(self.layout.trail_diagnostic(image, extension, id)).ok();
        if diagnostic.is_none() {
            debug!("No diagnostic on disk for trail {}", id);
        }
        info!("Trail {} ({}), width {:.2}", id, record.status, record.width);

        self.backup = TrailBackup {
            profile: self.profile.clone(),
            diagnostic,
        };
        if let Err(err) = self.scratch.clear_trail() {
            warn!("Could not clear working diagnostic: {}", err);
        }
        self.trail_index = Some(index);
        self.mode = ReviewMode::Trail;
    }

    fn enter_image_review(&mut self) {
        info!("No more trails to review, showing the whole image");
        self.mode = ReviewMode::Image;
        self.trail_index = None;
        self.profile = None;
        self.backup = TrailBackup::default();
        if let Err(err) = self.scratch.clear_trail() {
            warn!("Could not clear working diagnostic: {}", err);
        }
    }

    fn require_mode(&self, mode: ReviewMode, command: &str) -> Result<()> {
        if self.mode == mode {
            Ok(())
        } else {
            Err(ReviewError::InvalidCommand {
                command: command.to_string(),
                mode: self.mode.into(),
            })
        }
    }

    // --- Edits ---

    fn current_id(&self) -> Result<TrailId> {
        self.current_trail().map(|t| t.id).ok_or(ReviewError::NothingLoaded)
    }

    pub fn reject(&mut self) -> Result<()> {
        self.change_status(TrailStatus::REJECTED, "reject")
    }

    pub fn accept(&mut self) -> Result<()> {
        self.change_status(TrailStatus::ACCEPTED, "accept")
    }

    fn change_status(&mut self, status: TrailStatus, command: &str) -> Result<()> {
        self.require_mode(ReviewMode::Trail, command)?;
        let id = self.current_id()?;
        let live = self.live.as_mut().ok_or(ReviewError::NothingLoaded)?;
        live.editor.set_status(id, status)?;
        info!("Trail {} is now {}", id, status);

        self.resynchronize()?;
        self.regenerate_diagnostics();
        Ok(())
    }

    /// Sets the width of the current trail from analyst input.
    pub fn resize_width(&mut self, input: &str) -> Result<()> {
        self.require_mode(ReviewMode::Trail, "change width")?;
        let width = parse_width(input)?;
        let id = self.current_id()?;
        let live = self.live.as_mut().ok_or(ReviewError::NothingLoaded)?;
        live.editor.set_width(id, width)?;
        if let Some(profile) = self.profile.as_mut() {
            profile.width = width;
        }
        info!("Trail {} width set to {}", id, width);

        self.resynchronize()?;
        self.regenerate_diagnostics();
        Ok(())
    }

    /// Adds an accepted trail on `extension` of the current image.
    ///
    /// Endpoints are in unbinned detector pixels and the width in binned pixels. On success the
    /// session reviews the new trail.
    pub fn add_trail(&mut self, extension: Extension, start: Point, end: Point, width: f64) -> Result<TrailId> {
        self.require_mode(ReviewMode::Image, "add trail")?;
        if start.iter().chain(end.iter()).any(|c| !c.is_finite()) {
            return Err(ReviewError::validation("coordinates must be numbers"));
        }
        if !(width.is_finite() && width > 0.0) {
            return Err(ReviewError::validation(format!("width must be a positive number, got {width}")));
        }

        let target = Cursor {
            image: self.cursor.image,
            extension,
        };
        let image = self.images.get(target.image).cloned().ok_or(ReviewError::NothingLoaded)?;
        let mut switched = if self.live.as_ref().is_some_and(|live| live.cursor == target) {
            None
        } else {
            info!("Switching to extension {}", extension);
            Some(self.load_live(target)?)
        };

        let live = match switched.as_mut() {
            Some(live) => live,
            None => self.live.as_mut().ok_or(ReviewError::NothingLoaded)?,
        };
        let bin = f64::from(live.rasters.bin_factor);
        let endpoints = [[start[0] / bin, start[1] / bin], [end[0] / bin, end[1] / bin]];
        let section = self.options.profile.extract(&live.rasters.image, endpoints)?;
        let id = live.editor.insert(NewTrail {
            endpoints,
            width,
            status: TrailStatus::ACCEPTED,
        })?;
        let index = live.editor.catalog().len() - 1;

        if let Some(live) = switched {
            self.live = Some(live);
            self.cursor = target;
        }
        self.profile = Some(TrailProfile {
            values: section.values,
            center: section.center,
            width,
            avg_flux: None,
            snr: None,
            extension,
            image,
        });
        self.backup = TrailBackup::default();
        if let Err(err) = self.scratch.clear_trail() {
            warn!("Could not clear working diagnostic: {}", err);
        }
        self.trail_index = Some(index);
        self.mode = ReviewMode::Trail;
        info!("Added trail {} on extension {}", id, extension);

        self.resynchronize()?;
        self.regenerate_diagnostics();
        Ok(id)
    }

    fn resynchronize(&mut self) -> Result<()> {
        let sync = MaskSynchronizer::new(&self.generator, self.options.min_mask_width);
        if let Some(live) = self.live.as_mut() {
            if sync.synchronize(&mut live.editor, &mut live.rasters)? {
                debug!("Rasters now cover {} pixels", live.rasters.trails.masked_pixels());
            }
        }
        Ok(())
    }

    fn regenerate_diagnostics(&self) {
        if let Err(err) = self.render_working_diagnostics() {
            warn!("Could not refresh diagnostics: {}", err);
        }
    }

    fn render_working_diagnostics(&self) -> Result<()> {
        let live = self.live.as_ref().ok_or(ReviewError::NothingLoaded)?;
        let image = self.images[live.cursor.image].as_str();
        let catalog = live.editor.catalog();

        let mut views = vec![ChipView::of(live.cursor.extension, &live.rasters, catalog)];
        if let Some(companion) = live.companion.as_ref() {
            views.push(ChipView::of(live.cursor.extension.other(), &companion.rasters, &companion.catalog));
        }
        let views = review_order(views);

        if let Some(record) = self.current_trail() {
            let sync = MaskSynchronizer::new(&self.generator, self.options.min_mask_width);
            let highlight = sync.single_trail(record, live.rasters.shape(), live.rasters.bin_factor)?;
            let chips = views
                .iter()
                .map(|view| {
                    if view.extension == live.cursor.extension {
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
                profile: self.profile.as_ref(),
            };
            self.renderer
                .render_trail(&diagnostic, &self.scratch.trail_diagnostic(), true)?;
        }

        let diagnostic = ImageDiagnostic {
            image_name: image,
            chips: views,
        };
        self.renderer
            .render_image(&diagnostic, &self.scratch.image_diagnostic(), true)?;
        Ok(())
    }

    // --- Persistence ---

    /// Writes the live chip to disk.
    ///
    /// Order: trail diagnostic, image diagnostic, profile, mask, segmentation, catalog. The first
    /// failure aborts the save and names the file; the dirty flag stays set.
    pub fn save(&mut self) -> Result<()> {
        self.resynchronize()?;
        let live = self.live.as_ref().ok_or(ReviewError::NothingLoaded)?;
        let image = self.images[live.cursor.image].as_str();
        let extension = live.cursor.extension;
        let trail = self.current_trail().map(|t| t.id);

        if let Some(id) = trail {
            let working = self.scratch.trail_diagnostic();
            if working.is_file() {
                let target = self.layout.trail_diagnostic(image, extension, id);
                copy_into(&working, &target).map_err(saving(target))?;
            }
        }

        let working = self.scratch.image_diagnostic();
        if working.is_file() {
            let target = self.layout.image_diagnostic(image);
            copy_into(&working, &target).map_err(saving(target))?;
        }

        if let (Some(id), Some(profile)) = (trail, self.profile.as_ref()) {
            self.store
                .save_profile(profile, image, extension, id)
                .map_err(saving(self.layout.profile(image, extension, id)))?;
        }

        self.store
            .save_mask(&live.rasters.trails.mask, image, extension)
            .map_err(saving(self.layout.mask(image, extension)))?;
        self.store
            .save_segmentation(&live.rasters.trails.segmentation, image, extension)
            .map_err(saving(self.layout.segmentation(image, extension)))?;
        self.store
            .save_catalog(live.editor.catalog(), image, extension)
            .map_err(saving(self.layout.catalog(image, extension)))?;

        info!("✅ Saved {} extension {}", image, extension);

        let diagnostic = trail.and_then(|id| fs::read(self.layout.trail_diagnostic(image, extension, id)).ok());
        self.backup = TrailBackup {
            profile: self.profile.clone(),
            diagnostic,
        };
        if let Some(live) = self.live.as_mut() {
            live.editor.mark_saved();
        }
        Ok(())
    }

    /// Discards unsaved edits by reloading the live chip from disk.
    pub fn undo(&mut self) -> Result<UndoOutcome> {
        if !self.is_dirty() {
            info!("Nothing to undo");
            return Ok(UndoOutcome::NothingToUndo);
        }

        let cursor = self.cursor;
        let image = self.images.get(cursor.image).cloned().ok_or(ReviewError::NothingLoaded)?;
        let trail = self.current_trail().map(|t| t.id);
        let ChipState { catalog, rasters } = load_chip(&self.store, &image, cursor.extension)?;

        let live = self.live.as_mut().ok_or(ReviewError::NothingLoaded)?;
        live.editor = CatalogEditor::new(catalog);
        live.rasters = rasters;
        let restored = trail.and_then(|id| live.editor.catalog().position(id));

        if let Err(err) = self.scratch.reset_image(&self.layout.image_diagnostic(&image)) {
            warn!("Could not reset image diagnostic: {}", err);
        }

        match restored {
            Some(index) => {
                self.trail_index = Some(index);
                self.profile = self.backup.profile.clone();
                let restored_diagnostic = match self.backup.diagnostic.as_deref() {
                    Some(bytes) => self.scratch.restore_trail(bytes),
                    None => self.scratch.clear_trail(),
                };
                if let Err(err) = restored_diagnostic {
                    warn!("Could not restore trail diagnostic: {}", err);
                }
            }
            None => {
                // The trail only existed in memory; go back to where it was added from.
                if cursor.extension != Extension::Wfc2 {
                    let target = Cursor {
                        image: cursor.image,
                        extension: Extension::Wfc2,
                    };
                    self.live = Some(self.load_live(target)?);
                    self.cursor = target;
                }
                self.enter_image_review();
            }
        }

        info!("↩️ Reverted unsaved changes to {} extension {}", image, cursor.extension);
        Ok(UndoOutcome::Reverted)
    }

    // --- External viewer ---

    /// Opens the current chip's original image in the configured viewer.
    pub fn open_viewer(&self) -> Result<()> {
        let command = self
            .options
            .viewer_command
            .as_deref()
            .ok_or_else(|| ReviewError::validation("no viewer command is configured"))?;
        let image = self.current_image().ok_or(ReviewError::NothingLoaded)?;
        let path = self.layout.original(image, self.cursor.extension);

        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| ReviewError::validation("viewer command is empty"))?;
        Command::new(program)
            .args(parts)
            .arg(&path)
            .spawn()
            .map_err(|err| ReviewError::Viewer(format!("{program}: {err}")))?;
        info!("Opened {} in {}", path.display(), program);
        Ok(())
    }
}
