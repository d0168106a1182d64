use std::fs;

use image::{ImageBuffer, ImageFormat, Luma};
use tempfile::TempDir;

use crate::{
    algorithms::{FootprintMaskGenerator, ProfileExtractor},
    io::{FsStore, ReviewLayout},
    raster::RasterShape,
    session::{ReviewSession, SessionOptions},
    sync::MaskSynchronizer,
    traits::{CatalogStore, RasterStore},
    types::{Catalog, Extension, TrailProfile, TrailRecord, TrailStatus},
};

/// Raw chips are 64x64 and binned by 4.
pub const RAW_SIZE: u32 = 64;
pub const BINNED_SIZE: u32 = 16;
/// Unbinned floor of 8 gives a 2 pixel floor on the binned rasters.
pub const MIN_MASK_WIDTH: f64 = 8.0;
pub const PERSISTED_DIAGNOSTIC: &[u8] = b"persisted diagnostic";

/// A review directory on disk with per-chip catalogs, rasters, profiles and diagnostics.
pub struct Fixture {
    pub dir: TempDir,
    pub layout: ReviewLayout,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Should create temp dir");
        let layout = ReviewLayout::new(dir.path().join("review"), dir.path().join("images"), "png");
        fs::create_dir_all(&layout.review_dir).expect("Should create review dir");
        fs::create_dir_all(&layout.image_dir).expect("Should create image dir");
        Self { dir, layout }
    }

    pub fn store(&self) -> FsStore {
        FsStore::new(self.layout.clone())
    }

    /// Horizontal trail across the binned chip at row `y`.
    pub fn trail(id: u32, status: TrailStatus, y: f64) -> TrailRecord {
        TrailRecord::new(id, status, [[2.0, y], [13.0, y]], 1.5)
            .with_aux("theta", 45.0)
            .with_aux("snr", 12.5)
    }

    pub fn add_chip(&self, image: &str, extension: Extension, trails: Vec<TrailRecord>) {
        let store = self.store();

        let raw = ImageBuffer::<Luma<u16>, Vec<u16>>::from_fn(RAW_SIZE, RAW_SIZE, |x, y| {
            Luma([1000 + ((x * 7 + y * 13) % 50) as u16])
        });
        raw.save_with_format(self.layout.original(image, extension), ImageFormat::Png)
            .expect("Should write original image");

        let catalog = Catalog::new(vec!["theta".to_string(), "snr".to_string()], trails);
        store.save_catalog(&catalog, image, extension).expect("Should write catalog");

        let generator = FootprintMaskGenerator;
        let sync = MaskSynchronizer::new(&generator, MIN_MASK_WIDTH);
        let shape = RasterShape::new(BINNED_SIZE, BINNED_SIZE);
        let rasters = sync
            .rasters_for(&catalog, shape, sync.floor(RAW_SIZE / BINNED_SIZE))
            .expect("Should rasterize catalog");
        store.save_mask(&rasters.mask, image, extension).expect("Should write mask");
        store
            .save_segmentation(&rasters.segmentation, image, extension)
            .expect("Should write segmentation");

        for record in catalog.trails() {
            let profile = TrailProfile {
                values: vec![Some(1.0); 9],
                center: 4.0,
                width: record.width,
                avg_flux: Some(10.0),
                snr: Some(5.0),
                extension,
                image: image.to_string(),
            };
            store
                .save_profile(&profile, image, extension, record.id)
                .expect("Should write profile");
            fs::write(
                self.layout.trail_diagnostic(image, extension, record.id),
                PERSISTED_DIAGNOSTIC,
            )
            .expect("Should write trail diagnostic");
        }
    }

    /// Both chips of one image plus its whole-image diagnostic.
    pub fn add_image(&self, image: &str, wfc1: Vec<TrailRecord>, wfc2: Vec<TrailRecord>) {
        self.add_chip(image, Extension::Wfc1, wfc1);
        self.add_chip(image, Extension::Wfc2, wfc2);
        fs::write(self.layout.image_diagnostic(image), PERSISTED_DIAGNOSTIC)
            .expect("Should write image diagnostic");
    }

    pub fn options() -> SessionOptions {
        SessionOptions {
            inspect_good_only: true,
            min_mask_width: MIN_MASK_WIDTH,
            profile: ProfileExtractor::new(4, 5),
            viewer_command: None,
        }
    }

    pub fn session(&self, images: &[&str]) -> ReviewSession<FsStore> {
        let images = images.iter().map(|s| s.to_string()).collect();
        let mut session = ReviewSession::with_defaults(self.store(), self.layout.clone(), images, Self::options())
            .expect("Should create session");
        session.start().expect("Should start session");
        session
    }
}
