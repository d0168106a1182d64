//! # Satellite Trail Review Library
//!
//! Interactive review of satellite trails detected in two-chip astronomy images. An analyst
//! walks through each image's trail catalogs, accepts, rejects, resizes or adds trails, and the
//! library keeps the trail mask and segmentation rasters consistent with the catalog.
//!
//! ## Core Features
//!
//! - **Review Session**: Trail-by-trail navigation with a status filter, save and undo
//! - **Mask Synchronization**: Mask and segmentation regenerated from the accepted trails
//! - **Trait-based Storage**: Swap catalog, raster, mask and rendering backends via traits
//! - **Batch Passes**: Bad-angle catalog adjustment and diagnostic re-rendering
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trail_review::{FsStore, ReviewLayout, ReviewSession, SessionOptions};
//!
//! let layout = ReviewLayout::new("review", "images", "tif");
//! let images = layout.discover_images()?;
//! let store = FsStore::new(layout.clone());
//!
//! let mut session = ReviewSession::with_defaults(store, layout, images, SessionOptions::default())?;
//! session.start()?;
//! while let Some(trail) = session.current_trail() {
//!     println!("reviewing trail {}", trail.id);
//!     session.advance()?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core modules
pub mod error;
pub mod types;
pub mod raster;
pub mod traits;
pub mod algorithms;
pub mod io;
pub mod render;

// Review workflow
pub mod editor;
pub mod sync;
pub mod chip;
pub mod session;
pub mod commands;

// Batch passes
pub mod adjust;
pub mod refresh;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use error::{ReviewError, Result};
pub use types::*;
pub use raster::{ChipRasters, RasterShape, TrailRasters};
pub use traits::*;
pub use algorithms::*;
pub use io::*;
pub use render::PngRenderer;
pub use editor::{CatalogEditor, NewTrail};
pub use sync::MaskSynchronizer;
pub use session::{ReviewMode, ReviewSession, SessionOptions, StatusFilter, UndoOutcome};
pub use commands::{Command, ImageCommand, TrailCommand};
pub use adjust::{AdjustOptions, AdjustReport, AngleRange, CatalogAdjuster};
pub use refresh::{DiagnosticRefresh, RefreshReport};
