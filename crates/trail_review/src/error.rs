use std::path::PathBuf;

use thiserror::Error;

use crate::raster::RasterShape;
use crate::types::TrailId;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("{what} not found: {}", path.display())]
    NotFound { what: &'static str, path: PathBuf },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Trail {0} is not in the current catalog")]
    UnknownTrail(TrailId),

    #[error("Command '{command}' is not available in {mode} review")]
    InvalidCommand { command: String, mode: &'static str },

    #[error("Raster shape mismatch: expected {expected}, found {found}")]
    ShapeMismatch { expected: RasterShape, found: RasterShape },

    #[error("No image/extension is loaded")]
    NothingLoaded,

    #[error("Failed to save {}: {source}", path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: Box<ReviewError>,
    },

    #[error("Failed to launch viewer: {0}")]
    Viewer(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReviewError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: &'static str, path: impl Into<PathBuf>) -> Self {
        Self::NotFound {
            what,
            path: path.into(),
        }
    }

    /// True for a missing catalog/raster/profile file, which callers skip rather than abort on.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Io(err) => err.kind() == std::io::ErrorKind::NotFound,
            Self::Save { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Malformed analyst input: reported, state unchanged, re-prompt.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::UnknownTrail(_) | Self::InvalidCommand { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ReviewError>;
