pub mod console;

pub use console::ReviewConsole;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use trail_review::{
    AdjustOptions, ProfileExtractor, ReviewLayout, SessionOptions, sync::DEFAULT_MIN_MASK_WIDTH,
};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDeError(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSerError(#[from] toml::ser::Error),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("Unsupported file format. Please use .toml or .json files")]
    UnsupportedFileFormat,
}

fn default_image_format() -> String {
    "tif".to_string()
}

fn default_inspect_good_only() -> bool {
    true
}

fn default_min_mask_width() -> f64 {
    DEFAULT_MIN_MASK_WIDTH
}

fn default_profile_buffer() -> u32 {
    ProfileExtractor::default().buffer
}

fn default_profile_min_count() -> usize {
    ProfileExtractor::default().min_count
}

/// Where the review products live and how a session behaves.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ReviewConfig {
    /// Directory holding catalogs, masks, segmentations and per-trail subdirectories
    pub review_dir: PathBuf,
    /// Directory holding the per-chip original images, defaults to the parent of `review_dir`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_dir: Option<PathBuf>,
    /// File extension of the original images
    #[serde(default = "default_image_format")]
    pub image_format: String,
    /// Start by reviewing accepted trails only
    #[serde(default = "default_inspect_good_only")]
    pub inspect_good_only: bool,
    /// Mask width floor in unbinned pixels
    #[serde(default = "default_min_mask_width")]
    pub min_mask_width: f64,
    /// Perpendicular half-extent of extracted profiles, in binned pixels
    #[serde(default = "default_profile_buffer")]
    pub profile_buffer: u32,
    /// Finite samples an offset needs before its profile value is kept
    #[serde(default = "default_profile_min_count")]
    pub profile_min_count: usize,
    /// External viewer, e.g. `"ds9 -zscale"`; the image path is appended
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewer_command: Option<String>,
    #[serde(default)]
    pub adjust: AdjustOptions,
}

impl ReviewConfig {
    pub fn new(review_dir: impl Into<PathBuf>) -> Self {
        Self {
            review_dir: review_dir.into(),
            image_dir: None,
            image_format: default_image_format(),
            inspect_good_only: default_inspect_good_only(),
            min_mask_width: default_min_mask_width(),
            profile_buffer: default_profile_buffer(),
            profile_min_count: default_profile_min_count(),
            viewer_command: None,
            adjust: AdjustOptions::default(),
        }
    }

    /// Load configuration from a TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ReviewConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: ReviewConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml_file(path),
            Some("json") => Self::from_json_file(path),
            _ => Err(ConfigError::UnsupportedFileFormat),
        }
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_mask_width.is_finite() && self.min_mask_width >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "min_mask_width must be a non-negative number, got {}",
                self.min_mask_width
            )));
        }
        if self.profile_min_count == 0 {
            return Err(ConfigError::Invalid("profile_min_count must be at least 1".to_string()));
        }
        if let Some(range) = self.adjust.bad_theta_ranges.iter().find(|r| !(r.0 < r.1)) {
            return Err(ConfigError::Invalid(format!(
                "bad theta range ({}, {}) is empty",
                range.0, range.1
            )));
        }
        Ok(())
    }

    pub fn image_dir(&self) -> PathBuf {
        match &self.image_dir {
            Some(dir) => dir.clone(),
            None => match self.review_dir.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                _ => PathBuf::from("."),
            },
        }
    }

    pub fn layout(&self) -> ReviewLayout {
        ReviewLayout::new(&self.review_dir, self.image_dir(), &self.image_format)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            inspect_good_only: self.inspect_good_only,
            min_mask_width: self.min_mask_width,
            profile: ProfileExtractor::new(self.profile_buffer, self.profile_min_count),
            viewer_command: self.viewer_command.clone(),
        }
    }
}
