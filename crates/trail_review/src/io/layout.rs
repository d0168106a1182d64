use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::{
    error::{Result, ReviewError},
    types::{Extension, TrailId},
};

const CATALOG_SUFFIX: &str = "_mrt_catalog.json";

/// File naming convention of the review directory.
///
/// For image root `R` and extension `E`, everything produced by the detector lives under
/// `review_dir` as `R_extE_mrt_*`, with per-trail artifacts in the `R_extE_mrt/` subdirectory.
/// Original chip images live in `image_dir` as `R_extE.<image_format>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewLayout {
    pub review_dir: PathBuf,
    pub image_dir: PathBuf,
    pub image_format: String,
}

impl ReviewLayout {
    pub fn new(review_dir: impl Into<PathBuf>, image_dir: impl Into<PathBuf>, image_format: impl Into<String>) -> Self {
        Self {
            review_dir: review_dir.into(),
            image_dir: image_dir.into(),
            image_format: image_format.into().trim_start_matches('.').to_string(),
        }
    }

    fn stem(image: &str, extension: Extension) -> String {
        format!("{image}_ext{extension}_mrt")
    }

    pub fn catalog(&self, image: &str, extension: Extension) -> PathBuf {
        self.review_dir.join(format!("{}{CATALOG_SUFFIX}", Self::stem(image, extension)))
    }

    pub fn mask(&self, image: &str, extension: Extension) -> PathBuf {
        self.review_dir.join(format!("{}_mask.png", Self::stem(image, extension)))
    }

    pub fn segmentation(&self, image: &str, extension: Extension) -> PathBuf {
        self.review_dir.join(format!("{}_segment.png", Self::stem(image, extension)))
    }

    pub fn trail_dir(&self, image: &str, extension: Extension) -> PathBuf {
        self.review_dir.join(Self::stem(image, extension))
    }

    pub fn profile(&self, image: &str, extension: Extension, id: TrailId) -> PathBuf {
        self.trail_dir(image, extension)
            .join(format!("{}_1dprof_{id}.json", Self::stem(image, extension)))
    }

    pub fn trail_diagnostic(&self, image: &str, extension: Extension, id: TrailId) -> PathBuf {
        self.trail_dir(image, extension)
            .join(format!("{image}_full_ext{extension}_mrt_{id}_diagnostic.png"))
    }

    pub fn image_diagnostic(&self, image: &str) -> PathBuf {
        self.review_dir.join(format!("{image}_full_mrt_diagnostic.png"))
    }

    pub fn original(&self, image: &str, extension: Extension) -> PathBuf {
        self.image_dir
            .join(format!("{image}_ext{extension}.{}", self.image_format))
    }

    /// Image roots with at least one chip image in `image_dir`, sorted.
    pub fn discover_images(&self) -> Result<Vec<String>> {
        if !self.image_dir.is_dir() {
            return Err(ReviewError::not_found("image directory", &self.image_dir));
        }

        let mut roots = BTreeSet::new();
        for entry in fs::read_dir(&self.image_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.image_format.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some((root, _)) = split_extension(stem) {
                roots.insert(root.to_string());
            }
        }
        Ok(roots.into_iter().collect())
    }

    /// Every catalog table in `review_dir`, as (image root, extension), sorted.
    pub fn discover_catalogs(&self) -> Result<Vec<(String, Extension)>> {
        if !self.review_dir.is_dir() {
            return Err(ReviewError::not_found("review directory", &self.review_dir));
        }

        let mut catalogs = BTreeSet::new();
        for entry in fs::read_dir(&self.review_dir)? {
            let path = entry?.path();
            match parse_catalog_name(&path) {
                Some(key) => {
                    catalogs.insert(key);
                }
                None if path.to_string_lossy().ends_with(CATALOG_SUFFIX) => {
                    warn!("Ignoring catalog with unrecognized name: {}", path.display());
                }
                None => {}
            }
        }
        Ok(catalogs
            .into_iter()
            .filter_map(|(root, number)| Extension::from_number(number).map(|e| (root, e)))
            .collect())
    }
}

/// Splits `R_extE` into `R` and the extension.
fn split_extension(stem: &str) -> Option<(&str, Extension)> {
    let (root, number) = stem.rsplit_once("_ext")?;
    let extension = Extension::from_number(number.parse().ok()?)?;
    (!root.is_empty()).then_some((root, extension))
}

/// Parses `R_extE_mrt_catalog.json` into its image root and extension number.
pub fn parse_catalog_name(path: &Path) -> Option<(String, u8)> {
    let name = path.file_name()?.to_str()?;
    let stem = name.strip_suffix(CATALOG_SUFFIX)?;
    let (root, extension) = split_extension(stem)?;
    Some((root.to_string(), extension.number()))
}
