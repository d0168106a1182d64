use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ReviewError;

/// Trail identifier, unique within one catalog.
pub type TrailId = u32;

/// A point in binned raster coordinates, `[x, y]`.
pub type Point = [f64; 2];

/// Value written to every auxiliary field of a manually added trail.
pub const MISSING_MEASUREMENT: i64 = -1;

/// One of the two detector chips of an exposure.
///
/// Chips are identified by their extension number in the exposure container:
/// WFC1 lives in extension 4 and WFC2 in extension 1. WFC1 is always reviewed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Extension {
    Wfc1,
    Wfc2,
}

impl Extension {
    /// Per-image review order.
    pub const REVIEW_ORDER: [Extension; 2] = [Extension::Wfc1, Extension::Wfc2];

    pub fn number(self) -> u8 {
        match self {
            Self::Wfc1 => 4,
            Self::Wfc2 => 1,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            4 => Some(Self::Wfc1),
            1 => Some(Self::Wfc2),
            _ => None,
        }
    }

    /// The other chip of the same exposure.
    pub fn other(self) -> Self {
        match self {
            Self::Wfc1 => Self::Wfc2,
            Self::Wfc2 => Self::Wfc1,
        }
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl TryFrom<u8> for Extension {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_number(value).ok_or_else(|| format!("extension must be 4 or 1, got {value}"))
    }
}

impl From<Extension> for u8 {
    fn from(extension: Extension) -> Self {
        extension.number()
    }
}

impl FromStr for Extension {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| ReviewError::validation("Input extension has to be 4 or 1"))
    }
}

/// Disposition code of a trail.
///
/// Values other than the three named ones are pending/unclassified and are kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrailStatus(pub i32);

impl TrailStatus {
    pub const ACCEPTED: Self = Self(2);
    pub const DEMOTED: Self = Self(1);
    pub const REJECTED: Self = Self(-1);

    pub fn is_accepted(self) -> bool {
        self == Self::ACCEPTED
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ACCEPTED => "accepted",
            Self::DEMOTED => "demoted",
            Self::REJECTED => "rejected",
            _ => "pending",
        }
    }
}

impl fmt::Display for TrailStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.0)
    }
}

/// A detected or manually added linear feature.
///
/// Fields the detector adds beyond the required four are carried in `aux` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailRecord {
    pub id: TrailId,
    pub status: TrailStatus,
    pub endpoints: [Point; 2],
    pub width: f64,
    #[serde(flatten)]
    pub aux: Map<String, Value>,
}

impl TrailRecord {
    pub fn new(id: TrailId, status: TrailStatus, endpoints: [Point; 2], width: f64) -> Self {
        Self {
            id,
            status,
            endpoints,
            width,
            aux: Map::new(),
        }
    }

    pub fn with_aux(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.aux.insert(key.into(), value.into());
        self
    }

    /// Numeric auxiliary field, if present.
    pub fn aux_f64(&self, key: &str) -> Option<f64> {
        self.aux.get(key).and_then(Value::as_f64)
    }

    pub fn geometry(&self) -> TrailGeometry {
        TrailGeometry {
            id: self.id,
            endpoints: self.endpoints,
            width: self.width,
        }
    }
}

/// The subset of a record the mask generator needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailGeometry {
    pub id: TrailId,
    pub endpoints: [Point; 2],
    pub width: f64,
}

impl TrailGeometry {
    pub fn length(&self) -> f64 {
        let [p0, p1] = self.endpoints;
        (p1[0] - p0[0]).hypot(p1[1] - p0[1])
    }
}

/// Ordered trail records of one (image, extension) pair.
///
/// `columns` names the auxiliary fields of the table so that an empty table still knows its
/// schema and manually added rows can fill every column with the sentinel.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub(crate) columns: Vec<String>,
    #[serde(default)]
    pub(crate) trails: Vec<TrailRecord>,
}

impl Catalog {
    pub fn new(columns: Vec<String>, trails: Vec<TrailRecord>) -> Self {
        Self { columns, trails }.normalized()
    }

    /// Adds any auxiliary keys present on rows but missing from `columns`, in order of appearance.
    pub(crate) fn normalized(mut self) -> Self {
        for trail in &self.trails {
            for key in trail.aux.keys() {
                if !self.columns.iter().any(|c| c == key) {
                    self.columns.push(key.clone());
                }
            }
        }
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn trails(&self) -> &[TrailRecord] {
        &self.trails
    }

    pub fn len(&self) -> usize {
        self.trails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trails.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrailRecord> {
        self.trails.get(index)
    }

    pub fn position(&self, id: TrailId) -> Option<usize> {
        self.trails.iter().position(|t| t.id == id)
    }

    pub fn find(&self, id: TrailId) -> Option<&TrailRecord> {
        self.trails.iter().find(|t| t.id == id)
    }

    pub(crate) fn find_mut(&mut self, id: TrailId) -> Option<&mut TrailRecord> {
        self.trails.iter_mut().find(|t| t.id == id)
    }

    /// Records with status 2, in catalog order.
    pub fn accepted(&self) -> impl Iterator<Item = &TrailRecord> {
        self.trails.iter().filter(|t| t.status.is_accepted())
    }

    /// Id for the next inserted record: one past the largest id, or 1 for an empty catalog.
    pub fn next_id(&self) -> TrailId {
        self.trails.iter().map(|t| t.id).max().map_or(1, |max| max + 1)
    }
}

/// Median cross-section of a trail plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrailProfile {
    /// Median intensity per perpendicular offset; `None` where too few samples were finite.
    pub values: Vec<Option<f32>>,
    /// Index of the trail centerline within `values`.
    pub center: f64,
    /// Currently assigned trail width, binned pixels.
    pub width: f64,
    #[serde(default)]
    pub avg_flux: Option<f64>,
    #[serde(default)]
    pub snr: Option<f64>,
    pub extension: Extension,
    pub image: String,
}
