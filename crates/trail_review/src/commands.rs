use std::str::FromStr;

use strum::{Display, EnumIter, EnumString, IntoStaticStr, IntoEnumIterator};

use crate::{
    error::{Result, ReviewError},
    session::ReviewMode,
    types::{Extension, Point},
};

/// Commands available while reviewing a single trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum TrailCommand {
    #[strum(serialize = "")]
    SaveAndNext,
    #[strum(serialize = "s")]
    Save,
    #[strum(serialize = "w")]
    ChangeWidth,
    #[strum(serialize = "r")]
    Reject,
    #[strum(serialize = "a")]
    Accept,
    #[strum(serialize = "u")]
    Undo,
    #[strum(serialize = "ds9")]
    OpenViewer,
    #[strum(serialize = "i")]
    JumpToImage,
    #[strum(serialize = "t")]
    ToggleFilter,
    #[strum(serialize = "Q")]
    Quit,
}

impl TrailCommand {
    /// What the analyst types; empty for ENTER.
    pub fn key(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::SaveAndNext => "Save and go to next trail",
            Self::Save => "Save changes",
            Self::ChangeWidth => "Change trail width",
            Self::Reject => "Remove trail",
            Self::Accept => "Add trail",
            Self::Undo => "Undo changes",
            Self::OpenViewer => "Load image in viewer",
            Self::JumpToImage => "Jump to another image (this does not save)",
            Self::ToggleFilter => "Toggle only show \"good\" trails",
            Self::Quit => "Quit",
        }
    }
}

/// Commands available once an image's trails have all been reviewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter, IntoStaticStr)]
pub enum ImageCommand {
    #[strum(serialize = "")]
    NextImage,
    #[strum(serialize = "n")]
    AddTrail,
    #[strum(serialize = "r")]
    Reexamine,
    #[strum(serialize = "ds9")]
    OpenViewer,
    #[strum(serialize = "i")]
    JumpToImage,
    #[strum(serialize = "t")]
    ToggleFilter,
    #[strum(serialize = "Q")]
    Quit,
}

impl ImageCommand {
    pub fn key(self) -> &'static str {
        self.into()
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::NextImage => "Go to next image",
            Self::AddTrail => "Add a completely new trail",
            Self::Reexamine => "Re-examine trails",
            Self::OpenViewer => "Load image in viewer",
            Self::JumpToImage => "Jump to another image (this does not save)",
            Self::ToggleFilter => "Toggle only show \"good\" trails",
            Self::Quit => "Quit",
        }
    }
}

/// A command parsed against the current review mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Trail(TrailCommand),
    Image(ImageCommand),
}

impl Command {
    pub fn parse(mode: ReviewMode, input: &str) -> Result<Self> {
        let input = input.trim();
        let parsed = match mode {
            ReviewMode::Trail => TrailCommand::from_str(input).ok().map(Self::Trail),
            ReviewMode::Image => ImageCommand::from_str(input).ok().map(Self::Image),
            ReviewMode::Ended => None,
        };
        parsed.ok_or_else(|| ReviewError::InvalidCommand {
            command: input.to_string(),
            mode: mode.into(),
        })
    }

    /// Menu lines for `mode`, as (key, description).
    pub fn menu(mode: ReviewMode) -> Vec<(&'static str, &'static str)> {
        match mode {
            ReviewMode::Trail => TrailCommand::iter().map(|c| (c.key(), c.description())).collect(),
            ReviewMode::Image => ImageCommand::iter().map(|c| (c.key(), c.description())).collect(),
            ReviewMode::Ended => Vec::new(),
        }
    }
}

/// Parses `"x y"` (whitespace or comma separated) into a point.
pub fn parse_point(input: &str) -> Result<Point> {
    let values = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| ReviewError::validation(format!("'{}' is not a pair of numbers", input.trim())))?;

    match values.as_slice() {
        [x, y] if x.is_finite() && y.is_finite() => Ok([*x, *y]),
        _ => Err(ReviewError::validation(format!(
            "expected two numbers separated by a space, got '{}'",
            input.trim()
        ))),
    }
}

pub fn parse_extension(input: &str) -> Result<Extension> {
    input.parse()
}

/// Parses an image number in `[0, count)`.
pub fn parse_image_index(input: &str, count: usize) -> Result<usize> {
    let index = input
        .trim()
        .parse::<usize>()
        .map_err(|_| ReviewError::validation("You must supply a number"))?;
    if index >= count {
        return Err(ReviewError::validation(format!(
            "image index {index} is out of range, there are {count} images"
        )));
    }
    Ok(index)
}
