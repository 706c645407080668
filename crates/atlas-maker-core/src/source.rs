use crate::model::{Border, Pivot, Region};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// A candidate image: a whole file, or one named sub-image of a multi-image container.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SourceImage {
    File { path: PathBuf },
    /// `sprite.rect` is expressed in the container's imported space.
    SubImage { path: PathBuf, sprite: Region },
}

impl SourceImage {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File { path: path.into() }
    }

    pub fn sub_image(path: impl Into<PathBuf>, sprite: Region) -> Self {
        Self::SubImage {
            path: path.into(),
            sprite,
        }
    }

    /// File the pixels originate from.
    pub fn path(&self) -> &Path {
        match self {
            Self::File { path } | Self::SubImage { path, .. } => path,
        }
    }

    /// Entry name: the file stem for whole files, the sprite name for sub-images.
    pub fn name(&self) -> String {
        match self {
            Self::File { path } => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            Self::SubImage { sprite, .. } => sprite.name.clone(),
        }
    }
}

/// What a rebuild will do with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    /// Kept from the current atlas, unchanged.
    Include,
    /// New image, not yet in the atlas.
    Add,
    /// In the atlas and re-selected; pixels are replaced.
    Update,
    /// Removed from the atlas.
    Delete,
    /// Never packed (the atlas's own raster).
    Ignore,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Include => "Include",
            Action::Add => "Add",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::Ignore => "Ignore",
        };
        f.write_str(s)
    }
}

/// One row of a build session, keyed by region name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceEntry {
    pub name: String,
    /// Region of the atlas being edited, as a sub-image of its raster.
    pub existing: Option<SourceImage>,
    /// Newly selected pixels for this name.
    pub selected: Option<SourceImage>,
    pub ignore: bool,
    pub delete: bool,
    pub border: Border,
    pub pivot: Pivot,
}

impl SourceEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            existing: None,
            selected: None,
            ignore: false,
            delete: false,
            border: Border::ZERO,
            pivot: Pivot::CENTER,
        }
    }

    /// Priority order: Ignore > Delete > Update > Add > Include > Delete.
    pub fn action(&self) -> Action {
        match (self.ignore, self.delete, self.existing.is_some(), self.selected.is_some()) {
            (true, _, _, _) => Action::Ignore,
            (false, true, _, _) => Action::Delete,
            (false, false, true, true) => Action::Update,
            (false, false, false, true) => Action::Add,
            (false, false, true, false) => Action::Include,
            // pruned before it can reach a build
            (false, false, false, false) => Action::Delete,
        }
    }

    /// Neither an existing region nor a selected source.
    pub fn is_unused(&self) -> bool {
        self.existing.is_none() && self.selected.is_none()
    }

    /// Packed by the next rebuild.
    pub fn is_included(&self) -> bool {
        !self.delete && !self.ignore && !self.is_unused()
    }

    /// The next rebuild would alter the atlas for this entry.
    pub fn is_changed(&self) -> bool {
        !self.ignore && self.action() != Action::Include
    }

    /// Pixels to pack: the new selection wins over the existing region.
    pub fn source_for_packing(&self) -> Option<&SourceImage> {
        self.selected.as_ref().or(self.existing.as_ref())
    }

    /// Final region metadata for a packed rectangle.
    pub fn to_region(&self, rect: crate::model::Rect) -> Region {
        Region {
            name: self.name.clone(),
            rect,
            border: self.border,
            pivot: self.pivot,
        }
    }
}
