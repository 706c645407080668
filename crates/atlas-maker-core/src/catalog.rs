//! Asset metadata: imported dimensions and multi-image container layout per source file.
//!
//! The extractor needs both to map a sub-image rectangle from imported space back onto the
//! raw file. `SheetCatalog` reads them from sidecar files; `StaticCatalog` holds them in memory.

use crate::error::{AtlasError, Result};
use crate::model::Region;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub trait AssetCatalog {
    /// Size of the imported representation. `None` means it equals the raw decode.
    fn imported_size(&self, path: &Path) -> Option<(u32, u32)>;
    /// Named sub-images when `path` is a multi-image container, `None` for single images.
    fn sub_images(&self, path: &Path) -> Option<Vec<Region>>;

    fn is_container(&self, path: &Path) -> bool {
        self.sub_images(path).is_some_and(|s| !s.is_empty())
    }
}

/// Layout of one source image as stored in its `.sheet.json` sidecar.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SheetFile {
    #[serde(default)]
    pub imported_size: Option<(u32, u32)>,
    #[serde(default)]
    pub sprites: Vec<Region>,
}

/// Sidecar path for an image: `hero.png` -> `hero.sheet.json`.
pub fn sheet_path(image: &Path) -> PathBuf {
    image.with_extension("sheet.json")
}

/// Catalog backed by `<stem>.sheet.json` files next to each image.
#[derive(Debug, Default, Clone)]
pub struct SheetCatalog;

impl SheetCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Reads the sidecar of `image`, if there is one.
    pub fn read(&self, image: &Path) -> Result<Option<SheetFile>> {
        let path = sheet_path(image);
        if !path.is_file() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Writes `sheet` as the sidecar of `image`.
    pub fn write(&self, image: &Path, sheet: &SheetFile) -> Result<()> {
        let text = serde_json::to_string_pretty(sheet)?;
        fs::write(sheet_path(image), text).map_err(AtlasError::from)
    }

    fn read_or_warn(&self, image: &Path) -> Option<SheetFile> {
        match self.read(image) {
            Ok(sheet) => sheet,
            Err(e) => {
                warn!(?image, error = %e, "ignoring unreadable sheet sidecar");
                None
            }
        }
    }
}

impl AssetCatalog for SheetCatalog {
    fn imported_size(&self, path: &Path) -> Option<(u32, u32)> {
        self.read_or_warn(path).and_then(|s| s.imported_size)
    }

    fn sub_images(&self, path: &Path) -> Option<Vec<Region>> {
        self.read_or_warn(path)
            .map(|s| s.sprites)
            .filter(|s| !s.is_empty())
    }
}

/// In-memory catalog for programmatic use.
#[derive(Debug, Default, Clone)]
pub struct StaticCatalog {
    sheets: HashMap<PathBuf, SheetFile>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, sheet: SheetFile) {
        self.sheets.insert(path.into(), sheet);
    }

    pub fn with_sheet(mut self, path: impl Into<PathBuf>, sheet: SheetFile) -> Self {
        self.insert(path, sheet);
        self
    }
}

impl AssetCatalog for StaticCatalog {
    fn imported_size(&self, path: &Path) -> Option<(u32, u32)> {
        self.sheets.get(path).and_then(|s| s.imported_size)
    }

    fn sub_images(&self, path: &Path) -> Option<Vec<Region>> {
        self.sheets
            .get(path)
            .map(|s| s.sprites.clone())
            .filter(|s| !s.is_empty())
    }
}
