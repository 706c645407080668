use crate::catalog::AssetCatalog;
use crate::error::{AtlasError, Result};
use crate::extract::scale_rect;
use crate::model::{AtlasMeta, AtlasStats, RasterInfo, Region};
use crate::source::SourceImage;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// On-disk shape of an atlas asset. `names` and `regions` are parallel sequences.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasFile {
    #[serde(default)]
    pub meta: AtlasMeta,
    #[serde(default)]
    pub raster: Option<RasterInfo>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub regions: Vec<Option<Region>>,
}

/// Raster reference, persisted sequences and the lookup map derived from them.
/// Replaced as one value so the three never disagree.
#[derive(Debug, Clone, Default)]
pub(crate) struct AtlasState {
    pub(crate) meta: AtlasMeta,
    pub(crate) raster: Option<RasterInfo>,
    pub(crate) names: Vec<String>,
    pub(crate) regions: Vec<Option<Region>>,
    lookup: HashMap<String, Region>,
}

impl AtlasState {
    pub(crate) fn new(
        meta: AtlasMeta,
        raster: Option<RasterInfo>,
        names: Vec<String>,
        regions: Vec<Option<Region>>,
    ) -> Self {
        let lookup = build_lookup(&names, &regions);
        Self {
            meta,
            raster,
            names,
            regions,
            lookup,
        }
    }
}

/// Zip the parallel sequences into a map, up to the shorter length.
/// Pairs with an empty name or a missing region are skipped; later duplicates win.
fn build_lookup(names: &[String], regions: &[Option<Region>]) -> HashMap<String, Region> {
    let mut map = HashMap::with_capacity(names.len().max(regions.len()));
    for (name, region) in names.iter().zip(regions) {
        if let Some(region) = region.as_ref().filter(|_| !name.is_empty()) {
            map.insert(name.clone(), region.clone());
        }
    }
    map
}

/// A packed raster plus its name-indexed regions.
///
/// The asset is identified by the path of its JSON file; the raster lives next to it.
#[derive(Debug, Clone)]
pub struct AtlasAsset {
    asset_path: PathBuf,
    pub(crate) state: AtlasState,
}

impl AtlasAsset {
    /// New atlas with no raster yet.
    pub fn new(asset_path: impl Into<PathBuf>) -> Self {
        Self {
            asset_path: asset_path.into(),
            state: AtlasState::default(),
        }
    }

    /// Rebuild an atlas from its persisted parallel sequences.
    pub fn from_sequences(
        asset_path: impl Into<PathBuf>,
        raster: Option<RasterInfo>,
        names: Vec<String>,
        regions: Vec<Option<Region>>,
    ) -> Self {
        Self {
            asset_path: asset_path.into(),
            state: AtlasState::new(AtlasMeta::default(), raster, names, regions),
        }
    }

    pub fn from_file(asset_path: impl Into<PathBuf>, file: AtlasFile) -> Self {
        Self {
            asset_path: asset_path.into(),
            state: AtlasState::new(file.meta, file.raster, file.names, file.regions),
        }
    }

    #[instrument(skip_all)]
    /// Load an atlas asset file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let file: AtlasFile = serde_json::from_str(&text)?;
        let atlas = Self::from_file(path, file);
        debug!(regions = atlas.len(), "atlas loaded");
        Ok(atlas)
    }

    /// Open `path` if it exists, otherwise start a new empty atlas there.
    pub fn open_or_new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::open(path)
        } else {
            Ok(Self::new(path))
        }
    }

    /// Create an atlas whose regions are the sub-images of an existing sprite sheet.
    /// Sprite rectangles are mapped from the sheet's imported size onto its raw pixels.
    pub fn from_sheet(
        asset_path: impl Into<PathBuf>,
        raster_path: &Path,
        catalog: &dyn AssetCatalog,
    ) -> Result<Self> {
        let sprites = catalog
            .sub_images(raster_path)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                AtlasError::InvalidInput(format!(
                    "{} is not a multi-image sheet",
                    raster_path.display()
                ))
            })?;
        let (width, height) = image::image_dimensions(raster_path).map_err(|source| {
            AtlasError::Decode {
                path: raster_path.to_path_buf(),
                source,
            }
        })?;
        let imported = catalog.imported_size(raster_path).unwrap_or((width, height));
        let asset_path = asset_path.into();
        let file = relative_file(&asset_path, raster_path);
        let names = sprites.iter().map(|s| s.name.clone()).collect();
        // regions are stored in raw raster pixels
        let regions = sprites
            .into_iter()
            .map(|s| {
                Some(Region {
                    rect: scale_rect(&s.rect, imported, (width, height)),
                    ..s
                })
            })
            .collect();
        Ok(Self::from_sequences(
            asset_path,
            Some(RasterInfo {
                file,
                width,
                height,
            }),
            names,
            regions,
        ))
    }

    pub fn to_file(&self) -> AtlasFile {
        AtlasFile {
            meta: self.state.meta.clone(),
            raster: self.state.raster.clone(),
            names: self.state.names.clone(),
            regions: self.state.regions.clone(),
        }
    }

    /// Write the asset file in place.
    pub fn save(&self) -> Result<()> {
        let text = serde_json::to_string_pretty(&self.to_file())?;
        fs::write(&self.asset_path, text)?;
        Ok(())
    }

    /// Identity of the atlas: the path of its asset file.
    pub fn asset_path(&self) -> &Path {
        &self.asset_path
    }

    pub fn raster(&self) -> Option<&RasterInfo> {
        self.state.raster.as_ref()
    }

    pub fn meta(&self) -> &AtlasMeta {
        &self.state.meta
    }

    /// Backing raster file: the recorded one, or the asset path with a `png` extension.
    pub fn raster_path(&self) -> PathBuf {
        match &self.state.raster {
            Some(r) => self.asset_dir().join(&r.file),
            None => self.asset_path.with_extension("png"),
        }
    }

    pub(crate) fn asset_dir(&self) -> &Path {
        self.asset_path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Returns false for empty or unknown names.
    pub fn contains(&self, name: &str) -> bool {
        !name.is_empty() && self.state.lookup.contains_key(name)
    }

    pub fn get_region(&self, name: &str) -> Option<&Region> {
        if !self.contains(name) {
            return None;
        }
        self.state.lookup.get(name)
    }

    /// Persisted names, in stored order.
    pub fn names(&self) -> &[String] {
        &self.state.names
    }

    /// Regions in stored order, skipping pairs the lookup map skips.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.state
            .names
            .iter()
            .filter_map(move |n| self.get_region(n))
    }

    pub fn len(&self) -> usize {
        self.state.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lookup.is_empty()
    }

    /// Regions as sub-images of the atlas raster, ready to seed a reconciliation.
    pub fn sources(&self) -> Vec<SourceImage> {
        let raster = self.raster_path();
        self.state
            .names
            .iter()
            .filter_map(|n| {
                self.get_region(n).map(|r| Region {
                    name: n.clone(),
                    ..r.clone()
                })
            })
            .map(|r| SourceImage::sub_image(raster.clone(), r))
            .collect()
    }

    pub fn stats(&self) -> AtlasStats {
        let (w, h) = self
            .state
            .raster
            .as_ref()
            .map(|r| (r.width, r.height))
            .unwrap_or((0, 0));
        AtlasStats::compute(w, h, self.state.lookup.values())
    }
}

/// `raster` relative to the asset's directory when possible, else as given.
pub(crate) fn relative_file(asset_path: &Path, raster: &Path) -> String {
    let dir = asset_path.parent().unwrap_or_else(|| Path::new(""));
    let rel = raster.strip_prefix(dir).unwrap_or(raster);
    rel.to_string_lossy().replace('\\', "/")
}
