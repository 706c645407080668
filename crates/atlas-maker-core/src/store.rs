use crate::atlas::{AtlasAsset, AtlasFile, AtlasState, relative_file};
use crate::cache::RawImageCache;
use crate::catalog::AssetCatalog;
use crate::compositing::square_canvas;
use crate::config::AtlasConfig;
use crate::error::{AtlasError, Result};
use crate::extract::Extractor;
use crate::model::{AtlasMeta, AtlasStats, RasterInfo};
use crate::pipeline::pack_buffers;
use crate::progress::{BuildStage, Progress};
use crate::reconcile::ActionCounts;
use crate::source::SourceEntry;
use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, instrument, warn};

/// Outcome of a successful rebuild.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub raster_path: PathBuf,
    /// True when the atlas had no raster before this pass.
    pub created: bool,
    pub stats: AtlasStats,
    pub counts: ActionCounts,
}

/// Resources owned by one rebuild pass. Both are released on every exit path.
struct PassScope<'p> {
    cache: RawImageCache,
    progress: &'p mut dyn Progress,
}

impl<'p> PassScope<'p> {
    fn new(progress: &'p mut dyn Progress) -> Self {
        Self {
            cache: RawImageCache::new(),
            progress,
        }
    }
}

impl Drop for PassScope<'_> {
    fn drop(&mut self) {
        self.cache.clear();
        self.progress.clear();
    }
}

#[instrument(skip_all, fields(atlas = %atlas.asset_path().display(), entries = entries.len()))]
/// Repack every included entry into a new raster and commit it to `atlas`.
///
/// Steps:
/// - extract raw pixels for each included entry (selected source first, else its existing region)
/// - pack and optionally square the raster
/// - encode the raster and the asset file, write both next to their targets, then rename into place
/// - on first creation, decode the written raster back to confirm it imports
/// - swap the in-memory raster reference and region map as one value
///
/// On error neither the files on disk nor `atlas` are modified (except that a brand-new atlas may
/// fail its import check after the files were written).
pub fn rebuild_atlas(
    atlas: &mut AtlasAsset,
    entries: &[SourceEntry],
    cfg: &AtlasConfig,
    catalog: &dyn AssetCatalog,
    progress: &mut dyn Progress,
) -> Result<BuildReport> {
    let result = rebuild_pass(atlas, entries, cfg, catalog, progress);
    if let Err(e) = &result {
        error!(error = %e, "atlas rebuild failed");
    }
    result
}

fn rebuild_pass(
    atlas: &mut AtlasAsset,
    entries: &[SourceEntry],
    cfg: &AtlasConfig,
    catalog: &dyn AssetCatalog,
    progress: &mut dyn Progress,
) -> Result<BuildReport> {
    cfg.validate()?;
    let raster_path = atlas.raster_path();
    check_destination(atlas.asset_path(), &raster_path, cfg.asset_root.as_deref())?;
    let created = atlas.raster().is_none();

    let mut scope = PassScope::new(progress);
    let included: Vec<&SourceEntry> = entries.iter().filter(|e| e.is_included()).collect();
    if included.is_empty() {
        return Err(AtlasError::Empty);
    }

    let total = included.len() as f32;
    let mut buffers = Vec::with_capacity(included.len());
    {
        let mut extractor = Extractor::new(&mut scope.cache, catalog);
        for (i, entry) in included.iter().enumerate() {
            scope
                .progress
                .update(BuildStage::Extract, &entry.name, i as f32 / total);
            buffers.push(extractor.raw_buffer_for(entry)?);
        }
    }
    debug!(count = buffers.len(), "extracted raw buffers");

    scope.progress.update(BuildStage::Pack, "", 0.0);
    let packed = pack_buffers(&buffers, cfg.padding, cfg.max_dimension, cfg.heuristic)?;
    scope.cache.clear();
    drop(buffers);

    let rects = packed.pixel_rects();
    let names: Vec<String> = included.iter().map(|e| e.name.clone()).collect();
    let regions = included
        .iter()
        .zip(rects)
        .map(|(e, r)| Some(e.to_region(r)))
        .collect();
    let raster = if cfg.squared {
        square_canvas(&packed.raster)
    } else {
        packed.raster
    };
    let (width, height) = raster.dimensions();

    scope.progress.update(BuildStage::Export, "", 0.0);
    let meta = AtlasMeta {
        padding: cfg.padding,
        squared: cfg.squared,
        max_dimension: cfg.max_dimension,
        ..AtlasMeta::default()
    };
    let raster_info = RasterInfo {
        file: relative_file(atlas.asset_path(), &raster_path),
        width,
        height,
    };
    let state = AtlasState::new(meta, Some(raster_info), names, regions);
    let png = encode_png(&raster)?;
    let json = encode_asset(&state)?;
    write_pair(&raster_path, &png, atlas.asset_path(), json.as_bytes())?;

    if created {
        scope.progress.update(BuildStage::Import, "", 0.0);
        verify_import(&raster_path, width, height)?;
    }

    atlas.state = state;
    let stats = atlas.stats();
    info!(
        raster = %raster_path.display(),
        width,
        height,
        regions = stats.num_regions,
        "atlas rebuilt"
    );
    Ok(BuildReport {
        raster_path,
        created,
        stats,
        counts: ActionCounts::from_entries(entries),
    })
}

/// Reject an empty destination, or one outside `root` when a root is configured.
fn check_destination(asset_path: &Path, raster_path: &Path, root: Option<&Path>) -> Result<()> {
    if asset_path.as_os_str().is_empty() || asset_path.file_name().is_none() {
        return Err(AtlasError::InvalidDestination(
            "atlas path is empty".into(),
        ));
    }
    let Some(root) = root else {
        return Ok(());
    };
    let root = normalize(&std::path::absolute(root)?);
    for path in [asset_path, raster_path] {
        let abs = normalize(&std::path::absolute(path)?);
        if !abs.starts_with(&root) {
            return Err(AtlasError::InvalidDestination(format!(
                "{} is outside the asset root {}",
                path.display(),
                root.display()
            )));
        }
    }
    Ok(())
}

/// Lexically resolve `.` and `..` without touching the file system.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for c in path.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn encode_png(raster: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    raster
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| AtlasError::EncodeFailure(format!("raster: {e}")))?;
    Ok(bytes)
}

fn encode_asset(state: &AtlasState) -> Result<String> {
    let file = AtlasFile {
        meta: state.meta.clone(),
        raster: state.raster.clone(),
        names: state.names.clone(),
        regions: state.regions.clone(),
    };
    serde_json::to_string_pretty(&file)
        .map_err(|e| AtlasError::EncodeFailure(format!("atlas metadata: {e}")))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

fn tmp_sibling(path: &Path) -> PathBuf {
    sibling_with_suffix(path, ".tmp")
}

/// Stage both files as temporary siblings, then rename them into place.
///
/// The previous raster is moved aside first and restored if the asset file cannot be committed,
/// so either both files are replaced or neither is.
fn write_pair(raster_path: &Path, raster: &[u8], asset_path: &Path, asset: &[u8]) -> Result<()> {
    for path in [raster_path, asset_path] {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
    }
    let raster_tmp = tmp_sibling(raster_path);
    let asset_tmp = tmp_sibling(asset_path);
    let discard_staged = || {
        let _ = fs::remove_file(&raster_tmp);
        let _ = fs::remove_file(&asset_tmp);
    };
    if let Err(e) = fs::write(&raster_tmp, raster).and_then(|_| fs::write(&asset_tmp, asset)) {
        discard_staged();
        return Err(e.into());
    }

    let backup = sibling_with_suffix(raster_path, ".bak");
    let had_raster = raster_path.is_file();
    if had_raster {
        if let Err(e) = fs::rename(raster_path, &backup) {
            discard_staged();
            return Err(e.into());
        }
    }
    let restore_raster = || {
        if had_raster {
            let _ = fs::rename(&backup, raster_path);
        } else {
            let _ = fs::remove_file(raster_path);
        }
    };
    if let Err(e) = fs::rename(&raster_tmp, raster_path) {
        restore_raster();
        discard_staged();
        return Err(e.into());
    }
    if let Err(e) = fs::rename(&asset_tmp, asset_path) {
        restore_raster();
        discard_staged();
        warn!(asset = ?asset_path, error = %e, "asset file not committed, previous raster restored");
        return Err(e.into());
    }
    if had_raster {
        let _ = fs::remove_file(&backup);
    }
    debug!(raster = ?raster_path, asset = ?asset_path, "atlas files written");
    Ok(())
}

/// Decode the header of a freshly written raster and compare its size.
fn verify_import(path: &Path, width: u32, height: u32) -> Result<()> {
    let (w, h) = image::image_dimensions(path).map_err(|source| AtlasError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    if (w, h) != (width, height) {
        return Err(AtlasError::EncodeFailure(format!(
            "{} imported as {}x{}, expected {}x{}",
            path.display(),
            w,
            h,
            width,
            height
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_parent_components() {
        assert_eq!(
            normalize(Path::new("/a/b/../c/./d.png")),
            PathBuf::from("/a/c/d.png")
        );
    }

    #[test]
    fn destination_outside_root_is_rejected() {
        let err = check_destination(
            Path::new("/assets/ui.atlas.json"),
            Path::new("/assets/../other/ui.atlas.png"),
            Some(Path::new("/assets")),
        )
        .expect_err("outside root");
        assert!(matches!(err, AtlasError::InvalidDestination(_)));
        assert!(
            check_destination(
                Path::new("/assets/ui.atlas.json"),
                Path::new("/assets/ui.atlas.png"),
                Some(Path::new("/assets")),
            )
            .is_ok()
        );
    }

    #[test]
    fn empty_destination_is_rejected() {
        let err = check_destination(Path::new(""), Path::new(""), None).expect_err("empty");
        assert!(matches!(err, AtlasError::InvalidDestination(_)));
    }

    #[test]
    fn failed_asset_commit_restores_previous_raster() {
        let dir = std::env::temp_dir().join(format!("atlas-maker-write-pair-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("scratch dir");
        let raster = dir.join("ui.atlas.png");
        fs::write(&raster, b"old raster").expect("old raster");
        // a non-empty directory cannot be replaced by a file
        let asset = dir.join("ui.atlas.json");
        fs::create_dir_all(asset.join("occupied")).expect("blocking dir");

        let err = write_pair(&raster, b"new raster", &asset, b"{}").expect_err("asset rename");
        assert!(matches!(err, AtlasError::Io(_)));
        assert_eq!(fs::read(&raster).expect("raster"), b"old raster");
        assert!(!tmp_sibling(&raster).exists());
        assert!(!tmp_sibling(&asset).exists());
        assert!(!sibling_with_suffix(&raster, ".bak").exists());
    }

    #[test]
    fn tmp_sibling_appends_suffix() {
        assert_eq!(
            tmp_sibling(Path::new("out/ui.png")),
            PathBuf::from("out/ui.png.tmp")
        );
    }
}
