use crate::error::{AtlasError, Result};
use image::{ImageReader, RgbaImage};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Lossless decodes of source files, keyed by path.
///
/// Lives for exactly one pass: the files may change between passes, so the owner clears or drops
/// it when the pass ends.
#[derive(Debug, Default)]
pub struct RawImageCache {
    images: HashMap<PathBuf, RgbaImage>,
}

impl RawImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `path` straight from its bytes (RGBA8, full size), or reuse an earlier decode.
    pub fn load(&mut self, path: &Path) -> Result<&RgbaImage> {
        if !self.images.contains_key(path) {
            let rgba = decode_raw(path)?;
            debug!(?path, width = rgba.width(), height = rgba.height(), "decoded raw image");
            self.images.insert(path.to_path_buf(), rgba);
        } else {
            trace!(?path, "raw image cache hit");
        }
        self.images
            .get(path)
            .ok_or_else(|| AtlasError::InvalidInput(format!("{} not cached", path.display())))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.images.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.images.is_empty() {
            debug!(count = self.images.len(), "clearing raw image cache");
        }
        self.images.clear();
    }
}

fn decode_raw(path: &Path) -> Result<RgbaImage> {
    let reader = ImageReader::open(path).map_err(|source| AtlasError::MissingSource {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = reader
        .with_guessed_format()
        .map_err(|source| AtlasError::MissingSource {
            path: path.to_path_buf(),
            source,
        })?;
    let img = reader.decode().map_err(|source| AtlasError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgba8())
}
