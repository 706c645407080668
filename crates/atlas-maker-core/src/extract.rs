use crate::cache::RawImageCache;
use crate::catalog::AssetCatalog;
use crate::compositing::crop_rgba;
use crate::error::{AtlasError, Result};
use crate::model::Rect;
use crate::source::{SourceEntry, SourceImage};
use image::RgbaImage;
use tracing::debug;

/// Produces the exact pixels to pack for an entry, always from the raw source file so repeated
/// rebuilds never stack import losses.
pub struct Extractor<'a> {
    cache: &'a mut RawImageCache,
    catalog: &'a dyn AssetCatalog,
}

impl<'a> Extractor<'a> {
    pub fn new(cache: &'a mut RawImageCache, catalog: &'a dyn AssetCatalog) -> Self {
        Self { cache, catalog }
    }

    /// Raw buffer for the entry's selected source, falling back to its existing region.
    ///
    /// Existing regions are already in the atlas raster's pixel space and are cropped unscaled.
    pub fn raw_buffer_for(&mut self, entry: &SourceEntry) -> Result<RgbaImage> {
        match (&entry.selected, &entry.existing) {
            (Some(selected), _) => self.raw_buffer(selected),
            (None, Some(existing)) => self.extract(existing, false),
            (None, None) => Err(AtlasError::InvalidInput(format!(
                "entry '{}' has no source",
                entry.name
            ))),
        }
    }

    /// Raw buffer for a source whose sub-image rectangle is in the container's imported space.
    pub fn raw_buffer(&mut self, source: &SourceImage) -> Result<RgbaImage> {
        self.extract(source, true)
    }

    fn extract(&mut self, source: &SourceImage, imported_space: bool) -> Result<RgbaImage> {
        let path = source.path();
        let imported = if imported_space {
            self.catalog.imported_size(path)
        } else {
            None
        };
        let raw = self.cache.load(path)?;
        match source {
            SourceImage::File { .. } => Ok(raw.clone()),
            SourceImage::SubImage { sprite, .. } => {
                let raw_size = raw.dimensions();
                let imported = imported.unwrap_or(raw_size);
                let rect = scale_rect(&sprite.rect, imported, raw_size);
                debug!(name = %sprite.name, ?rect, ?imported, ?raw_size, "cropping sub-image");
                crop_rgba(raw, &rect).ok_or_else(|| {
                    AtlasError::InvalidInput(format!(
                        "sub-image '{}' ({:?}) is outside {} ({}x{})",
                        sprite.name,
                        rect,
                        path.display(),
                        raw_size.0,
                        raw_size.1
                    ))
                })
            }
        }
    }
}

/// Map a rectangle from imported space onto the raw decode:
/// `raw = imported_rect * raw_size / imported_size` per axis, rounded half away from zero,
/// then clamped to the raw bounds.
pub fn scale_rect(rect: &Rect, imported: (u32, u32), raw: (u32, u32)) -> Rect {
    let sx = if imported.0 == 0 { 1.0 } else { raw.0 as f64 / imported.0 as f64 };
    let sy = if imported.1 == 0 { 1.0 } else { raw.1 as f64 / imported.1 as f64 };
    let x = ((rect.x as f64 * sx).round() as u32).min(raw.0);
    let y = ((rect.y as f64 * sy).round() as u32).min(raw.1);
    let w = ((rect.w as f64 * sx).round() as u32).min(raw.0 - x);
    let h = ((rect.h as f64 * sy).round() as u32).min(raw.1 - y);
    Rect::new(x, y, w, h)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_scale_keeps_rect() {
        let r = Rect::new(3, 4, 5, 6);
        assert_eq!(scale_rect(&r, (64, 64), (64, 64)), r);
    }

    #[test]
    fn downsampled_import_scales_up() {
        let r = Rect::new(0, 0, 50, 50);
        assert_eq!(scale_rect(&r, (100, 100), (200, 200)), Rect::new(0, 0, 100, 100));
    }

    #[test]
    fn clamps_to_raw_bounds() {
        let r = Rect::new(90, 90, 20, 20);
        assert_eq!(scale_rect(&r, (100, 100), (100, 100)), Rect::new(90, 90, 10, 10));
    }
}
