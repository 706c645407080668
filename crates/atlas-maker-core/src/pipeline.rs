use crate::config::MaxRectsHeuristic;
use crate::error::{AtlasError, Result};
use crate::model::Rect;
use crate::packer::{Packer, maxrects::MaxRectsPacker};
use image::RgbaImage;
use tracing::{debug, instrument};

/// Placement of one buffer, normalized to the final raster size (`[0, 1]` on both axes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Placement {
    fn from_pixels(r: &Rect, width: u32, height: u32) -> Self {
        let (fw, fh) = (width as f64, height as f64);
        Self {
            x: r.x as f64 / fw,
            y: r.y as f64 / fh,
            w: r.w as f64 / fw,
            h: r.h as f64 / fh,
        }
    }

    /// Convert back to a pixel rectangle for a `width x height` raster.
    /// Rounds half away from zero (`f64::round`).
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> Rect {
        let (fw, fh) = (width as f64, height as f64);
        Rect::new(
            (self.x * fw).round() as u32,
            (self.y * fh).round() as u32,
            (self.w * fw).round() as u32,
            (self.h * fh).round() as u32,
        )
    }
}

/// Output of `pack_buffers`: the composed raster plus one placement per input, in input order.
pub struct PackedRaster {
    pub raster: RgbaImage,
    pub placements: Vec<Placement>,
}

impl PackedRaster {
    /// Placements converted to pixel rectangles of the packed raster.
    pub fn pixel_rects(&self) -> Vec<Rect> {
        let (w, h) = self.raster.dimensions();
        self.placements
            .iter()
            .map(|p| p.to_pixel_rect(w, h))
            .collect()
    }
}

#[instrument(skip_all, fields(count = buffers.len(), padding = padding, max_dimension = max_dimension))]
/// Packs `buffers` into one RGBA raster.
///
/// Notes:
/// - Items are placed largest area first (stable), which keeps results deterministic.
/// - The bin starts at the smallest power-of-two size that can hold the total slot area and grows
///   its shorter side until `max_dimension`; the raster is the tight bound of the placed contents.
/// - Fill is fully transparent; every content is at least `padding` pixels from its neighbours.
pub fn pack_buffers(
    buffers: &[RgbaImage],
    padding: u32,
    max_dimension: u32,
    heuristic: MaxRectsHeuristic,
) -> Result<PackedRaster> {
    if buffers.is_empty() {
        return Err(AtlasError::Empty);
    }
    let sizes: Vec<Rect> = buffers
        .iter()
        .map(|b| Rect::new(0, 0, b.width(), b.height()))
        .collect();
    let rects = pack_sizes(&sizes, padding, max_dimension, heuristic)?;

    let mut page_w = 0u32;
    let mut page_h = 0u32;
    for r in &rects {
        page_w = page_w.max(r.x + r.w);
        page_h = page_h.max(r.y + r.h);
    }

    let mut canvas = RgbaImage::new(page_w, page_h);
    for (buf, r) in buffers.iter().zip(&rects) {
        crate::compositing::blit_rgba(buf, &mut canvas, r.x, r.y);
    }
    let placements = rects
        .iter()
        .map(|r| Placement::from_pixels(r, page_w, page_h))
        .collect();
    debug!(width = page_w, height = page_h, "packed raster");
    Ok(PackedRaster {
        raster: canvas,
        placements,
    })
}

/// Layout-only packing: returns one content rectangle per size, in input order.
pub fn pack_sizes(
    sizes: &[Rect],
    padding: u32,
    max_dimension: u32,
    heuristic: MaxRectsHeuristic,
) -> Result<Vec<Rect>> {
    if sizes.is_empty() {
        return Err(AtlasError::Empty);
    }
    if let Some(i) = sizes.iter().position(|s| s.is_empty()) {
        return Err(AtlasError::InvalidInput(format!(
            "buffer {} has zero width or height",
            i
        )));
    }

    let widest = sizes.iter().map(|s| s.w).max().unwrap_or(1);
    let tallest = sizes.iter().map(|s| s.h).max().unwrap_or(1);
    if widest > max_dimension || tallest > max_dimension {
        return Err(AtlasError::PackingOverflow {
            placed: 0,
            total: sizes.len(),
        });
    }

    // stable area-desc order; ties keep input order
    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by(|&a, &b| sizes[b].area().cmp(&sizes[a].area()).then(a.cmp(&b)));

    let slot_area: u64 = sizes
        .iter()
        .map(|s| (s.w as u64 + padding as u64) * (s.h as u64 + padding as u64))
        .sum();
    let mut bin_w = next_pow2(widest).min(max_dimension);
    let mut bin_h = next_pow2(tallest).min(max_dimension);
    while (bin_w as u64) * (bin_h as u64) < slot_area && (bin_w < max_dimension || bin_h < max_dimension) {
        (bin_w, bin_h) = grow(bin_w, bin_h, max_dimension);
    }

    let mut best_placed = 0usize;
    loop {
        match try_pack(sizes, &order, bin_w, bin_h, padding, heuristic) {
            Ok(rects) => {
                debug!(bin_w, bin_h, "all items placed");
                return Ok(rects);
            }
            Err(placed) => {
                best_placed = best_placed.max(placed);
                debug!(bin_w, bin_h, placed, "bin too small, growing");
            }
        }
        if bin_w >= max_dimension && bin_h >= max_dimension {
            return Err(AtlasError::PackingOverflow {
                placed: best_placed,
                total: sizes.len(),
            });
        }
        (bin_w, bin_h) = grow(bin_w, bin_h, max_dimension);
    }
}

/// Returns the content rectangles on success, or how many items were placed before failing.
fn try_pack(
    sizes: &[Rect],
    order: &[usize],
    bin_w: u32,
    bin_h: u32,
    padding: u32,
    heuristic: MaxRectsHeuristic,
) -> std::result::Result<Vec<Rect>, usize> {
    let mut packer = MaxRectsPacker::new(bin_w, bin_h, padding, heuristic);
    let mut rects = vec![Rect::default(); sizes.len()];
    for (placed, &idx) in order.iter().enumerate() {
        match packer.pack(idx, &sizes[idx]) {
            Some(p) => rects[p.key] = p.rect,
            None => return Err(placed),
        }
    }
    Ok(rects)
}

/// Double the shorter side (width first on ties), clamped to `max`.
fn grow(w: u32, h: u32, max: u32) -> (u32, u32) {
    if (w <= h && w < max) || h >= max {
        (w.saturating_mul(2).min(max), h)
    } else {
        (w, h.saturating_mul(2).min(max))
    }
}

fn next_pow2(mut v: u32) -> u32 {
    if v <= 1 {
        return 1;
    }
    if v > (1 << 31) {
        return u32::MAX;
    }
    v -= 1;
    v |= v >> 1;
    v |= v >> 2;
    v |= v >> 4;
    v |= v >> 8;
    v |= v >> 16;
    v + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grow_prefers_shorter_side() {
        assert_eq!(grow(16, 16, 64), (32, 16));
        assert_eq!(grow(32, 16, 64), (32, 32));
        assert_eq!(grow(64, 16, 64), (64, 32));
        assert_eq!(grow(16, 64, 64), (32, 64));
    }

    #[test]
    fn next_pow2_values() {
        assert_eq!(next_pow2(0), 1);
        assert_eq!(next_pow2(10), 16);
        assert_eq!(next_pow2(16), 16);
        assert_eq!(next_pow2(17), 32);
    }

    #[test]
    fn placement_round_trips_to_pixels() {
        let r = Rect::new(12, 0, 10, 10);
        let p = Placement::from_pixels(&r, 22, 10);
        assert_eq!(p.to_pixel_rect(22, 10), r);
    }
}
