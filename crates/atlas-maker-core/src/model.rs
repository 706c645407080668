use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.x + r.w || r.x >= self.x + self.w || self.y >= r.y + r.h || r.y >= self.y + self.h)
    }
    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
}

/// Nine-slice insets in pixels, measured inwards from each edge of a region.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Border {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl Border {
    pub const ZERO: Border = Border {
        left: 0,
        top: 0,
        right: 0,
        bottom: 0,
    };

    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }
}

/// Normalized pivot point; `(0.5, 0.5)` is the center of the region.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Pivot {
    pub x: f32,
    pub y: f32,
}

impl Pivot {
    pub const CENTER: Pivot = Pivot { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl Default for Pivot {
    fn default() -> Self {
        Self::CENTER
    }
}

/// A named rectangle within an atlas raster, plus its border insets and pivot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    pub name: String,
    pub rect: Rect,
    #[serde(default)]
    pub border: Border,
    #[serde(default)]
    pub pivot: Pivot,
}

impl Region {
    /// Region with no border and a centered pivot.
    pub fn new(name: impl Into<String>, rect: Rect) -> Self {
        Self {
            name: name.into(),
            rect,
            border: Border::ZERO,
            pivot: Pivot::CENTER,
        }
    }

    pub fn with_border(mut self, border: Border) -> Self {
        self.border = border;
        self
    }

    pub fn with_pivot(mut self, pivot: Pivot) -> Self {
        self.pivot = pivot;
        self
    }
}

/// Backing raster of an atlas. `file` is relative to the directory of the atlas asset file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RasterInfo {
    pub file: String,
    pub width: u32,
    pub height: u32,
}

/// Atlas-level metadata written next to the region sequences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasMeta {
    /// Schema version of the atlas file. String to allow non-integer versions; current: "1".
    pub schema_version: String,
    pub app: String,
    pub version: String,
    pub padding: u32,
    pub squared: bool,
    pub max_dimension: u32,
}

impl Default for AtlasMeta {
    fn default() -> Self {
        Self {
            schema_version: "1".into(),
            app: "atlas-maker".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            padding: 0,
            squared: false,
            max_dimension: 0,
        }
    }
}

/// Statistics about atlas packing efficiency.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtlasStats {
    /// Number of regions served by the atlas.
    pub num_regions: usize,
    pub width: u32,
    pub height: u32,
    /// Raster area (width * height).
    pub raster_area: u64,
    /// Sum of region areas.
    pub used_area: u64,
    /// Occupancy ratio: used_area / raster_area (0.0 to 1.0).
    pub occupancy: f64,
}

impl AtlasStats {
    pub fn compute<'a>(width: u32, height: u32, regions: impl IntoIterator<Item = &'a Region>) -> Self {
        let mut num_regions = 0;
        let mut used_area = 0u64;
        for r in regions {
            num_regions += 1;
            used_area += r.rect.area();
        }
        let raster_area = (width as u64) * (height as u64);
        let occupancy = if raster_area > 0 {
            used_area as f64 / raster_area as f64
        } else {
            0.0
        };
        Self {
            num_regions,
            width,
            height,
            raster_area,
            used_area,
            occupancy,
        }
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Regions: {}, Size: {}x{}, Occupancy: {:.2}%, Used Area: {} px², Wasted: {} px²",
            self.num_regions,
            self.width,
            self.height,
            self.occupancy * 100.0,
            self.used_area,
            self.wasted_area(),
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.raster_area.saturating_sub(self.used_area)
    }
}
