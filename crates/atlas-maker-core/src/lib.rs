//! Core library for building and incrementally updating texture atlases.
//!
//! - Reconcile: `Reconciler` merges an existing atlas with a new selection into per-name entries
//!   (Include / Add / Update / Delete / Ignore)
//! - Extract: raw pixels always come from the source file, scaled out of multi-image containers
//! - Pack: MaxRects (BAF/BSSF/BLSF/BL/CP) into one raster, optionally squared
//! - Store: `rebuild_atlas` writes the raster and the region metadata, then swaps the lookup map
//!
//! Quick example:
//! ```ignore
//! use atlas_maker_core::prelude::*;
//! # fn main() -> anyhow::Result<()> {
//! let catalog = SheetCatalog::new();
//! let mut atlas = AtlasAsset::open_or_new("ui.atlas.json")?;
//! let mut reconciler = Reconciler::new();
//! let selection = vec![SourceImage::file("icons/ok.png"), SourceImage::file("icons/cancel.png")];
//! reconciler.reconcile(&selection, Some(&atlas), &catalog);
//! let cfg = AtlasConfig::default();
//! let report = rebuild_atlas(&mut atlas, reconciler.entries(), &cfg, &catalog, &mut NoProgress)?;
//! println!("{}", report.stats.summary());
//! assert!(atlas.contains("ok"));
//! # Ok(()) }
//! ```

pub mod atlas;
pub mod cache;
pub mod catalog;
pub mod compositing;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod source;
pub mod store;

pub use atlas::*;
pub use cache::*;
pub use catalog::*;
pub use config::*;
pub use error::*;
pub use extract::*;
pub use model::*;
pub use pipeline::*;
pub use progress::*;
pub use reconcile::*;
pub use source::*;
pub use store::*;

/// Convenience prelude for common types and functions.
/// Importing `atlas_maker_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::atlas::{AtlasAsset, AtlasFile};
    pub use crate::cache::RawImageCache;
    pub use crate::catalog::{AssetCatalog, SheetCatalog, SheetFile, StaticCatalog};
    pub use crate::compositing::square_canvas;
    pub use crate::config::{AtlasConfig, AtlasConfigBuilder, MaxRectsHeuristic};
    pub use crate::error::{AtlasError, Result};
    pub use crate::extract::Extractor;
    pub use crate::model::{AtlasStats, Border, Pivot, RasterInfo, Rect, Region};
    pub use crate::pipeline::{PackedRaster, Placement, pack_buffers, pack_sizes};
    pub use crate::progress::{BuildStage, NoProgress, Progress};
    pub use crate::reconcile::{ActionCounts, Reconciler};
    pub use crate::source::{Action, SourceEntry, SourceImage};
    pub use crate::store::{BuildReport, rebuild_atlas};
}
