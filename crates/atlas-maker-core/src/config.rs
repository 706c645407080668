use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// MaxRects placement heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaxRectsHeuristic {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    BottomLeft,
    ContactPoint,
}

impl FromStr for MaxRectsHeuristic {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "baf" | "bestareafit" => Ok(Self::BestAreaFit),
            "bssf" | "bestshortsidefit" => Ok(Self::BestShortSideFit),
            "blsf" | "bestlongsidefit" => Ok(Self::BestLongSideFit),
            "bl" | "bottomleft" => Ok(Self::BottomLeft),
            "cp" | "contactpoint" => Ok(Self::ContactPoint),
            _ => Err(()),
        }
    }
}

/// Settings for one atlas rebuild pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtlasConfig {
    /// Transparent pixels kept between neighbouring regions.
    pub padding: u32,
    /// Grow the final raster to a `max(width, height)` square.
    pub squared: bool,
    /// Upper bound for the raster on either axis.
    pub max_dimension: u32,
    #[serde(default = "default_heuristic")]
    pub heuristic: MaxRectsHeuristic,
    /// When set, the atlas raster must be written below this directory.
    #[serde(default)]
    pub asset_root: Option<PathBuf>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            padding: 2,
            squared: true,
            max_dimension: 2048,
            heuristic: default_heuristic(),
            asset_root: None,
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if the maximum dimension is zero or the padding alone
    /// would consume the whole raster.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.max_dimension == 0 {
            return Err(AtlasError::InvalidConfig(
                "max_dimension must be greater than zero".into(),
            ));
        }
        if self.padding >= self.max_dimension {
            return Err(AtlasError::InvalidConfig(format!(
                "padding ({}) leaves no usable space within max_dimension ({})",
                self.padding, self.max_dimension
            )));
        }
        Ok(())
    }

    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}

fn default_heuristic() -> MaxRectsHeuristic {
    MaxRectsHeuristic::BestAreaFit
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn squared(mut self, v: bool) -> Self {
        self.cfg.squared = v;
        self
    }
    pub fn max_dimension(mut self, v: u32) -> Self {
        self.cfg.max_dimension = v;
        self
    }
    pub fn heuristic(mut self, v: MaxRectsHeuristic) -> Self {
        self.cfg.heuristic = v;
        self
    }
    pub fn asset_root(mut self, v: impl Into<PathBuf>) -> Self {
        self.cfg.asset_root = Some(v.into());
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}
