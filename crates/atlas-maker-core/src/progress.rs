use std::fmt;

/// Stages of a rebuild pass, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Extract,
    Pack,
    Export,
    Import,
}

impl BuildStage {
    pub const COUNT: usize = 4;

    /// 1-based position of the stage within a pass.
    pub fn step(self) -> usize {
        match self {
            BuildStage::Extract => 1,
            BuildStage::Pack => 2,
            BuildStage::Export => 3,
            BuildStage::Import => 4,
        }
    }
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Update atlas (step {}/{})", self.step(), Self::COUNT)
    }
}

/// Receiver for transient progress of a rebuild pass.
///
/// `clear` is always called once the pass ends, whether it succeeded or not.
pub trait Progress {
    fn update(&mut self, stage: BuildStage, detail: &str, fraction: f32);
    fn clear(&mut self);
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn update(&mut self, _stage: BuildStage, _detail: &str, _fraction: f32) {}
    fn clear(&mut self) {}
}
