use crate::model::Rect;

pub mod maxrects;

/// A packed item: caller key plus the content rectangle within the bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placed<K> {
    pub key: K,
    pub rect: Rect,
}

/// A packer places rectangles into a single bin.
///
/// Implementations must ensure no overlaps and keep the configured padding between contents.
/// `pack` may return `None` if the rectangle cannot be placed.
pub trait Packer<K> {
    fn pack(&mut self, key: K, rect: &Rect) -> Option<Placed<K>>;
}
