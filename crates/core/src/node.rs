//! Tile node state
//!
//! One quadtree node: its immutable page region and subdivision threshold,
//! plus the mutable decode state the tree traversals drive. All mutation
//! happens through `TileTree`; this module only holds the state and the
//! cheap per-node queries.

use crate::backend::NodeId;
use crate::geometry::RectF;
use quadview_cache::TileBitmap;
use std::sync::{Arc, Weak};

/// A quadtree tile node
#[derive(Debug)]
pub struct TileNode {
    /// Absolute bounds within the page, normalized [0,1]x[0,1]. Computed at
    /// construction, immutable thereafter.
    pub(crate) region: RectF,

    /// Zoom factor at or above which this node subdivides. Doubles per
    /// generation.
    pub(crate) zoom_threshold: f32,

    /// Weak handle to the decoded bitmap; the strong side lives in the
    /// bitmap store. A dead weak is "no bitmap".
    pub(crate) bitmap: Option<Weak<TileBitmap>>,

    /// True between decode submission and its settling
    pub(crate) decoding: bool,

    /// Child ids, present only while subdivided
    pub(crate) children: Option<[NodeId; 4]>,

    /// Memoized mapping of `region` through the page bounds
    pub(crate) target_rect: Option<RectF>,
}

impl TileNode {
    pub(crate) fn new(region: RectF, zoom_threshold: f32) -> Self {
        Self {
            region,
            zoom_threshold,
            bitmap: None,
            decoding: false,
            children: None,
            target_rect: None,
        }
    }

    /// Absolute normalized page region
    pub fn region(&self) -> RectF {
        self.region
    }

    /// Subdivision threshold
    pub fn zoom_threshold(&self) -> f32 {
        self.zoom_threshold
    }

    /// Whether a decode is currently in flight
    pub fn is_decoding(&self) -> bool {
        self.decoding
    }

    /// Child ids, if subdivided
    pub fn children(&self) -> Option<&[NodeId; 4]> {
        self.children.as_ref()
    }

    /// Upgrade the weak bitmap handle
    ///
    /// `None` both when no bitmap was ever set and when the store has since
    /// reclaimed it — the two cases are indistinguishable by design.
    pub fn bitmap(&self) -> Option<Arc<TileBitmap>> {
        self.bitmap.as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn has_bitmap(&self) -> bool {
        self.bitmap().is_some()
    }

    pub(crate) fn threshold_hit(&self, zoom: f32) -> bool {
        zoom >= self.zoom_threshold
    }

    /// Memoized draw-space rectangle
    pub(crate) fn target_rect(&mut self, page_bounds: RectF) -> RectF {
        let region = self.region;
        *self
            .target_rect
            .get_or_insert_with(|| region.map_into(&page_bounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_hit_is_inclusive() {
        let node = TileNode::new(RectF::UNIT, 2.0);
        assert!(!node.threshold_hit(1.9));
        assert!(node.threshold_hit(2.0));
        assert!(node.threshold_hit(4.0));
    }

    #[test]
    fn test_target_rect_memoized() {
        let mut node = TileNode::new(RectF::new(0.5, 0.0, 0.5, 0.5), 2.0);
        let bounds = RectF::new(0.0, 0.0, 100.0, 200.0);

        assert_eq!(node.target_rect(bounds), RectF::new(50.0, 0.0, 50.0, 100.0));

        // Memoized: a different bounds argument does not recompute until the
        // cache is invalidated.
        let moved = RectF::new(10.0, 10.0, 100.0, 200.0);
        assert_eq!(node.target_rect(moved), RectF::new(50.0, 0.0, 50.0, 100.0));

        node.target_rect = None;
        assert_eq!(node.target_rect(moved), RectF::new(60.0, 10.0, 50.0, 100.0));
    }

    #[test]
    fn test_dead_weak_is_no_bitmap() {
        let mut node = TileNode::new(RectF::UNIT, 2.0);
        assert!(node.bitmap().is_none());

        let strong = Arc::new(TileBitmap::from_fill(4, 4, [0, 0, 0, 255]));
        node.bitmap = Some(Arc::downgrade(&strong));
        assert!(node.has_bitmap());

        drop(strong);
        assert!(!node.has_bitmap());
    }
}
