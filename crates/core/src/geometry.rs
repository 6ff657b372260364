//! Page-space geometry
//!
//! Rectangles and the affine mapping the tile tree is built on. A node's
//! region is expressed as a fraction (0..1) of its parent's region;
//! `map_into` turns fractions into absolute coordinates, and the same
//! transform maps a normalized page region into draw coordinates through the
//! page's bounds.

/// Axis-aligned rectangle in `f32` coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The four fractional sub-regions a tile subdivides into
///
/// Top-left, top-right, bottom-left, bottom-right. They partition the unit
/// square exactly: no gap, no overlap.
pub const QUADRANT_FRACTIONS: [RectF; 4] = [
    RectF { x: 0.0, y: 0.0, width: 0.5, height: 0.5 },
    RectF { x: 0.5, y: 0.0, width: 0.5, height: 0.5 },
    RectF { x: 0.0, y: 0.5, width: 0.5, height: 0.5 },
    RectF { x: 0.5, y: 0.5, width: 0.5, height: 0.5 },
];

impl RectF {
    /// The unit square [0,1]x[0,1]
    pub const UNIT: RectF = RectF { x: 0.0, y: 0.0, width: 1.0, height: 1.0 };

    /// Create a rectangle from origin and size
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Right edge (x + width)
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Bottom edge (y + height)
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Check for zero or negative area
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Strict overlap test
    ///
    /// Rectangles that merely share an edge do not intersect.
    pub fn intersects(&self, other: &RectF) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Map this rectangle, interpreted as a fraction of `outer`, into
    /// `outer`'s coordinate space
    ///
    /// Scale by `outer`'s size, then translate by `outer`'s origin. Used both
    /// for child-fraction -> absolute page region and for page region ->
    /// target draw rectangle. Composition-consistent: mapping through two
    /// nested rectangles equals mapping through their composition.
    pub fn map_into(&self, outer: &RectF) -> RectF {
        RectF {
            x: outer.x + self.x * outer.width,
            y: outer.y + self.y * outer.height,
            width: self.width * outer.width,
            height: self.height * outer.height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let rect = RectF::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(rect.right(), 40.0);
        assert_eq!(rect.bottom(), 60.0);
        assert!(!rect.is_empty());
        assert!(RectF::new(0.0, 0.0, 0.0, 10.0).is_empty());
    }

    #[test]
    fn test_intersects_overlap() {
        let a = RectF::new(0.0, 0.0, 10.0, 10.0);
        let b = RectF::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_intersects_disjoint() {
        let a = RectF::new(0.0, 0.0, 10.0, 10.0);
        let b = RectF::new(20.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_intersects_touching_edge_is_false() {
        let a = RectF::new(0.0, 0.0, 10.0, 10.0);
        let b = RectF::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_map_into_unit_is_identity() {
        let rect = RectF::new(0.25, 0.5, 0.5, 0.25);
        assert_eq!(rect.map_into(&RectF::UNIT), rect);
    }

    #[test]
    fn test_map_into_scales_and_translates() {
        let fraction = RectF::new(0.5, 0.0, 0.5, 0.5);
        let parent = RectF::new(100.0, 200.0, 80.0, 40.0);

        let mapped = fraction.map_into(&parent);
        assert_eq!(mapped, RectF::new(140.0, 200.0, 40.0, 20.0));
    }

    #[test]
    fn test_quadrants_partition_unit_square() {
        let [tl, tr, bl, br] = QUADRANT_FRACTIONS;

        // Exact tiling: edges meet with no gap.
        assert_eq!(tl.right(), tr.x);
        assert_eq!(tl.bottom(), bl.y);
        assert_eq!(bl.right(), br.x);
        assert_eq!(tr.bottom(), br.y);
        assert_eq!(tr.right(), 1.0);
        assert_eq!(br.bottom(), 1.0);

        // No overlap: strict intersection is false for every sibling pair.
        for (i, a) in QUADRANT_FRACTIONS.iter().enumerate() {
            for (j, b) in QUADRANT_FRACTIONS.iter().enumerate() {
                if i != j {
                    assert!(!a.intersects(b), "quadrants {i} and {j} overlap");
                }
            }
        }

        // Total area equals the unit square.
        let area: f32 = QUADRANT_FRACTIONS.iter().map(|q| q.width * q.height).sum();
        assert_eq!(area, 1.0);
    }

    #[test]
    fn test_quadrants_tile_parent_exactly() {
        let parent = RectF::new(100.0, 200.0, 80.0, 40.0);
        let [tl, tr, bl, br] = QUADRANT_FRACTIONS.map(|q| q.map_into(&parent));

        assert_eq!(tl, RectF::new(100.0, 200.0, 40.0, 20.0));
        assert_eq!(tr, RectF::new(140.0, 200.0, 40.0, 20.0));
        assert_eq!(bl, RectF::new(100.0, 220.0, 40.0, 20.0));
        assert_eq!(br, RectF::new(140.0, 220.0, 40.0, 20.0));

        assert_eq!(tr.right(), parent.right());
        assert_eq!(br.bottom(), parent.bottom());
    }

    #[test]
    fn test_map_into_composition_consistent() {
        // Mapping a grandchild fraction through parent then grandparent must
        // equal mapping directly through the composed region.
        let grandchild = RectF::new(0.5, 0.5, 0.5, 0.5);
        let child = RectF::new(0.0, 0.5, 0.5, 0.5);
        let root = RectF::new(0.0, 0.0, 128.0, 64.0);

        let via_steps = grandchild.map_into(&child.map_into(&root));
        let composed = RectF::new(0.25, 0.75, 0.25, 0.25).map_into(&root);
        assert_eq!(via_steps, composed);
    }
}
