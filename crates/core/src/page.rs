//! Page model
//!
//! Draw-space placement and intrinsic aspect ratio of the page the tile tree
//! covers. The aspect ratio starts as a guess derived from the bounds and is
//! corrected from the backend-reported intrinsic dimensions on the first
//! decode completion; re-layout of the bounds in response is the embedder's
//! concern.

use crate::backend::PageDimensions;
use crate::geometry::RectF;

/// The page a tile tree renders
#[derive(Debug, Clone)]
pub struct Page {
    index: u32,
    bounds: RectF,
    aspect_ratio: f32,
}

impl Page {
    /// Create a page with its draw-space bounds
    pub fn new(index: u32, bounds: RectF) -> Self {
        let aspect_ratio = if bounds.height > 0.0 {
            bounds.width / bounds.height
        } else {
            1.0
        };
        Self { index, bounds, aspect_ratio }
    }

    /// Page index within the source document
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Current draw-space bounds
    pub fn bounds(&self) -> RectF {
        self.bounds
    }

    /// Replace the draw-space bounds (viewport resize, rotation, re-layout)
    pub fn set_bounds(&mut self, bounds: RectF) {
        self.bounds = bounds;
    }

    /// Intrinsic width / height ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Update the aspect ratio from backend-reported intrinsic dimensions
    ///
    /// Returns `true` if the ratio changed. Zero or negative dimensions are
    /// ignored.
    pub fn set_aspect_ratio(&mut self, dims: PageDimensions) -> bool {
        if dims.width <= 0.0 || dims.height <= 0.0 {
            return false;
        }
        let ratio = dims.width / dims.height;
        if (ratio - self.aspect_ratio).abs() < f32::EPSILON {
            return false;
        }
        self.aspect_ratio = ratio;
        true
    }
}
