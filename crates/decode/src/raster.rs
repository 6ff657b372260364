//! Pixel producer contract
//!
//! The decode service drives an implementation of [`PageRasterizer`] — the
//! actual PDF/DjVu/image backend that turns a normalized page region at a
//! zoom factor into pixels. Errors stay at this seam: the service converts
//! them into empty outcomes, and the tile tree never sees them.

use quadview_cache::TileBitmap;
use quadview_core::{PageDimensions, RectF};

/// Rasterization failure
#[derive(Debug, thiserror::Error)]
pub enum RasterizeError {
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("backend error: {0}")]
    Backend(String),
}

/// Synchronous page rasterizer the decode workers call
///
/// `region` is the same normalized page-space rectangle the tile node
/// stores; implementations render that slice of the page scaled by `zoom`.
/// Called concurrently from multiple worker threads.
pub trait PageRasterizer: Send + Sync {
    /// Render one tile's region of a page
    fn rasterize(
        &self,
        page_index: u32,
        zoom: f32,
        region: RectF,
    ) -> Result<TileBitmap, RasterizeError>;

    /// Intrinsic page dimensions, reported back with each successful decode
    fn page_size(&self, page_index: u32) -> PageDimensions;
}
