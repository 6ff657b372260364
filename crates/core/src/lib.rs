//! Quadview Core Library
//!
//! Progressive quadtree tile cache for a zoomable page image.
//!
//! A page starts as one root tile covering its whole extent. As the zoom
//! factor crosses each node's threshold, visible tiles subdivide into four
//! finer tiles with doubled thresholds; tiles that leave the view or end up
//! fully covered by decoded children release their bitmaps and merge back.
//! Decoding runs off-thread through the [`DecodeBackend`] seam; everything
//! else happens on a single control thread driving [`TileTree`] traversals.
//!
//! # Example
//!
//! ```no_run
//! use quadview_core::{Page, RectF, TileTree, ViewParams};
//! use quadview_core::{DecodeProgress, RedrawFlag};
//! use quadview_cache::BitmapStore;
//! use std::sync::Arc;
//!
//! # fn backend() -> Arc<dyn quadview_core::DecodeBackend> { unimplemented!() }
//! let page = Page::new(0, RectF::new(0.0, 0.0, 800.0, 1000.0));
//! let progress = Arc::new(DecodeProgress::new());
//! let redraw = Arc::new(RedrawFlag::new());
//! let mut tree = TileTree::new(
//!     page,
//!     BitmapStore::default(),
//!     backend(),
//!     progress.clone(),
//!     redraw.clone(),
//! );
//!
//! // On every zoom change, scroll, or resize:
//! let view = ViewParams::new(RectF::new(0.0, 0.0, 800.0, 600.0), 2.0);
//! tree.start_decoding_visible_nodes(&view, false);
//! tree.stop_decoding_invisible_nodes(&view);
//! tree.remove_invisible_bitmaps(&view);
//!
//! // Between traversals, drain the decode coordinator's mailbox and feed
//! // each outcome to tree.complete_decode(outcome, &view).
//! ```

pub mod backend;
pub mod geometry;
pub mod node;
pub mod page;
pub mod progress;
pub mod tree;

pub use backend::{DecodeBackend, DecodeOutcome, DecodeRequest, NodeId, PageDimensions};
pub use geometry::{RectF, QUADRANT_FRACTIONS};
pub use node::TileNode;
pub use page::Page;
pub use progress::{DecodeProgress, ProgressSink, RedrawFlag, RedrawSignal};
pub use tree::{TilePainter, TileTree, ViewParams, ROOT_ZOOM_THRESHOLD};
