//! Quadview Decode Library
//!
//! Asynchronous decode coordinator for the tile tree.
//!
//! Wraps a synchronous [`PageRasterizer`] in a worker thread pool with
//! per-node cancellation and a completion mailbox. The tile tree submits
//! work through a [`DecodeHandle`]; the control thread drains settled
//! [`DecodeOutcome`]s from the service between traversals and feeds them to
//! `TileTree::complete_decode`, so no node state is ever mutated from a
//! worker thread.
//!
//! [`DecodeOutcome`]: quadview_core::DecodeOutcome

mod cancel;
mod raster;
mod service;

pub use cancel::{CancellationRegistry, CancellationToken};
pub use raster::{PageRasterizer, RasterizeError};
pub use service::{DecodeHandle, DecodeService, DecodeServiceConfig, ServiceStats};
