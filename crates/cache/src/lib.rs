//! Quadview Cache Library
//!
//! Reclaimable bitmap store with byte budget and LRU eviction.
//!
//! The store holds the strong reference to every decoded tile bitmap; tile
//! nodes keep weak handles. Eviction under budget pressure drops the strong
//! side, so a node observing a dead weak handle treats the bitmap as absent
//! and schedules a re-decode.

pub mod bitmap;
pub mod store;

pub use bitmap::{RgbaImage, TileBitmap};
pub use store::{BitmapKey, BitmapStore, StoreStats, DEFAULT_BITMAP_BUDGET};
