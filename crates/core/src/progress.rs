//! Decode progress counter and redraw signal
//!
//! The two pieces of cross-cutting shared state the tile tree touches:
//! a busy counter observers use for a "still loading" indicator, and an
//! edge-triggered repaint notification for the draw surface. Both are safe
//! to touch from the completion-delivery path.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Busy counter sink, incremented/decremented in matched pairs around every
/// decode
pub trait ProgressSink: Send + Sync {
    fn increase(&self);
    fn decrease(&self);
}

/// Process-wide decode progress counter
///
/// Never goes negative: a decrease on an idle counter is a no-op rather than
/// an underflow.
#[derive(Debug, Default)]
pub struct DecodeProgress {
    active: AtomicUsize,
}

impl DecodeProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of decodes currently in flight
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// True when nothing is decoding
    pub fn is_idle(&self) -> bool {
        self.active() == 0
    }
}

impl ProgressSink for DecodeProgress {
    fn increase(&self) {
        self.active.fetch_add(1, Ordering::AcqRel);
    }

    fn decrease(&self) {
        let _ = self
            .active
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| v.checked_sub(1));
    }
}

/// Fire-and-forget repaint notification
pub trait RedrawSignal: Send + Sync {
    fn notify(&self);
}

/// Edge-triggered redraw flag
///
/// `notify` raises the flag; the draw surface consumes it with [`take`].
/// Multiple notifications between repaints coalesce into one.
///
/// [`take`]: RedrawFlag::take
#[derive(Debug, Default)]
pub struct RedrawFlag {
    raised: AtomicBool,
}

impl RedrawFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the flag, returning whether a repaint was requested
    pub fn take(&self) -> bool {
        self.raised.swap(false, Ordering::AcqRel)
    }

    /// Check the flag without consuming it
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

impl RedrawSignal for RedrawFlag {
    fn notify(&self) {
        self.raised.store(true, Ordering::Release);
    }
}
