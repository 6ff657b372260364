//! Tile tree traversal and lifecycle
//!
//! The quadtree over one page: an owning arena of tile nodes driven by
//! visibility-and-zoom refresh sweeps. Every entry point walks the tree
//! top-down with the current view passed in explicitly; structural mutation
//! (subdivide, prune, bitmap set/release, decode flag toggling) happens only
//! through `&mut self`, so the control core is single-threaded by
//! construction. Decode completions are applied between traversals via
//! [`TileTree::complete_decode`].

use crate::backend::{DecodeBackend, DecodeOutcome, DecodeRequest, NodeId};
use crate::geometry::{RectF, QUADRANT_FRACTIONS};
use crate::node::TileNode;
use crate::page::Page;
use crate::progress::{ProgressSink, RedrawSignal};
use quadview_cache::{BitmapStore, TileBitmap};
use std::collections::HashMap;
use std::sync::Arc;

/// Zoom factor at which the root tile subdivides
///
/// At the 1.0 baseline the whole page decodes as a single tile; the root
/// splits at 2x, its children at 4x, doubling per generation.
pub const ROOT_ZOOM_THRESHOLD: f32 = 2.0;

/// Current view state, passed explicitly into every traversal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewParams {
    /// Visible rectangle in draw space
    pub viewport: RectF,

    /// Current zoom factor
    pub zoom: f32,
}

impl ViewParams {
    pub fn new(viewport: RectF, zoom: f32) -> Self {
        Self { viewport, zoom }
    }
}

/// Draw surface abstraction for [`TileTree::draw`]
///
/// Receives each tile's bitmap together with the draw-space rectangle to
/// stretch it into. Tiles arrive coarse-to-fine: a parent is always painted
/// before its children so the children overdraw it.
pub trait TilePainter {
    fn paint(&mut self, bitmap: &Arc<TileBitmap>, target: RectF);
}

/// Quadtree tile cache for one page
///
/// Owns the node arena, the page, and a handle to the bitmap store; the
/// decode backend, progress sink, and redraw signal are injected at
/// construction. The tree IS the root node plus these entry points — there
/// is no separate storage.
pub struct TileTree {
    nodes: HashMap<NodeId, TileNode>,
    next_id: u64,
    root: NodeId,
    page: Page,
    store: BitmapStore,
    backend: Arc<dyn DecodeBackend>,
    progress: Arc<dyn ProgressSink>,
    redraw: Arc<dyn RedrawSignal>,
}

impl TileTree {
    /// Create a tree with a single undecoded root tile covering the page
    pub fn new(
        page: Page,
        store: BitmapStore,
        backend: Arc<dyn DecodeBackend>,
        progress: Arc<dyn ProgressSink>,
        redraw: Arc<dyn RedrawSignal>,
    ) -> Self {
        let root = NodeId::from_raw(0);
        let mut nodes = HashMap::new();
        nodes.insert(root, TileNode::new(RectF::UNIT, ROOT_ZOOM_THRESHOLD));
        Self {
            nodes,
            next_id: 1,
            root,
            page,
            store,
            backend,
            progress,
            redraw,
        }
    }

    /// Root node id
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Look up a node for inspection
    pub fn node(&self, id: NodeId) -> Option<&TileNode> {
        self.nodes.get(&id)
    }

    /// Number of live nodes in the arena
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The page this tree covers
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Handle to the bitmap store
    pub fn store(&self) -> &BitmapStore {
        &self.store
    }

    /// Replace the page's draw-space bounds and drop every memoized target
    /// rectangle
    ///
    /// Call on viewport resize, rotation, or re-layout, before the next
    /// visibility sweep.
    pub fn set_page_bounds(&mut self, bounds: RectF) {
        self.page.set_bounds(bounds);
        self.invalidate_node_bounds();
    }

    /// Drop every memoized target rectangle
    pub fn invalidate_node_bounds(&mut self) {
        for node in self.nodes.values_mut() {
            node.target_rect = None;
        }
    }

    /// Issue decode requests for every visible undecoded tile
    ///
    /// Subdivides and prunes along the way. With `invalidate` set, tiles
    /// re-decode even when they already hold a bitmap (zoom changed under
    /// them); otherwise a cached bitmap is merely re-affirmed in the store.
    pub fn start_decoding_visible_nodes(&mut self, view: &ViewParams, invalidate: bool) {
        self.start_decoding_node(self.root, view, invalidate);
    }

    /// Cancel every in-flight decode in the tree
    ///
    /// Used for full teardown and when the page leaves the view entirely.
    pub fn stop_decoding(&mut self, view: &ViewParams) {
        self.stop_decoding_subtree(self.root, view);
    }

    /// Cancel in-flight decodes for tiles that are no longer needed
    ///
    /// A tile keeps its decode only while visible and not hidden behind
    /// fully-decoded children.
    pub fn stop_decoding_invisible_nodes(&mut self, view: &ViewParams) {
        self.stop_decoding_invisible_node(self.root, view);
    }

    /// Release bitmaps for tiles that are invisible or hidden by children
    ///
    /// A subdivided tile whose four children all hold bitmaps releases its
    /// own coarser bitmap even while visible.
    pub fn remove_invisible_bitmaps(&mut self, view: &ViewParams) {
        self.remove_invisible_bitmaps_node(self.root, view);
    }

    /// Paint the tree coarse-to-fine
    ///
    /// Each tile with a live bitmap is painted into its target rectangle;
    /// children paint over their parent, which stays as the level-of-detail
    /// fallback while they decode.
    pub fn draw(&mut self, painter: &mut dyn TilePainter) {
        self.draw_node(self.root, painter);
    }

    /// Apply a settled decode
    ///
    /// Completions for nodes that were pruned while the decode was in flight
    /// are discarded silently. An empty outcome (failure or cancellation)
    /// leaves any previously held bitmap in place; the node simply stops
    /// decoding and becomes eligible for a retry on the next sweep.
    pub fn complete_decode(&mut self, outcome: DecodeOutcome, view: &ViewParams) {
        let DecodeOutcome { node, bitmap, page_size, .. } = outcome;

        if !self.nodes.contains_key(&node) {
            log::trace!("discarding decode completion for pruned node {}", node.raw());
            return;
        }

        if let Some(bitmap) = bitmap {
            self.set_bitmap(node, Arc::new(bitmap));
        }
        self.set_decoding(node, false);
        if let Some(dims) = page_size {
            self.page.set_aspect_ratio(dims);
        }
        self.refresh_structure(node, view);
    }

    // ---- structure ----

    /// Single policy step run before every other traversal on a node:
    /// subdivide when the zoom threshold is met and the node is visible,
    /// prune children back when the threshold is no longer met over a live
    /// bitmap or the node left the view.
    fn refresh_structure(&mut self, id: NodeId, view: &ViewParams) {
        let visible = self.is_visible(id, view);
        let Some(node) = self.nodes.get(&id) else { return };
        let threshold_hit = node.threshold_hit(view.zoom);
        let has_children = node.children.is_some();
        let has_bitmap = node.has_bitmap();

        if threshold_hit && !has_children && visible {
            self.spawn_children(id);
        }
        if (!threshold_hit && has_bitmap) || !visible {
            self.recycle_children(id);
        }
    }

    fn spawn_children(&mut self, id: NodeId) {
        let Some((region, threshold)) = self.nodes.get(&id).map(|n| (n.region, n.zoom_threshold))
        else {
            return;
        };
        let child_threshold = threshold * 2.0;

        let children = QUADRANT_FRACTIONS.map(|fraction| {
            let child_id = NodeId::from_raw(self.next_id);
            self.next_id += 1;
            self.nodes
                .insert(child_id, TileNode::new(fraction.map_into(&region), child_threshold));
            child_id
        });

        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = Some(children);
        }
        log::trace!(
            "subdivided node {} into four tiles (child threshold {})",
            id.raw(),
            child_threshold
        );
    }

    /// Recycle all descendants and drop the children array, unless a
    /// descendant still holds live pixels — then the branch is kept but is a
    /// no-op with respect to decoding.
    fn recycle_children(&mut self, id: NodeId) {
        let Some(children) = self.children_of(id) else { return };

        for child in children {
            self.recycle(child);
        }

        if !self.children_contain_bitmaps(id) {
            for child in children {
                self.remove_subtree(child);
            }
            if let Some(node) = self.nodes.get_mut(&id) {
                node.children = None;
            }
            log::trace!("pruned children of node {}", id.raw());
        }
    }

    /// Cancel this subtree's decodes and release its bitmaps
    fn recycle(&mut self, id: NodeId) {
        self.stop_decoding_node(id);
        self.release_bitmap(id);
        if let Some(children) = self.children_of(id) {
            for child in children {
                self.recycle(child);
            }
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(children) = node.children {
                for child in children {
                    self.remove_subtree(child);
                }
            }
        }
    }

    fn children_of(&self, id: NodeId) -> Option<[NodeId; 4]> {
        self.nodes.get(&id).and_then(|n| n.children)
    }

    fn contains_bitmaps(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.has_bitmap()) || self.children_contain_bitmaps(id)
    }

    fn children_contain_bitmaps(&self, id: NodeId) -> bool {
        match self.children_of(id) {
            Some(children) => children.iter().any(|child| self.contains_bitmaps(*child)),
            None => false,
        }
    }

    // ---- visibility ----

    fn is_visible(&mut self, id: NodeId, view: &ViewParams) -> bool {
        let page_bounds = self.page.bounds();
        let Some(node) = self.nodes.get_mut(&id) else { return false };
        view.viewport.intersects(&node.target_rect(page_bounds))
    }

    /// A subdivided tile whose four children all hold bitmaps is fully
    /// covered at higher resolution
    fn is_hidden_by_children(&self, id: NodeId) -> bool {
        match self.children_of(id) {
            Some(children) => children.iter().all(|child| self.node_bitmap(*child).is_some()),
            None => false,
        }
    }

    fn is_visible_and_not_hidden_by_children(&mut self, id: NodeId, view: &ViewParams) -> bool {
        self.is_visible(id, view) && !self.is_hidden_by_children(id)
    }

    // ---- decoding ----

    fn start_decoding_node(&mut self, id: NodeId, view: &ViewParams, invalidate: bool) {
        if !self.is_visible(id, view) {
            return;
        }
        self.refresh_structure(id, view);

        let threshold_hit = self
            .nodes
            .get(&id)
            .is_some_and(|n| n.threshold_hit(view.zoom));
        if threshold_hit {
            if let Some(children) = self.children_of(id) {
                for child in children {
                    self.start_decoding_node(child, view, invalidate);
                }
            }
            return;
        }

        if !invalidate {
            if let Some(bitmap) = self.node_bitmap(id) {
                self.restore_bitmap_reference(id, &bitmap);
                return;
            }
        }
        self.decode_node(id, view);
    }

    fn decode_node(&mut self, id: NodeId, view: &ViewParams) {
        let request = match self.nodes.get(&id) {
            Some(node) if !node.decoding => DecodeRequest {
                node: id,
                page_index: self.page.index(),
                zoom: view.zoom,
                region: node.region,
            },
            _ => return,
        };

        self.set_decoding(id, true);
        log::debug!(
            "decoding node {} region {:?} at zoom {}",
            id.raw(),
            request.region,
            request.zoom
        );
        self.backend.begin_decode(request);
    }

    fn stop_decoding_subtree(&mut self, id: NodeId, view: &ViewParams) {
        self.refresh_structure(id, view);
        if let Some(children) = self.children_of(id) {
            for child in children {
                self.stop_decoding_subtree(child, view);
            }
        }
        self.stop_decoding_node(id);
    }

    fn stop_decoding_invisible_node(&mut self, id: NodeId, view: &ViewParams) {
        self.refresh_structure(id, view);
        if let Some(children) = self.children_of(id) {
            for child in children {
                self.stop_decoding_invisible_node(child, view);
            }
        }
        if self.is_visible_and_not_hidden_by_children(id, view) {
            return;
        }
        self.stop_decoding_node(id);
    }

    fn remove_invisible_bitmaps_node(&mut self, id: NodeId, view: &ViewParams) {
        self.refresh_structure(id, view);
        if let Some(children) = self.children_of(id) {
            for child in children {
                self.remove_invisible_bitmaps_node(child, view);
            }
        }
        if self.is_visible_and_not_hidden_by_children(id, view) {
            return;
        }
        self.release_bitmap(id);
    }

    fn stop_decoding_node(&mut self, id: NodeId) {
        let decoding = self.nodes.get(&id).is_some_and(|n| n.decoding);
        if !decoding {
            return;
        }
        log::debug!("cancelling decode for node {}", id.raw());
        self.backend.cancel_decode(id);
        self.set_decoding(id, false);
    }

    /// Toggle the decode flag, keeping the progress counter in matched pairs
    fn set_decoding(&mut self, id: NodeId, value: bool) {
        let changed = match self.nodes.get_mut(&id) {
            Some(node) if node.decoding != value => {
                node.decoding = value;
                true
            }
            _ => false,
        };
        if changed {
            if value {
                self.progress.increase();
            } else {
                self.progress.decrease();
            }
        }
    }

    // ---- bitmaps ----

    fn node_bitmap(&self, id: NodeId) -> Option<Arc<TileBitmap>> {
        self.nodes.get(&id).and_then(|n| n.bitmap())
    }

    /// Store a freshly decoded bitmap
    ///
    /// Degenerate results never replace a valid bitmap; re-setting the held
    /// instance is a no-op (no release, no redraw). Otherwise the previous
    /// store entry is freed, the new one inserted, and the surface notified.
    fn set_bitmap(&mut self, id: NodeId, bitmap: Arc<TileBitmap>) {
        if bitmap.is_degenerate() {
            return;
        }
        if let Some(current) = self.node_bitmap(id) {
            if Arc::ptr_eq(&current, &bitmap) {
                return;
            }
        }
        self.store.insert(id.raw(), bitmap.clone());
        if let Some(node) = self.nodes.get_mut(&id) {
            node.bitmap = Some(Arc::downgrade(&bitmap));
        }
        self.redraw.notify();
    }

    fn release_bitmap(&mut self, id: NodeId) {
        self.store.remove(id.raw());
        if let Some(node) = self.nodes.get_mut(&id) {
            node.bitmap = None;
        }
    }

    /// Re-affirm a cached bitmap without decoding
    ///
    /// Marks the store entry most-recently-used; if the store evicted it but
    /// the instance is still live, re-insert it rather than decode again.
    fn restore_bitmap_reference(&mut self, id: NodeId, bitmap: &Arc<TileBitmap>) {
        if !self.store.touch(id.raw()) {
            self.store.insert(id.raw(), bitmap.clone());
        }
    }

    // ---- drawing ----

    fn draw_node(&mut self, id: NodeId, painter: &mut dyn TilePainter) {
        if let Some(bitmap) = self.node_bitmap(id) {
            let page_bounds = self.page.bounds();
            if let Some(node) = self.nodes.get_mut(&id) {
                let target = node.target_rect(page_bounds);
                painter.paint(&bitmap, target);
            }
        }
        if let Some(children) = self.children_of(id) {
            for child in children {
                self.draw_node(child, painter);
            }
        }
    }
}
