//! Cancellation tokens for in-flight decodes
//!
//! One token per node with a decode outstanding; node identity is the
//! serialization key. Workers check their token before rasterizing and the
//! control side cancels by node id.

use quadview_core::NodeId;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

/// Cooperative cancellation token
///
/// All clones share the underlying state; cancelling any clone cancels them
/// all. Idempotent.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Whether two tokens share the same underlying state
    ///
    /// Distinguishes a worker's captured token from a replacement registered
    /// for the same node afterwards.
    pub fn same_as(&self, other: &CancellationToken) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Token registry keyed by node id
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<NodeId, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Register a fresh token for a node, replacing any previous one
    pub fn register(&self, node: NodeId) -> CancellationToken {
        let token = CancellationToken::new();
        let mut tokens = self.tokens.lock().unwrap();
        tokens.insert(node, token.clone());
        token
    }

    /// Current token for a node
    pub fn get(&self, node: NodeId) -> Option<CancellationToken> {
        let tokens = self.tokens.lock().unwrap();
        tokens.get(&node).cloned()
    }

    /// Cancel a node's token; `false` if none is registered
    pub fn cancel(&self, node: NodeId) -> bool {
        let tokens = self.tokens.lock().unwrap();
        if let Some(token) = tokens.get(&node) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Cancel every registered token, returning how many
    pub fn cancel_all(&self) -> usize {
        let tokens = self.tokens.lock().unwrap();
        for token in tokens.values() {
            token.cancel();
        }
        tokens.len()
    }

    /// Remove a node's token unconditionally
    pub fn unregister(&self, node: NodeId) -> bool {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.remove(&node).is_some()
    }

    /// Remove a node's token only if it is still the given one
    ///
    /// A worker settling a request must not remove a replacement token that
    /// was registered for the same node while it was rasterizing.
    pub fn unregister_if(&self, node: NodeId, token: &CancellationToken) -> bool {
        let mut tokens = self.tokens.lock().unwrap();
        match tokens.get(&node) {
            Some(current) if current.same_as(token) => {
                tokens.remove(&node);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        let tokens = self.tokens.lock().unwrap();
        tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CancellationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
