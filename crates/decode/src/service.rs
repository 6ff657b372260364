//! Threaded decode coordinator
//!
//! Executes decode requests on a pool of worker threads and delivers settled
//! outcomes through a completion mailbox the control thread drains between
//! tile tree traversals. Node identity serializes the work: submitting a new
//! request for a node that already has one in flight cancels and replaces the
//! old request rather than allowing two concurrent decodes of the same node.

use crate::cancel::CancellationRegistry;
use crate::raster::PageRasterizer;
use quadview_core::{DecodeBackend, DecodeOutcome, DecodeRequest, NodeId};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Configuration for the decode worker pool
#[derive(Debug, Clone)]
pub struct DecodeServiceConfig {
    /// Number of worker threads to spawn.
    /// Default: number of logical CPU cores.
    pub num_workers: usize,

    /// Maximum time an idle worker waits before re-checking the queue and
    /// the shutdown flag. Default: 100ms.
    pub poll_interval: Duration,
}

impl Default for DecodeServiceConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus(),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl DecodeServiceConfig {
    /// Create a configuration with an explicit worker count
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            ..Default::default()
        }
    }

    /// Set the idle poll interval
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

fn num_cpus() -> usize {
    thread::available_parallelism().map(|n| n.get()).unwrap_or(2)
}

/// Decode service statistics
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceStats {
    /// Requests accepted by `begin_decode`
    pub submitted: u64,

    /// Outcomes delivered to the mailbox
    pub completed: u64,

    /// Requests cancelled through `cancel_decode`
    pub cancelled: u64,

    /// Requests currently queued
    pub queue_size: usize,
}

#[derive(Default)]
struct Counters {
    submitted: u64,
    completed: u64,
    cancelled: u64,
}

struct ServiceShared {
    queue: Mutex<VecDeque<DecodeRequest>>,
    registry: CancellationRegistry,
    counters: Mutex<Counters>,
    shutdown: AtomicBool,
}

/// Threaded decode coordinator
///
/// Owns the worker pool and the completion mailbox. The control thread keeps
/// the service, hands [`DecodeHandle`]s to whoever submits work (the tile
/// tree), and drains completions between traversals:
///
/// ```no_run
/// use quadview_decode::{DecodeService, DecodeServiceConfig, PageRasterizer};
/// use std::sync::Arc;
///
/// # fn rasterizer() -> Arc<dyn PageRasterizer> { unimplemented!() }
/// let service = DecodeService::new(rasterizer(), DecodeServiceConfig::default());
/// let backend = Arc::new(service.handle());
/// // ... build a TileTree over `backend`, run traversals ...
/// for outcome in service.drain_completions() {
///     // tree.complete_decode(outcome, &view);
/// }
/// ```
///
/// Dropping the service cancels all outstanding work and joins the workers.
pub struct DecodeService {
    shared: Arc<ServiceShared>,
    completions: Receiver<DecodeOutcome>,
    workers: Vec<JoinHandle<()>>,
}

impl DecodeService {
    /// Spawn the worker pool
    pub fn new(rasterizer: Arc<dyn PageRasterizer>, config: DecodeServiceConfig) -> Self {
        let shared = Arc::new(ServiceShared {
            queue: Mutex::new(VecDeque::new()),
            registry: CancellationRegistry::new(),
            counters: Mutex::new(Counters::default()),
            shutdown: AtomicBool::new(false),
        });

        let (tx, rx) = mpsc::channel();
        let num_workers = config.num_workers.max(1);
        let mut workers = Vec::with_capacity(num_workers);
        for _ in 0..num_workers {
            let shared = shared.clone();
            let rasterizer = rasterizer.clone();
            let tx = tx.clone();
            let poll_interval = config.poll_interval;
            workers.push(thread::spawn(move || {
                worker_loop(shared, rasterizer, tx, poll_interval)
            }));
        }

        Self {
            shared,
            completions: rx,
            workers,
        }
    }

    /// Cloneable submission handle implementing [`DecodeBackend`]
    pub fn handle(&self) -> DecodeHandle {
        DecodeHandle {
            shared: self.shared.clone(),
        }
    }

    /// Take one settled outcome, if any
    pub fn try_recv_completion(&self) -> Option<DecodeOutcome> {
        self.completions.try_recv().ok()
    }

    /// Take every settled outcome currently in the mailbox
    pub fn drain_completions(&self) -> Vec<DecodeOutcome> {
        self.completions.try_iter().collect()
    }

    /// Number of requests queued but not yet picked up by a worker
    pub fn pending_requests(&self) -> usize {
        self.shared.queue.lock().unwrap().len()
    }

    /// Number of requests with a live cancellation token (queued or running)
    pub fn in_flight(&self) -> usize {
        self.shared.registry.len()
    }

    /// Current service statistics
    pub fn stats(&self) -> ServiceStats {
        let counters = self.shared.counters.lock().unwrap();
        ServiceStats {
            submitted: counters.submitted,
            completed: counters.completed,
            cancelled: counters.cancelled,
            queue_size: self.shared.queue.lock().unwrap().len(),
        }
    }
}

impl Drop for DecodeService {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::Release);
        self.shared.registry.cancel_all();
        self.shared.queue.lock().unwrap().clear();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

/// Submission side of the decode service
///
/// Cheap to clone; safe to share across threads. The tile tree holds one as
/// its `DecodeBackend`.
#[derive(Clone)]
pub struct DecodeHandle {
    shared: Arc<ServiceShared>,
}

impl DecodeBackend for DecodeHandle {
    fn begin_decode(&self, request: DecodeRequest) {
        if self.shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        // Cancel-and-replace: a node never has two decodes in flight.
        if let Some(existing) = self.shared.registry.get(request.node) {
            log::debug!("replacing in-flight decode for node {}", request.node.raw());
            existing.cancel();
            let mut queue = self.shared.queue.lock().unwrap();
            queue.retain(|queued| queued.node != request.node);
        }

        self.shared.registry.register(request.node);
        self.shared.queue.lock().unwrap().push_back(request);
        self.shared.counters.lock().unwrap().submitted += 1;
    }

    fn cancel_decode(&self, node: NodeId) {
        let Some(token) = self.shared.registry.get(node) else {
            return;
        };
        token.cancel();

        let removed = {
            let mut queue = self.shared.queue.lock().unwrap();
            let before = queue.len();
            queue.retain(|queued| queued.node != node);
            before - queue.len()
        };
        // Removed before a worker picked it up: no outcome will ever settle
        // it, so drop the token now. A running request keeps its token until
        // the worker settles.
        if removed > 0 {
            self.shared.registry.unregister_if(node, &token);
        }
        self.shared.counters.lock().unwrap().cancelled += 1;
    }
}

fn worker_loop(
    shared: Arc<ServiceShared>,
    rasterizer: Arc<dyn PageRasterizer>,
    completions: Sender<DecodeOutcome>,
    poll_interval: Duration,
) {
    loop {
        if shared.shutdown.load(Ordering::Acquire) {
            return;
        }

        let request = shared.queue.lock().unwrap().pop_front();
        let Some(request) = request else {
            thread::sleep(poll_interval);
            continue;
        };

        let token = shared.registry.get(request.node);
        let settled = match token {
            // Token gone or cancelled before we started: settle empty
            // without touching the rasterizer.
            None => DecodeOutcome {
                node: request.node,
                page_index: request.page_index,
                bitmap: None,
                page_size: None,
            },
            Some(ref token) if token.is_cancelled() => {
                shared.registry.unregister_if(request.node, token);
                DecodeOutcome {
                    node: request.node,
                    page_index: request.page_index,
                    bitmap: None,
                    page_size: None,
                }
            }
            Some(token) => {
                let bitmap =
                    match rasterizer.rasterize(request.page_index, request.zoom, request.region) {
                        Ok(bitmap) => Some(bitmap),
                        Err(err) => {
                            log::warn!("decode failed for node {}: {err}", request.node.raw());
                            None
                        }
                    };
                let page_size = bitmap
                    .as_ref()
                    .map(|_| rasterizer.page_size(request.page_index));
                shared.registry.unregister_if(request.node, &token);
                DecodeOutcome {
                    node: request.node,
                    page_index: request.page_index,
                    bitmap,
                    page_size,
                }
            }
        };

        shared.counters.lock().unwrap().completed += 1;
        // The receiver only disappears when the service is being dropped;
        // a failed send just means nobody is listening anymore.
        let _ = completions.send(settled);
    }
}
