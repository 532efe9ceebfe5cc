//! Tracer trait for observing evaluation and invalidation.
//!
//! The graph takes its tracer as a type parameter. The default [`NoopTracer`]
//! compiles every hook away, [`EventCollector`] records events for assertions,
//! and `TracingTracer` (behind the `tracing` feature) forwards them to the
//! `tracing` crate.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use strgraph::{EvalEvent, EventCollector, Graph, Node, NodeId};
//!
//! let collector = Arc::new(EventCollector::new());
//! let mut graph = Graph::with_tracer(vec![Node::constant("a")], collector.clone()).unwrap();
//! graph.evaluate(NodeId(0)).unwrap();
//! graph.evaluate(NodeId(0)).unwrap();
//! assert_eq!(collector.compute_count(NodeId(0)), 1);
//! assert!(collector.events().contains(&EvalEvent::CacheHit { node: NodeId(0) }));
//! ```

use std::sync::Arc;

use parking_lot::Mutex;

use crate::NodeId;

/// Why a cache slot was emptied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvalidationReason {
    /// The node's own parameters were changed.
    ValueChanged,
    /// The sweep found a direct dependency without a cached value.
    DependencyUncached,
    /// A dependency was invalidated and the change was pushed to its dependents.
    Dependent,
    /// The cache was cleared on request.
    Manual,
}

/// Hooks called by the graph. Every method defaults to doing nothing.
pub trait Tracer: Send + Sync + 'static {
    /// A node returned its memoized value.
    #[inline]
    fn on_cache_hit(&self, _node: NodeId) {}

    /// A node computed and stored a fresh value.
    #[inline]
    fn on_compute(&self, _node: NodeId, _kind: &'static str) {}

    /// A populated cache slot was emptied.
    #[inline]
    fn on_cache_cleared(&self, _node: NodeId, _reason: InvalidationReason) {}

    /// An invalidation sweep finished a full pass over the nodes.
    #[inline]
    fn on_sweep_pass(&self, _pass: usize, _cleared: usize) {}

    /// Evaluation reached a node that is already being evaluated.
    #[inline]
    fn on_cycle_detected(&self, _path: &[NodeId]) {}
}

/// Tracer that ignores every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

impl<T: Tracer + ?Sized> Tracer for Arc<T> {
    fn on_cache_hit(&self, node: NodeId) {
        (**self).on_cache_hit(node)
    }

    fn on_compute(&self, node: NodeId, kind: &'static str) {
        (**self).on_compute(node, kind)
    }

    fn on_cache_cleared(&self, node: NodeId, reason: InvalidationReason) {
        (**self).on_cache_cleared(node, reason)
    }

    fn on_sweep_pass(&self, pass: usize, cleared: usize) {
        (**self).on_sweep_pass(pass, cleared)
    }

    fn on_cycle_detected(&self, path: &[NodeId]) {
        (**self).on_cycle_detected(path)
    }
}

/// A recorded tracer event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalEvent {
    /// See [`Tracer::on_cache_hit`].
    CacheHit {
        /// The node.
        node: NodeId,
    },
    /// See [`Tracer::on_compute`].
    Computed {
        /// The node.
        node: NodeId,
        /// Wire name of the node's variant.
        kind: &'static str,
    },
    /// See [`Tracer::on_cache_cleared`].
    CacheCleared {
        /// The node.
        node: NodeId,
        /// Why it was cleared.
        reason: InvalidationReason,
    },
    /// See [`Tracer::on_sweep_pass`].
    SweepPass {
        /// One-based pass number.
        pass: usize,
        /// Number of slots cleared in this pass.
        cleared: usize,
    },
    /// See [`Tracer::on_cycle_detected`].
    CycleDetected {
        /// The cycle, closed on its first node.
        path: Vec<NodeId>,
    },
}

/// Event collector for testing - accumulates events for assertions.
#[derive(Debug, Default)]
pub struct EventCollector {
    events: Mutex<Vec<EvalEvent>>,
}

impl EventCollector {
    /// Create a new empty event collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the collected events.
    pub fn events(&self) -> Vec<EvalEvent> {
        self.events.lock().clone()
    }

    /// Take collected events, clearing the collector.
    pub fn take(&self) -> Vec<EvalEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    /// Clear all collected events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Get the number of collected events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Check if no events have been collected.
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// How many times `node` computed a fresh value.
    pub fn compute_count(&self, node: NodeId) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, EvalEvent::Computed { node: n, .. } if *n == node))
            .count()
    }

    /// Nodes whose cache was cleared, in order.
    pub fn cleared_nodes(&self) -> Vec<NodeId> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                EvalEvent::CacheCleared { node, .. } => Some(*node),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: EvalEvent) {
        self.events.lock().push(event);
    }
}

impl Tracer for EventCollector {
    fn on_cache_hit(&self, node: NodeId) {
        self.push(EvalEvent::CacheHit { node });
    }

    fn on_compute(&self, node: NodeId, kind: &'static str) {
        self.push(EvalEvent::Computed { node, kind });
    }

    fn on_cache_cleared(&self, node: NodeId, reason: InvalidationReason) {
        self.push(EvalEvent::CacheCleared { node, reason });
    }

    fn on_sweep_pass(&self, pass: usize, cleared: usize) {
        self.push(EvalEvent::SweepPass { pass, cleared });
    }

    fn on_cycle_detected(&self, path: &[NodeId]) {
        self.push(EvalEvent::CycleDetected {
            path: path.to_vec(),
        });
    }
}

/// Tracer that forwards events to the `tracing` crate.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TracingTracer;

#[cfg(feature = "tracing")]
impl Tracer for TracingTracer {
    fn on_cache_hit(&self, node: NodeId) {
        tracing::trace!(node = node.0, "cache hit");
    }

    fn on_compute(&self, node: NodeId, kind: &'static str) {
        tracing::debug!(node = node.0, kind, "computed");
    }

    fn on_cache_cleared(&self, node: NodeId, reason: InvalidationReason) {
        tracing::debug!(node = node.0, ?reason, "cache cleared");
    }

    fn on_sweep_pass(&self, pass: usize, cleared: usize) {
        tracing::trace!(pass, cleared, "invalidation sweep pass");
    }

    fn on_cycle_detected(&self, path: &[NodeId]) {
        tracing::warn!(?path, "dependency cycle detected");
    }
}
