use std::sync::Arc;

use parking_lot::Mutex;

use crate::{Computation, NodeId, NoopTracer, Result, SweepReport, Tracer};

/// SharedComputation guards a whole [`Computation`] behind one lock.
///
/// Evaluation order depends on cache state and on the order of mutations, so
/// the graph is never locked piecewise. Clones share the same computation.
pub struct SharedComputation<T = NoopTracer> {
    inner: Arc<Mutex<Computation<T>>>,
}

impl<T> Clone for SharedComputation<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Tracer> SharedComputation<T> {
    /// Wrap a computation.
    pub fn new(computation: Computation<T>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(computation)),
        }
    }

    /// Evaluate the output node while holding the lock.
    pub fn evaluate(&self) -> Result<String> {
        self.inner.lock().evaluate()
    }

    /// Change a constant while holding the lock.
    pub fn set_constant(&self, id: NodeId, value: impl Into<String>) -> Result<()> {
        self.inner.lock().set_constant(id, value)
    }

    /// Run the invalidation sweep while holding the lock.
    pub fn check_invalidate_cache(&self) -> SweepReport {
        self.inner.lock().check_invalidate_cache()
    }

    /// Change a constant, sweep, and evaluate as one atomic step.
    pub fn update_and_evaluate(&self, id: NodeId, value: impl Into<String>) -> Result<String> {
        let mut computation = self.inner.lock();
        computation.set_constant(id, value)?;
        computation.check_invalidate_cache();
        computation.evaluate()
    }

    /// Run `f` with exclusive access to the computation.
    pub fn with<R>(&self, f: impl FnOnce(&mut Computation<T>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

#[test]
fn test_send_sync() {
    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}
    assert_send::<SharedComputation>();
    assert_sync::<SharedComputation>();
}
