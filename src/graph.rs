use crate::{GraphError, InvalidationReason, Node, NodeId, NoopTracer, Result, Tracer};

/// Graph owns every node in a dense index space and drives evaluation and
/// cache invalidation.
///
/// Construction validates all dependency references and rejects cycles, so a
/// successfully built graph can always be evaluated.
///
/// # Example
///
/// ```
/// use strgraph::{Graph, Node, NodeId, NodeKind};
///
/// let mut graph = Graph::new(vec![
///     Node::constant("foo"),
///     Node::constant("bar"),
///     Node::new(NodeKind::Concatenation { inputs: vec![NodeId(0), NodeId(1)] }),
///     Node::new(NodeKind::Length { input: NodeId(2) }),
/// ])
/// .unwrap();
/// assert_eq!(graph.evaluate(NodeId(3)).unwrap(), "6");
///
/// graph.set_constant(NodeId(0), "foooo").unwrap();
/// graph.check_invalidate_cache();
/// assert_eq!(graph.evaluate(NodeId(3)).unwrap(), "8");
/// ```
#[derive(Debug, Clone)]
pub struct Graph<T = NoopTracer> {
    nodes: Vec<Node>,
    /// `dependents[i]` lists the nodes that read node `i`, without duplicates.
    dependents: Vec<Vec<NodeId>>,
    tracer: T,
}

/// Outcome of [`Graph::check_invalidate_cache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    /// Number of full passes, including the final pass that cleared nothing.
    pub passes: usize,
    /// Total number of cache slots cleared.
    pub cleared: usize,
}

impl Graph<NoopTracer> {
    /// Build a graph from nodes in index order.
    pub fn new(nodes: Vec<Node>) -> Result<Self> {
        Self::with_tracer(nodes, NoopTracer)
    }
}

impl<T: Tracer> Graph<T> {
    /// Build a graph that reports evaluation and invalidation events to `tracer`.
    ///
    /// # Errors
    ///
    /// - `GraphError::InvalidReference` - a dependency index is out of range
    /// - `GraphError::CyclicGraph` - the dependency relation has a cycle
    pub fn with_tracer(mut nodes: Vec<Node>, tracer: T) -> Result<Self> {
        let len = nodes.len();
        let mut dependents = vec![Vec::new(); len];
        for (index, node) in nodes.iter_mut().enumerate() {
            // Caches from a previous graph mean nothing here.
            node.clear_cache();
            for dependency in node.dependencies() {
                let Some(list) = dependents.get_mut(dependency.0) else {
                    return Err(GraphError::InvalidReference {
                        node: Some(index),
                        reference: dependency.0,
                        len,
                    });
                };
                if !list.contains(&NodeId(index)) {
                    list.push(NodeId(index));
                }
            }
        }
        let graph = Self {
            nodes,
            dependents,
            tracer,
        };
        graph.check_acyclic()?;
        Ok(graph)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get a node by index.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.0).ok_or(GraphError::InvalidReference {
            node: None,
            reference: id.0,
            len: self.nodes.len(),
        })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        let len = self.nodes.len();
        self.nodes.get_mut(id.0).ok_or(GraphError::InvalidReference {
            node: None,
            reference: id.0,
            len,
        })
    }

    /// Iterate over all nodes in index order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Nodes that read `id` directly.
    pub fn dependents(&self, id: NodeId) -> Result<&[NodeId]> {
        self.node(id)?;
        Ok(&self.dependents[id.0])
    }

    /// The tracer receiving this graph's events.
    pub fn tracer(&self) -> &T {
        &self.tracer
    }

    /// Evaluate a node, reusing memoized values and filling the cache slots of
    /// every node computed on the way.
    ///
    /// The value is decoded as UTF-8 at this boundary only. A byte sequence
    /// left broken by a substring shows up as U+FFFD here, while every node
    /// keeps the raw bytes. Use [`Graph::evaluate_bytes`] for the exact value.
    ///
    /// # Errors
    ///
    /// - `GraphError::InvalidReference` - `id` is out of range
    /// - `GraphError::CyclicGraph` - evaluation re-entered a node in progress
    pub fn evaluate(&mut self, id: NodeId) -> Result<String> {
        let bytes = self.evaluate_bytes(id)?;
        Ok(match String::from_utf8(bytes) {
            Ok(value) => value,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        })
    }

    /// Evaluate a node and return its raw byte value.
    ///
    /// Dependencies are resolved depth first with an explicit work stack, so
    /// the depth of the graph is bounded by memory and not by the call stack.
    pub fn evaluate_bytes(&mut self, id: NodeId) -> Result<Vec<u8>> {
        if let Some(value) = self.node(id)?.cached_value() {
            let value = value.to_vec();
            self.tracer.on_cache_hit(id);
            return Ok(value);
        }

        let mut active = ahash::HashSet::default();
        active.insert(id);
        let mut frames = vec![Frame::new(id, self.nodes[id.0].dependencies())];

        while let Some(frame) = frames.last_mut() {
            if let Some(&dependency) = frame.dependencies.get(frame.next) {
                frame.next += 1;
                if self.nodes[dependency.0].has_cached_value() {
                    self.tracer.on_cache_hit(dependency);
                    continue;
                }
                if !active.insert(dependency) {
                    let start = frames
                        .iter()
                        .position(|f| f.id == dependency)
                        .unwrap_or(0);
                    let mut path: Vec<NodeId> = frames[start..].iter().map(|f| f.id).collect();
                    path.push(dependency);
                    self.tracer.on_cycle_detected(&path);
                    return Err(GraphError::CyclicGraph {
                        path: path.into_iter().map(NodeId::index).collect(),
                    });
                }
                frames.push(Frame::new(
                    dependency,
                    self.nodes[dependency.0].dependencies(),
                ));
                continue;
            }

            let current = frame.id;
            frames.pop();
            let value = self.compute(current)?;
            let node = &mut self.nodes[current.0];
            node.store(value);
            self.tracer.on_compute(current, node.kind().name());
            active.remove(&current);
        }

        match self.nodes[id.0].cached_value() {
            Some(value) => Ok(value.to_vec()),
            None => Err(GraphError::InternalInvariantViolation {
                node: id.0,
                message: "no value after evaluation".to_owned(),
            }),
        }
    }

    /// Apply a node's operation to the cached values of its dependencies.
    fn compute(&self, id: NodeId) -> Result<Vec<u8>> {
        let node = &self.nodes[id.0];
        let inputs = node
            .dependencies()
            .into_iter()
            .map(|dependency| {
                self.nodes[dependency.0]
                    .cached_value()
                    .ok_or_else(|| GraphError::InternalInvariantViolation {
                        node: id.0,
                        message: format!("dependency {} has no value", dependency),
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        node.kind().apply(id, &inputs)
    }

    /// Replace the value of a constant node and clear its own cache slot.
    ///
    /// Dependents keep their cached values until [`Graph::check_invalidate_cache`]
    /// or [`Graph::invalidate_dependents`] runs.
    pub fn set_constant(&mut self, id: NodeId, value: impl Into<String>) -> Result<()> {
        let node = self.node_mut(id)?;
        let was_cached = node.has_cached_value();
        node.set_value(id, value)?;
        if was_cached {
            self.tracer
                .on_cache_cleared(id, InvalidationReason::ValueChanged);
        }
        Ok(())
    }

    /// Clear a single node's cache slot. Returns true if it was populated.
    pub fn clear_cache(&mut self, id: NodeId) -> Result<bool> {
        let cleared = self.node_mut(id)?.clear_cache();
        if cleared {
            self.tracer.on_cache_cleared(id, InvalidationReason::Manual);
        }
        Ok(cleared)
    }

    /// Clear every cache slot and return how many were populated.
    pub fn clear_all_caches(&mut self) -> usize {
        let mut cleared = 0;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            if node.clear_cache() {
                cleared += 1;
                self.tracer
                    .on_cache_cleared(NodeId(index), InvalidationReason::Manual);
            }
        }
        cleared
    }

    /// Clear every cached node that has a direct dependency without a cached
    /// value, repeating full passes until a pass clears nothing.
    ///
    /// After this returns, every node downstream of an uncached node is
    /// uncached as well, so the remaining cached values were computed from the
    /// current values of their transitive dependencies.
    pub fn check_invalidate_cache(&mut self) -> SweepReport {
        let mut report = SweepReport::default();
        loop {
            let mut cleared = 0;
            for index in 0..self.nodes.len() {
                if !self.nodes[index].has_cached_value() {
                    continue;
                }
                let stale = self.nodes[index]
                    .dependencies()
                    .iter()
                    .any(|dependency| !self.has_cached_value(*dependency));
                if stale {
                    self.nodes[index].clear_cache();
                    cleared += 1;
                    self.tracer.on_cache_cleared(
                        NodeId(index),
                        InvalidationReason::DependencyUncached,
                    );
                }
            }
            report.passes += 1;
            report.cleared += cleared;
            self.tracer.on_sweep_pass(report.passes, cleared);
            if cleared == 0 {
                return report;
            }
        }
    }

    /// Clear `id` and everything transitively downstream of it by walking the
    /// dependents table. Returns the number of cache slots cleared.
    ///
    /// Starting from a graph where no cached node has an uncached dependency,
    /// this reaches the same state as [`Graph::check_invalidate_cache`] after
    /// `id` is cleared, without scanning unrelated nodes.
    pub fn invalidate_dependents(&mut self, id: NodeId) -> Result<usize> {
        let mut cleared = usize::from(self.clear_cache(id)?);
        let mut visited = ahash::HashSet::default();
        visited.insert(id);
        let mut queue = vec![id];
        while let Some(current) = queue.pop() {
            for dependent in self.dependents[current.0].clone() {
                if !visited.insert(dependent) {
                    continue;
                }
                if self.nodes[dependent.0].clear_cache() {
                    cleared += 1;
                    self.tracer
                        .on_cache_cleared(dependent, InvalidationReason::Dependent);
                }
                queue.push(dependent);
            }
        }
        Ok(cleared)
    }

    /// Check that no cached node has a direct dependency without a cached value.
    pub fn verify_cache(&self) -> Result<()> {
        for (id, node) in self.iter() {
            if !node.has_cached_value() {
                continue;
            }
            if let Some(dependency) = node
                .dependencies()
                .into_iter()
                .find(|dependency| !self.has_cached_value(*dependency))
            {
                return Err(GraphError::InternalInvariantViolation {
                    node: id.0,
                    message: format!("cached while dependency {} has no value", dependency),
                });
            }
        }
        Ok(())
    }

    /// Number of nodes holding a cached value.
    pub fn cached_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.has_cached_value()).count()
    }

    fn has_cached_value(&self, id: NodeId) -> bool {
        self.nodes
            .get(id.0)
            .map(Node::has_cached_value)
            .unwrap_or(false)
    }

    fn check_acyclic(&self) -> Result<()> {
        let mut marks = vec![Mark::Unvisited; self.nodes.len()];
        for root in 0..self.nodes.len() {
            if marks[root] != Mark::Unvisited {
                continue;
            }
            marks[root] = Mark::InProgress;
            let mut frames = vec![Frame::new(NodeId(root), self.nodes[root].dependencies())];
            while let Some(frame) = frames.last_mut() {
                if let Some(&dependency) = frame.dependencies.get(frame.next) {
                    frame.next += 1;
                    match marks[dependency.0] {
                        Mark::Done => {}
                        Mark::InProgress => {
                            let start = frames
                                .iter()
                                .position(|f| f.id == dependency)
                                .unwrap_or(0);
                            let mut cycle: Vec<usize> =
                                frames[start..].iter().map(|f| f.id.0).collect();
                            cycle.push(dependency.0);
                            return Err(GraphError::CyclicGraph { path: cycle });
                        }
                        Mark::Unvisited => {
                            marks[dependency.0] = Mark::InProgress;
                            frames.push(Frame::new(
                                dependency,
                                self.nodes[dependency.0].dependencies(),
                            ));
                        }
                    }
                    continue;
                }
                marks[frame.id.0] = Mark::Done;
                frames.pop();
            }
        }
        Ok(())
    }
}

/// One node on the explicit depth-first stack, with the index of the next
/// dependency to visit.
struct Frame {
    id: NodeId,
    dependencies: Vec<NodeId>,
    next: usize,
}

impl Frame {
    fn new(id: NodeId, dependencies: Vec<NodeId>) -> Self {
        Self {
            id,
            dependencies,
            next: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}
