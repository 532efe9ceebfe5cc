use crate::{
    ComputationSpec, Graph, GraphError, GraphSpec, NodeId, NoopTracer, Result, SweepReport,
    Tracer,
};

/// Computation binds a graph to the node whose value is the overall result.
///
/// `evaluate` never runs the invalidation sweep by itself. After changing a
/// constant, call [`Computation::check_invalidate_cache`] before evaluating
/// again if fresh values are required.
#[derive(Debug, Clone)]
pub struct Computation<T = NoopTracer> {
    graph: Graph<T>,
    output: NodeId,
}

impl Computation<NoopTracer> {
    /// Build a computation from wire records.
    pub fn from_spec(spec: &ComputationSpec) -> Result<Self> {
        Self::from_spec_with_tracer(spec, NoopTracer)
    }

    /// Parse and build a computation from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_spec(&ComputationSpec::from_json(json)?)
    }
}

impl<T: Tracer> Computation<T> {
    /// Bind `graph` to `output`.
    ///
    /// # Errors
    ///
    /// - `GraphError::InvalidReference` - `output` is not a node of `graph`
    pub fn new(graph: Graph<T>, output: NodeId) -> Result<Self> {
        if output.0 >= graph.len() {
            return Err(GraphError::InvalidReference {
                node: None,
                reference: output.0,
                len: graph.len(),
            });
        }
        Ok(Self { graph, output })
    }

    /// Build a computation from wire records, reporting events to `tracer`.
    pub fn from_spec_with_tracer(spec: &ComputationSpec, tracer: T) -> Result<Self> {
        let graph = Graph::with_tracer(spec.graph.to_nodes()?, tracer)?;
        Self::new(graph, NodeId(spec.output_node_index))
    }

    /// Evaluate the output node.
    pub fn evaluate(&mut self) -> Result<String> {
        self.graph.evaluate(self.output)
    }

    /// Evaluate the output node and return its raw bytes.
    pub fn evaluate_bytes(&mut self) -> Result<Vec<u8>> {
        self.graph.evaluate_bytes(self.output)
    }

    /// The output node.
    pub fn output_index(&self) -> NodeId {
        self.output
    }

    /// The underlying graph.
    pub fn graph(&self) -> &Graph<T> {
        &self.graph
    }

    /// Mutable access to the underlying graph.
    pub fn graph_mut(&mut self) -> &mut Graph<T> {
        &mut self.graph
    }

    /// See [`Graph::set_constant`].
    pub fn set_constant(&mut self, id: NodeId, value: impl Into<String>) -> Result<()> {
        self.graph.set_constant(id, value)
    }

    /// See [`Graph::check_invalidate_cache`].
    pub fn check_invalidate_cache(&mut self) -> SweepReport {
        self.graph.check_invalidate_cache()
    }

    /// Wire records describing this computation. Cached values are not included.
    pub fn to_spec(&self) -> ComputationSpec {
        ComputationSpec {
            graph: GraphSpec::from_nodes(self.graph.iter().map(|(_, node)| node)),
            output_node_index: self.output.0,
        }
    }

    /// Consume the computation and return its graph.
    pub fn into_graph(self) -> Graph<T> {
        self.graph
    }
}

/// Parse a JSON computation and return the value of its output node.
///
/// # Example
///
/// ```
/// let json = r#"{
///     "graph": {"nodes": [
///         {"index": 0, "node_type": "constant", "value": "foo"},
///         {"index": 1, "node_type": "constant", "value": "bar"},
///         {"index": 2, "node_type": "concatenation", "nodes": [0, 1]},
///         {"index": 3, "node_type": "length_calculation", "nodes": [2]}
///     ]},
///     "output_node_index": 3
/// }"#;
/// assert_eq!(strgraph::eval_graph(json).unwrap(), "6");
/// ```
pub fn eval_graph(json: &str) -> Result<String> {
    Computation::from_json(json)?.evaluate()
}
