use crate::{
    CaseMode, Computation, ComputationSpec, Graph, GraphSpec, Node, NodeId, NodeKind, Result,
};

/// GraphBuilder assembles a graph one operation at a time, handing out the
/// index of each new node.
///
/// # Example
///
/// ```
/// use strgraph::{CaseMode, GraphBuilder};
///
/// let mut builder = GraphBuilder::new();
/// let greeting = builder.constant("hello");
/// let world = builder.constant(" world");
/// let joined = builder.concatenation([greeting, world]);
/// let shout = builder.case_conversion(joined, CaseMode::Upper);
/// assert_eq!(builder.eval(shout).unwrap(), "HELLO WORLD");
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeKind>,
}

impl GraphBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes added so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if no node was added.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add any operation.
    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(kind);
        NodeId(self.nodes.len() - 1)
    }

    /// Add a constant.
    pub fn constant(&mut self, value: impl Into<String>) -> NodeId {
        self.push(NodeKind::Constant {
            value: value.into(),
        })
    }

    /// Add a concatenation of `inputs` in order.
    pub fn concatenation(&mut self, inputs: impl IntoIterator<Item = NodeId>) -> NodeId {
        self.push(NodeKind::Concatenation {
            inputs: inputs.into_iter().collect(),
        })
    }

    /// Add a byte-range substring of `input`.
    pub fn substring(&mut self, input: NodeId, start: usize, end: usize) -> NodeId {
        self.push(NodeKind::Substring { input, start, end })
    }

    /// Add a replacement of `old` with `new` in `input`.
    pub fn replacement(&mut self, input: NodeId, old: NodeId, new: NodeId) -> NodeId {
        self.push(NodeKind::Replacement { input, old, new })
    }

    /// Add a test for `pattern` occurring in `input`.
    pub fn pattern_matching(&mut self, input: NodeId, pattern: NodeId) -> NodeId {
        self.push(NodeKind::PatternMatch { input, pattern })
    }

    /// Add a case conversion of `input`.
    pub fn case_conversion(&mut self, input: NodeId, mode: CaseMode) -> NodeId {
        self.push(NodeKind::CaseConversion { input, mode })
    }

    /// Add the byte length of `input`.
    pub fn length_calculation(&mut self, input: NodeId) -> NodeId {
        self.push(NodeKind::Length { input })
    }

    /// Wire records for the nodes added so far with `output` as the result.
    pub fn to_spec(&self, output: NodeId) -> ComputationSpec {
        ComputationSpec {
            graph: GraphSpec {
                nodes: self
                    .nodes
                    .iter()
                    .enumerate()
                    .map(|(index, kind)| crate::NodeSpec::from_kind(index, kind))
                    .collect(),
            },
            output_node_index: output.0,
        }
    }

    /// JSON text for the nodes added so far with `output` as the result.
    pub fn to_json(&self, output: NodeId) -> Result<String> {
        self.to_spec(output).to_json()
    }

    /// Validate the nodes and bind them to `output`.
    pub fn build(&self, output: NodeId) -> Result<Computation> {
        let graph = Graph::new(self.nodes.iter().cloned().map(Node::new).collect())?;
        Computation::new(graph, output)
    }

    /// Build and evaluate in one step.
    pub fn eval(&self, output: NodeId) -> Result<String> {
        self.build(output)?.evaluate()
    }
}
