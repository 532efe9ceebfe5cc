//! Error types for graph construction and evaluation.

use thiserror::Error;

/// Errors raised while building, validating or evaluating a graph.
///
/// Schema and reference errors are reported when the graph is constructed,
/// so evaluation of a validated graph can only fail on an internal defect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The input record does not follow the expected shape.
    #[error("malformed input{}: {message}", at_node(.node))]
    MalformedInput {
        /// Position of the offending node record, if the error is node-local.
        node: Option<usize>,
        /// What is wrong with the record.
        message: String,
    },

    /// A dependency index or the output index points outside the graph.
    #[error("invalid reference{}: index {reference} is out of range for {len} nodes", at_node(.node))]
    InvalidReference {
        /// The node holding the reference. `None` for the output index.
        node: Option<usize>,
        /// The offending index.
        reference: usize,
        /// Number of nodes in the graph.
        len: usize,
    },

    /// The dependency relation contains a cycle.
    ///
    /// The first and the last element of `path` are the same node.
    #[error("dependency cycle detected: {}", format_path(.path))]
    CyclicGraph {
        /// Node indices forming the cycle.
        path: Vec<usize>,
    },

    /// A cache or arity invariant was broken. This indicates a bug in the crate.
    #[error("internal invariant violated at node {node}: {message}")]
    InternalInvariantViolation {
        /// The node where the violation was observed.
        node: usize,
        /// Description of the violation.
        message: String,
    },

    /// A value mutation targeted a node that is not a constant.
    #[error("node {node} is not a constant")]
    NotConstant {
        /// The targeted node.
        node: usize,
    },
}

/// Crate-wide result alias.
pub type Result<T, E = GraphError> = std::result::Result<T, E>;

impl GraphError {
    pub(crate) fn malformed(node: impl Into<Option<usize>>, message: impl Into<String>) -> Self {
        GraphError::MalformedInput {
            node: node.into(),
            message: message.into(),
        }
    }

    /// Returns the node the error is attached to, if any.
    pub fn node(&self) -> Option<usize> {
        match self {
            GraphError::MalformedInput { node, .. } => *node,
            GraphError::InvalidReference { node, .. } => *node,
            GraphError::CyclicGraph { path } => path.first().copied(),
            GraphError::InternalInvariantViolation { node, .. } => Some(*node),
            GraphError::NotConstant { node } => Some(*node),
        }
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::malformed(None::<usize>, err.to_string())
    }
}

fn at_node(node: &Option<usize>) -> String {
    match node {
        Some(node) => format!(" at node {}", node),
        None => String::new(),
    }
}

fn format_path(path: &[usize]) -> String {
    path.iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
