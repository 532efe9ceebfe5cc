use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ops, GraphError, Result};

/// NodeId is the dense, zero-based position of a node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    /// Position of the node in the graph.
    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// CaseMode selects the transform of a case conversion node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CaseMode {
    /// ASCII upper case.
    Upper,
    /// ASCII lower case.
    Lower,
    /// Any other tag. The input passes through unchanged.
    Other(String),
}

impl CaseMode {
    /// Parse a mode tag. Unknown tags become [`CaseMode::Other`].
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "upper" => CaseMode::Upper,
            "lower" => CaseMode::Lower,
            other => CaseMode::Other(other.to_owned()),
        }
    }

    /// The wire tag of this mode.
    pub fn as_tag(&self) -> &str {
        match self {
            CaseMode::Upper => "upper",
            CaseMode::Lower => "lower",
            CaseMode::Other(tag) => tag,
        }
    }
}

/// NodeKind is the closed set of operations a node can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// A literal value with no dependencies.
    Constant {
        /// The stored value.
        value: String,
    },
    /// Dependency values joined in order.
    Concatenation {
        /// Nodes to join, in order.
        inputs: Vec<NodeId>,
    },
    /// Byte range of the input.
    Substring {
        /// Source string.
        input: NodeId,
        /// First byte offset, inclusive.
        start: usize,
        /// Last byte offset, exclusive.
        end: usize,
    },
    /// Every occurrence of `old` in `input` replaced with `new`.
    Replacement {
        /// Source string.
        input: NodeId,
        /// Text to search for.
        old: NodeId,
        /// Replacement text.
        new: NodeId,
    },
    /// `"true"` if `pattern` occurs in `input`, `"false"` otherwise.
    PatternMatch {
        /// Text to search in.
        input: NodeId,
        /// Text to search for.
        pattern: NodeId,
    },
    /// ASCII case transform of the input.
    CaseConversion {
        /// Source string.
        input: NodeId,
        /// Which transform to apply.
        mode: CaseMode,
    },
    /// Decimal byte length of the input.
    Length {
        /// Source string.
        input: NodeId,
    },
}

impl NodeKind {
    /// The wire name of this variant.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Constant { .. } => "constant",
            NodeKind::Concatenation { .. } => "concatenation",
            NodeKind::Substring { .. } => "substring",
            NodeKind::Replacement { .. } => "replacement",
            NodeKind::PatternMatch { .. } => "pattern_matching",
            NodeKind::CaseConversion { .. } => "case_conversion",
            NodeKind::Length { .. } => "length_calculation",
        }
    }

    /// Nodes this operation reads from, in argument order.
    pub fn dependencies(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Constant { .. } => vec![],
            NodeKind::Concatenation { inputs } => inputs.clone(),
            NodeKind::Substring { input, .. }
            | NodeKind::CaseConversion { input, .. }
            | NodeKind::Length { input } => vec![*input],
            NodeKind::Replacement { input, old, new } => vec![*input, *old, *new],
            NodeKind::PatternMatch { input, pattern } => vec![*input, *pattern],
        }
    }

    /// Number of dependency values the operation consumes.
    pub fn arity(&self) -> usize {
        match self {
            NodeKind::Constant { .. } => 0,
            NodeKind::Concatenation { inputs } => inputs.len(),
            NodeKind::Substring { .. }
            | NodeKind::CaseConversion { .. }
            | NodeKind::Length { .. } => 1,
            NodeKind::Replacement { .. } => 3,
            NodeKind::PatternMatch { .. } => 2,
        }
    }

    /// Compute the value of this operation from the resolved dependency values.
    ///
    /// Values are raw bytes, so a substring that splits a multi-byte sequence
    /// reaches downstream nodes unchanged. `inputs` must line up with
    /// [`NodeKind::dependencies`]; `at` is only used to attribute an arity
    /// mismatch.
    pub fn apply(&self, at: NodeId, inputs: &[&[u8]]) -> Result<Vec<u8>> {
        let expected = self.arity();
        if inputs.len() != expected {
            return Err(GraphError::InternalInvariantViolation {
                node: at.0,
                message: format!(
                    "{} expects {} resolved inputs, got {}",
                    self.name(),
                    expected,
                    inputs.len()
                ),
            });
        }
        let value = match self {
            NodeKind::Constant { value } => value.as_bytes().to_vec(),
            NodeKind::Concatenation { .. } => inputs.concat(),
            NodeKind::Substring { start, end, .. } => ops::substring(inputs[0], *start, *end),
            NodeKind::Replacement { .. } => ops::replace(inputs[0], inputs[1], inputs[2]),
            NodeKind::PatternMatch { .. } => ops::bool_str(ops::contains(inputs[0], inputs[1]))
                .as_bytes()
                .to_vec(),
            NodeKind::CaseConversion { mode, .. } => ops::convert_case(inputs[0], mode),
            NodeKind::Length { .. } => ops::byte_length(inputs[0]).to_string().into_bytes(),
        };
        Ok(value)
    }
}

/// Node is one operation of the graph together with its memoized result.
///
/// The cache slot is the only evaluation state. It is filled by evaluation and
/// emptied by [`Node::clear_cache`], by a value change, or by the graph's
/// invalidation sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
    cache: Option<Vec<u8>>,
}

impl Node {
    /// Create an uncached node.
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, cache: None }
    }

    /// Shorthand for a constant node.
    pub fn constant(value: impl Into<String>) -> Self {
        Self::new(NodeKind::Constant {
            value: value.into(),
        })
    }

    /// The operation of this node.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Nodes this node reads from, in argument order.
    pub fn dependencies(&self) -> Vec<NodeId> {
        self.kind.dependencies()
    }

    /// The memoized value, if any.
    pub fn cached_value(&self) -> Option<&[u8]> {
        self.cache.as_deref()
    }

    /// Returns true if the cache slot is populated.
    pub fn has_cached_value(&self) -> bool {
        self.cache.is_some()
    }

    /// Empty this node's own cache slot. Returns true if it was populated.
    pub fn clear_cache(&mut self) -> bool {
        self.cache.take().is_some()
    }

    pub(crate) fn store(&mut self, value: Vec<u8>) {
        self.cache = Some(value);
    }

    /// Replace the value of a constant and clear its own cache.
    ///
    /// Dependents are left untouched; run the graph's invalidation sweep to
    /// propagate the change.
    pub fn set_value(&mut self, at: NodeId, value: impl Into<String>) -> Result<()> {
        match &mut self.kind {
            NodeKind::Constant { value: current } => {
                *current = value.into();
                self.cache = None;
                Ok(())
            }
            _ => Err(GraphError::NotConstant { node: at.0 }),
        }
    }
}

impl From<NodeKind> for Node {
    fn from(kind: NodeKind) -> Self {
        Node::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes<'a>(values: &[&'a str]) -> Vec<&'a [u8]> {
        values.iter().map(|s| s.as_bytes()).collect()
    }

    #[test]
    fn test_dependencies_in_argument_order() {
        let kind = NodeKind::Replacement {
            input: NodeId(3),
            old: NodeId(1),
            new: NodeId(2),
        };
        assert_eq!(kind.dependencies(), vec![NodeId(3), NodeId(1), NodeId(2)]);

        let kind = NodeKind::Concatenation {
            inputs: vec![NodeId(2), NodeId(0), NodeId(2)],
        };
        assert_eq!(kind.dependencies(), vec![NodeId(2), NodeId(0), NodeId(2)]);

        assert!(Node::constant("x").dependencies().is_empty());
    }

    #[test]
    fn test_apply_variants() {
        let at = NodeId(9);
        let concat = NodeKind::Concatenation {
            inputs: vec![NodeId(0), NodeId(1)],
        };
        assert_eq!(concat.apply(at, &bytes(&["foo", "bar"])).unwrap(), b"foobar");

        let empty = NodeKind::Concatenation { inputs: vec![] };
        assert_eq!(empty.apply(at, &[]).unwrap(), b"");

        let matcher = NodeKind::PatternMatch {
            input: NodeId(0),
            pattern: NodeId(1),
        };
        assert_eq!(
            matcher.apply(at, &bytes(&["hello world", "wor"])).unwrap(),
            b"true"
        );
        assert_eq!(matcher.apply(at, &bytes(&["hello", "xyz"])).unwrap(), b"false");

        let length = NodeKind::Length { input: NodeId(0) };
        assert_eq!(length.apply(at, &bytes(&["héllo"])).unwrap(), b"6");

        let upper = NodeKind::CaseConversion {
            input: NodeId(0),
            mode: CaseMode::Upper,
        };
        assert_eq!(upper.apply(at, &bytes(&["abc"])).unwrap(), b"ABC");

        // A split sequence is passed on byte for byte.
        let split = NodeKind::Length { input: NodeId(0) };
        assert_eq!(split.apply(at, &[&[b'h', 0xC3][..]]).unwrap(), b"2");
    }

    #[test]
    fn test_apply_reports_arity_mismatch() {
        let kind = NodeKind::Length { input: NodeId(0) };
        let err = kind.apply(NodeId(4), &[]).unwrap_err();
        assert!(matches!(
            err,
            GraphError::InternalInvariantViolation { node: 4, .. }
        ));
    }

    #[test]
    fn test_set_value_clears_own_cache() {
        let mut node = Node::constant("a");
        node.store(b"a".to_vec());
        assert!(node.has_cached_value());
        node.set_value(NodeId(0), "b").unwrap();
        assert!(!node.has_cached_value());
        assert_eq!(
            node.kind(),
            &NodeKind::Constant {
                value: "b".to_owned()
            }
        );
    }

    #[test]
    fn test_set_value_rejects_non_constant() {
        let mut node = Node::new(NodeKind::Length { input: NodeId(0) });
        assert_eq!(
            node.set_value(NodeId(1), "x"),
            Err(GraphError::NotConstant { node: 1 })
        );
    }

    #[test]
    fn test_case_mode_tags() {
        assert_eq!(CaseMode::from_tag("upper"), CaseMode::Upper);
        assert_eq!(CaseMode::from_tag("lower"), CaseMode::Lower);
        assert_eq!(CaseMode::from_tag("title").as_tag(), "title");
    }
}
