//! Wire records for describing a computation.
//!
//! The JSON shape is:
//!
//! ```json
//! {
//!   "graph": {
//!     "nodes": [
//!       { "index": 0, "node_type": "constant", "value": "foo" },
//!       { "index": 1, "node_type": "length_calculation", "nodes": [0] }
//!     ]
//!   },
//!   "output_node_index": 1
//! }
//! ```
//!
//! Each record's `index` must equal its position in `nodes`.

use serde::{Deserialize, Serialize};

use crate::{CaseMode, GraphError, Node, NodeId, NodeKind, Result};

/// A full computation: the graph plus the node whose value is the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationSpec {
    /// The node records.
    pub graph: GraphSpec,
    /// Index of the output node.
    pub output_node_index: usize,
}

/// The node list of a computation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphSpec {
    /// Node records in index order.
    pub nodes: Vec<NodeSpec>,
}

/// One node record. Which optional fields are required depends on `node_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Identifier other records use to reference this node.
    pub index: usize,
    /// Variant name, e.g. `"constant"` or `"pattern_matching"`.
    pub node_type: String,
    /// Value of a constant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Dependency indices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes: Option<Vec<usize>>,
    /// Substring start offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<u64>,
    /// Substring end offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<u64>,
    /// Case conversion mode tag.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub case_type: Option<String>,
}

impl NodeSpec {
    fn empty(index: usize, node_type: &str) -> Self {
        Self {
            index,
            node_type: node_type.to_owned(),
            value: None,
            nodes: None,
            start: None,
            end: None,
            case_type: None,
        }
    }

    /// Convert the record into a node operation.
    ///
    /// `position` is where the record sits in the node list and is used for
    /// error context.
    pub fn to_kind(&self, position: usize) -> Result<NodeKind> {
        let kind = match self.node_type.as_str() {
            "constant" => NodeKind::Constant {
                value: self.required(position, "value", self.value.clone())?,
            },
            "concatenation" => NodeKind::Concatenation {
                inputs: self
                    .required(position, "nodes", self.nodes.clone())?
                    .into_iter()
                    .map(NodeId)
                    .collect(),
            },
            "substring" => {
                let [input] = self.positional(position)?;
                NodeKind::Substring {
                    input,
                    start: offset(self.required(position, "start", self.start)?),
                    end: offset(self.required(position, "end", self.end)?),
                }
            }
            "replacement" => {
                let [input, old, new] = self.positional(position)?;
                NodeKind::Replacement { input, old, new }
            }
            "pattern_matching" => {
                let [input, pattern] = self.positional(position)?;
                NodeKind::PatternMatch { input, pattern }
            }
            "case_conversion" => {
                let [input] = self.positional(position)?;
                let tag = self.required(position, "type", self.case_type.clone())?;
                NodeKind::CaseConversion {
                    input,
                    mode: CaseMode::from_tag(&tag),
                }
            }
            "length_calculation" => {
                let [input] = self.positional(position)?;
                NodeKind::Length { input }
            }
            other => {
                return Err(GraphError::malformed(
                    position,
                    format!("unrecognized node_type {:?}", other),
                ))
            }
        };
        Ok(kind)
    }

    /// Build the record for `kind` stored at `index`.
    pub fn from_kind(index: usize, kind: &NodeKind) -> Self {
        let mut spec = Self::empty(index, kind.name());
        match kind {
            NodeKind::Constant { value } => spec.value = Some(value.clone()),
            NodeKind::Substring { start, end, .. } => {
                spec.start = Some(*start as u64);
                spec.end = Some(*end as u64);
            }
            NodeKind::CaseConversion { mode, .. } => {
                spec.case_type = Some(mode.as_tag().to_owned())
            }
            _ => {}
        }
        if !matches!(kind, NodeKind::Constant { .. }) {
            spec.nodes = Some(kind.dependencies().into_iter().map(NodeId::index).collect());
        }
        spec
    }

    fn required<V>(&self, position: usize, field: &str, value: Option<V>) -> Result<V> {
        value.ok_or_else(|| {
            GraphError::malformed(
                position,
                format!("{} node is missing field `{}`", self.node_type, field),
            )
        })
    }

    fn positional<const N: usize>(&self, position: usize) -> Result<[NodeId; N]> {
        let nodes = self.nodes.as_deref().ok_or_else(|| {
            GraphError::malformed(
                position,
                format!("{} node is missing field `nodes`", self.node_type),
            )
        })?;
        let ids: [usize; N] = nodes.try_into().map_err(|_| {
            GraphError::malformed(
                position,
                format!(
                    "{} node expects {} entries in `nodes`, got {}",
                    self.node_type,
                    N,
                    nodes.len()
                ),
            )
        })?;
        Ok(ids.map(NodeId))
    }
}

/// Offsets beyond the address space clamp to the end of any string.
fn offset(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

impl GraphSpec {
    /// Convert all records into uncached nodes, checking that every `index`
    /// matches its position.
    pub fn to_nodes(&self) -> Result<Vec<Node>> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(position, spec)| {
                if spec.index != position {
                    return Err(GraphError::malformed(
                        position,
                        format!(
                            "index {} does not match position {} in the node list",
                            spec.index, position
                        ),
                    ));
                }
                spec.to_kind(position).map(Node::new)
            })
            .collect()
    }

    /// Records for `nodes`, numbered by position.
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        Self {
            nodes: nodes
                .into_iter()
                .enumerate()
                .map(|(index, node)| NodeSpec::from_kind(index, node.kind()))
                .collect(),
        }
    }
}

impl ComputationSpec {
    /// Parse a computation from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a computation from an already decoded JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Serialize to JSON text.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn node(value: serde_json::Value) -> NodeSpec {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_positional_fields() {
        let spec = node(json!({"index": 3, "node_type": "replacement", "nodes": [0, 1, 2]}));
        assert_eq!(
            spec.to_kind(3).unwrap(),
            NodeKind::Replacement {
                input: NodeId(0),
                old: NodeId(1),
                new: NodeId(2),
            }
        );

        let spec = node(json!({
            "index": 1, "node_type": "substring", "nodes": [0], "start": 2, "end": 10
        }));
        assert_eq!(
            spec.to_kind(1).unwrap(),
            NodeKind::Substring {
                input: NodeId(0),
                start: 2,
                end: 10,
            }
        );

        let spec = node(json!({
            "index": 1, "node_type": "case_conversion", "nodes": [0], "type": "lower"
        }));
        assert_eq!(
            spec.to_kind(1).unwrap(),
            NodeKind::CaseConversion {
                input: NodeId(0),
                mode: CaseMode::Lower,
            }
        );
    }

    #[test]
    fn test_unknown_node_type_is_rejected() {
        let spec = node(json!({"index": 0, "node_type": "reverse", "nodes": [1]}));
        let err = spec.to_kind(0).unwrap_err();
        assert_eq!(
            err,
            GraphError::MalformedInput {
                node: Some(0),
                message: "unrecognized node_type \"reverse\"".to_owned(),
            }
        );
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let spec = node(json!({"index": 0, "node_type": "constant"}));
        assert!(matches!(
            spec.to_kind(0),
            Err(GraphError::MalformedInput { node: Some(0), .. })
        ));

        let spec = node(json!({"index": 2, "node_type": "substring", "nodes": [0], "start": 1}));
        let err = spec.to_kind(2).unwrap_err();
        assert!(err.to_string().contains("`end`"));

        let spec = node(json!({"index": 2, "node_type": "length_calculation"}));
        assert!(spec.to_kind(2).is_err());
    }

    #[test]
    fn test_wrong_arity_is_rejected() {
        let spec = node(json!({"index": 2, "node_type": "pattern_matching", "nodes": [0]}));
        let err = spec.to_kind(2).unwrap_err();
        assert!(err
            .to_string()
            .contains("expects 2 entries in `nodes`, got 1"));

        let spec = node(json!({"index": 2, "node_type": "length_calculation", "nodes": [0, 1]}));
        assert!(spec.to_kind(2).is_err());
    }

    #[test]
    fn test_negative_offset_is_a_type_error() {
        let err = ComputationSpec::from_value(json!({
            "graph": {"nodes": [
                {"index": 0, "node_type": "constant", "value": "x"},
                {"index": 1, "node_type": "substring", "nodes": [0], "start": -1, "end": 2}
            ]},
            "output_node_index": 1
        }))
        .unwrap_err();
        assert!(matches!(err, GraphError::MalformedInput { node: None, .. }));
    }

    #[test]
    fn test_index_must_match_position() {
        let graph = GraphSpec {
            nodes: vec![
                node(json!({"index": 0, "node_type": "constant", "value": "a"})),
                node(json!({"index": 5, "node_type": "constant", "value": "b"})),
            ],
        };
        let err = graph.to_nodes().unwrap_err();
        assert_eq!(err.node(), Some(1));
    }

    #[test]
    fn test_record_round_trip_keeps_wire_names() {
        let kind = NodeKind::CaseConversion {
            input: NodeId(0),
            mode: CaseMode::Upper,
        };
        let value = serde_json::to_value(NodeSpec::from_kind(1, &kind)).unwrap();
        assert_eq!(
            value,
            json!({"index": 1, "node_type": "case_conversion", "nodes": [0], "type": "upper"})
        );

        let value = serde_json::to_value(NodeSpec::from_kind(0, &NodeKind::Constant {
            value: "v".to_owned(),
        }))
        .unwrap();
        assert_eq!(value, json!({"index": 0, "node_type": "constant", "value": "v"}));
    }
}
