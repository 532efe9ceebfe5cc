//! Evaluation scenarios: variant semantics through a whole graph, memoization
//! and cycle handling.

use std::sync::Arc;

use strgraph::{
    CaseMode, EvalEvent, EventCollector, Graph, GraphBuilder, GraphError, Node, NodeId, NodeKind,
};

fn eval_single(kind_for: impl FnOnce(&mut GraphBuilder) -> NodeId) -> String {
    let mut builder = GraphBuilder::new();
    let output = kind_for(&mut builder);
    builder.eval(output).unwrap()
}

#[test]
fn test_foo_bar_length() {
    let mut builder = GraphBuilder::new();
    let foo = builder.constant("foo");
    let bar = builder.constant("bar");
    let joined = builder.concatenation([foo, bar]);
    let length = builder.length_calculation(joined);
    assert_eq!(builder.eval(length).unwrap(), "6");
}

#[test]
fn test_substring_clamping() {
    for (start, end, expected) in [(2, 10, "llo"), (10, 20, ""), (3, 1, ""), (0, 0, "")] {
        let result = eval_single(|b| {
            let input = b.constant("hello");
            b.substring(input, start, end)
        });
        assert_eq!(result, expected, "start={start} end={end}");
    }
}

#[test]
fn test_replacement_non_overlapping() {
    let result = eval_single(|b| {
        let input = b.constant("aaa");
        let old = b.constant("aa");
        let new = b.constant("b");
        b.replacement(input, old, new)
    });
    assert_eq!(result, "ba");
}

#[test]
fn test_replacement_with_empty_old_is_noop() {
    let result = eval_single(|b| {
        let input = b.constant("abc");
        let old = b.constant("");
        let new = b.constant("-");
        b.replacement(input, old, new)
    });
    assert_eq!(result, "abc");
}

#[test]
fn test_pattern_matching() {
    for (pattern, expected) in [("wor", "true"), ("", "true"), ("xyz", "false")] {
        let result = eval_single(|b| {
            let input = b.constant("hello world");
            let pattern = b.constant(pattern);
            b.pattern_matching(input, pattern)
        });
        assert_eq!(result, expected, "pattern={pattern:?}");
    }
}

#[test]
fn test_length_counts_bytes() {
    let result = eval_single(|b| {
        let input = b.constant("héllo");
        b.length_calculation(input)
    });
    assert_eq!(result, "6");
}

#[test]
fn test_case_conversion_modes() {
    let upper = eval_single(|b| {
        let input = b.constant("MiXed 1");
        b.case_conversion(input, CaseMode::Upper)
    });
    assert_eq!(upper, "MIXED 1");

    let lower = eval_single(|b| {
        let input = b.constant("MiXed 1");
        b.case_conversion(input, CaseMode::Lower)
    });
    assert_eq!(lower, "mixed 1");

    let passthrough = eval_single(|b| {
        let input = b.constant("MiXed 1");
        b.case_conversion(input, CaseMode::Other("swap".to_owned()))
    });
    assert_eq!(passthrough, "MiXed 1");
}

#[test]
fn test_empty_concatenation() {
    let result = eval_single(|b| b.concatenation([]));
    assert_eq!(result, "");
}

#[test]
fn test_pattern_result_feeds_other_nodes() {
    // The "true"/"false" strings are ordinary values for downstream nodes.
    let mut builder = GraphBuilder::new();
    let input = builder.constant("haystack");
    let needle = builder.constant("st");
    let found = builder.pattern_matching(input, needle);
    let shouted = builder.case_conversion(found, CaseMode::Upper);
    let len = builder.length_calculation(found);
    let both = builder.concatenation([shouted, len]);
    assert_eq!(builder.eval(both).unwrap(), "TRUE4");
}

#[test]
fn test_shared_dependency_computed_once() {
    let collector = Arc::new(EventCollector::new());
    let mut graph = Graph::with_tracer(
        vec![
            Node::constant("ab"),
            Node::new(NodeKind::CaseConversion {
                input: NodeId(0),
                mode: CaseMode::Upper,
            }),
            Node::new(NodeKind::Length { input: NodeId(1) }),
            Node::new(NodeKind::Concatenation {
                inputs: vec![NodeId(1), NodeId(2), NodeId(1)],
            }),
        ],
        collector.clone(),
    )
    .unwrap();

    assert_eq!(graph.evaluate(NodeId(3)).unwrap(), "AB2AB");
    for index in 0..4 {
        assert_eq!(collector.compute_count(NodeId(index)), 1, "node {index}");
    }
    let hits = collector
        .events()
        .iter()
        .filter(|e| matches!(e, EvalEvent::CacheHit { node } if *node == NodeId(1)))
        .count();
    assert_eq!(hits, 2);
}

#[test]
fn test_repeated_evaluation_does_not_recompute_dependencies() {
    let collector = Arc::new(EventCollector::new());
    let mut builder = GraphBuilder::new();
    let a = builder.constant("a");
    let b = builder.constant("b");
    let ab = builder.concatenation([a, b]);
    let output = builder.length_calculation(ab);
    let spec = builder.to_spec(output);
    let mut computation =
        strgraph::Computation::from_spec_with_tracer(&spec, collector.clone()).unwrap();

    let first = computation.evaluate().unwrap();
    let computed = collector.len();
    let second = computation.evaluate().unwrap();

    assert_eq!(first, second);
    assert_eq!(collector.compute_count(a), 1);
    assert_eq!(collector.compute_count(b), 1);
    assert_eq!(collector.len(), computed + 1);
}

#[test]
fn test_cycle_through_concatenation_rejected_at_build() {
    let err = Graph::new(vec![
        Node::constant("x"),
        Node::new(NodeKind::Concatenation {
            inputs: vec![NodeId(0), NodeId(2)],
        }),
        Node::new(NodeKind::Length { input: NodeId(1) }),
    ])
    .unwrap_err();
    assert_eq!(err, GraphError::CyclicGraph { path: vec![1, 2, 1] });
}

#[test]
fn test_deep_chain() {
    let mut builder = GraphBuilder::new();
    let mut current = builder.constant("x");
    for _ in 0..100_000 {
        current = builder.length_calculation(current);
    }
    assert_eq!(builder.eval(current).unwrap(), "1");
}

#[test]
fn test_length_of_split_sequence_counts_raw_bytes() {
    let result = eval_single(|b| {
        let input = b.constant("héllo");
        let head = b.substring(input, 0, 2);
        b.length_calculation(head)
    });
    assert_eq!(result, "2");
}

#[test]
fn test_split_sequence_output() {
    let mut builder = GraphBuilder::new();
    let input = builder.constant("héllo");
    let head = builder.substring(input, 0, 2);
    let tail = builder.substring(input, 2, 6);
    let joined = builder.concatenation([head, tail]);
    let needle = builder.constant("é");
    let found = builder.pattern_matching(joined, needle);

    let mut computation = builder.build(head).unwrap();
    assert_eq!(computation.evaluate_bytes().unwrap(), [b'h', 0xC3]);
    assert_eq!(computation.evaluate().unwrap(), "h\u{FFFD}");
    assert_eq!(builder.eval(joined).unwrap(), "héllo");
    assert_eq!(builder.eval(found).unwrap(), "true");
}
