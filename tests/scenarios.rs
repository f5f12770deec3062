//! End-to-end reductions over small fixed trees

mod common;

use common::*;
use test_case::test_case;
use treesum::{driver, tree, MalformedTree, NodeId, Tree, TreeError};

#[test_case(&[(1, 0), (2, 0), (0, 0)], &[(1, 3), (2, 4)], 7 ; "two leaves under the root")]
#[test_case(&[(0, 0), (1, 0), (2, 1)], &[(2, 5)], 5 ; "three level chain")]
#[test_case(&[(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (5, 0)], &[(1, 1), (2, 2), (3, 3), (4, 4), (5, 5)], 15 ; "star of five leaves")]
#[test_case(&[(0, 0)], &[(0, 11)], 11 ; "root alone is a leaf")]
#[test_case(&[(3, 3), (0, 3), (1, 3), (2, 0)], &[(1, -4), (2, 10)], 6 ; "non zero root and negative value")]
fn reduces_to_expected_sum(pairs: &[(NodeId, NodeId)], leaf_values: &[(NodeId, i64)], expected: i64) {
    let tree = Tree::build(pairs.iter().copied()).expect("tree builds");
    let root = tree.root();

    let report = driver::run(tree, &values(leaf_values), &test_config()).expect("reduction succeeds");

    assert_eq!(report.sum, expected);
    assert_eq!(report.root, root);
    assert_eq!(report.node_count, pairs.len());
}

#[test]
fn two_level_tree_reports_every_partial_sum() {
    //        0
    //      /   \
    //     1     2
    //    / \    |
    //   3   4   5
    let tree = Tree::build([(0, 0), (1, 0), (2, 0), (3, 1), (4, 1), (5, 2)]).unwrap();
    let leaf_values = values(&[(3, 1), (4, 2), (5, 10)]);

    let report = driver::run(tree, &leaf_values, &test_config()).unwrap();

    assert_eq!(report.sum, 13);
    assert_eq!(report.leaf_count, 3);
    let partials: Vec<(NodeId, i64)> = report
        .partial_sums
        .iter()
        .map(|partial| (partial.node, partial.sum))
        .collect();
    assert_eq!(partials, vec![(1, 3), (2, 10), (0, 13)]);
    assert_eq!(report.to_string(), "Sum at root(node 0): 13");
}

#[test]
fn text_definition_runs_end_to_end() {
    let tree = tree::parse_tree("3\n1 0\n2 0\n0 0\n", tree::DEFAULT_CAPACITY).unwrap();
    let report = driver::run(tree, &values(&[(1, 3), (2, 4)]), &test_config()).unwrap();
    assert_eq!(report.sum, 7);
}

#[test]
fn two_roots_rejected_before_any_worker() {
    let err = tree::parse_tree("3\n0 0\n1 1\n2 0\n", tree::DEFAULT_CAPACITY).unwrap_err();
    assert_eq!(
        err,
        TreeError::Malformed(MalformedTree::MultipleRoots {
            first: 0,
            second: 1
        })
    );
}

#[test]
fn no_root_rejected() {
    let err = Tree::build([(0, 1), (1, 0)]).unwrap_err();
    assert_eq!(err, TreeError::Malformed(MalformedTree::MissingRoot));
}

#[test]
fn dangling_parent_rejected_and_source_never_consulted() {
    use std::sync::atomic::{AtomicUsize, Ordering};

    let calls = AtomicUsize::new(0);
    let counting = |_node: NodeId| -> Result<i64, treesum::LeafInputError> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(1)
    };

    let result = Tree::build([(0, 0), (1, 0), (2, 9)])
        .map_err(treesum::ReductionError::from)
        .and_then(|tree| driver::run(tree, &counting, &test_config()));

    let err = result.unwrap_err();
    assert!(err.is_malformed_tree());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn capacity_is_enforced() {
    let pairs: Vec<(NodeId, NodeId)> = (0..101).map(|id| (id, 0)).collect();
    let err = Tree::build(pairs.clone()).unwrap_err();
    assert_eq!(
        err,
        TreeError::CapacityExceeded {
            nodes: 101,
            capacity: 100
        }
    );
    assert_eq!(Tree::build_with_capacity(pairs, 101).unwrap().len(), 101);
}

#[test]
fn wide_and_deep_trees() {
    let wide = star(60);
    let leaf_values: treesum::FixedValues = (1..=60).map(|leaf| (leaf, leaf as i64)).collect();
    let report = driver::run(wide, &leaf_values, &test_config()).unwrap();
    assert_eq!(report.sum, (1..=60).sum::<i64>());

    let deep = chain(80);
    let report = driver::run(deep, &values(&[(80, 42)]), &test_config()).unwrap();
    assert_eq!(report.sum, 42);
    assert_eq!(report.partial_sums.len(), 80);
    assert!(report.partial_sums.iter().all(|partial| partial.sum == 42));
}
