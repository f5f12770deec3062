//! Property tests: random trees and leaf values

mod common;

use std::time::Duration;

use common::*;
use proptest::prelude::*;
use proptest::sample::Index;
use treesum::{driver, FixedValues, NodeId, Tree};

/// Random rooted tree of 1..=max_nodes nodes with a value per node
///
/// Node `i > 0` attaches under some node `< i`; ids are then rotated so the
/// root is not always 0.
fn tree_and_values(max_nodes: usize) -> impl Strategy<Value = (Tree, FixedValues)> {
    (1..=max_nodes)
        .prop_flat_map(|n| {
            (
                proptest::collection::vec(any::<Index>(), n),
                proptest::collection::vec(-1_000i64..1_000, n),
                0..n,
            )
        })
        .prop_map(|(attach, values, shift)| {
            let n = attach.len();
            let relabel = |id: NodeId| (id + shift) % n;
            let parents: Vec<Option<NodeId>> = {
                let mut parents = vec![None; n];
                for i in 1..n {
                    parents[relabel(i)] = Some(relabel(attach[i].index(i)));
                }
                parents
            };
            let tree = from_parents(&parents);
            let values = values.into_iter().enumerate().collect();
            (tree, values)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn root_sum_equals_leaf_total((tree, values) in tree_and_values(40)) {
        let expected = expected_sum(&tree, &values);
        let leaves = tree.leaves().len();

        let report = driver::run(tree, &values, &test_config()).expect("reduction succeeds");

        prop_assert_eq!(report.sum, expected);
        prop_assert_eq!(report.leaf_count, leaves);
    }

    #[test]
    fn partial_sums_match_subtrees((tree, values) in tree_and_values(30)) {
        let mut subtree = vec![0i64; tree.len()];
        for leaf in tree.leaves() {
            subtree[leaf] = values.get(leaf).unwrap_or(0);
        }
        // Deepest first, so every child is final before its parent
        for node in tree.internal_nodes_bottom_up() {
            subtree[node] = tree.children(node).iter().map(|&child| subtree[child]).sum();
        }

        let report = driver::run(tree.clone(), &values, &test_config()).expect("reduction succeeds");

        for partial in &report.partial_sums {
            prop_assert_eq!(partial.sum, subtree[partial.node]);
        }
        prop_assert_eq!(report.partial_sums.len(), tree.internal_nodes().len());
    }
}

#[test]
fn repeated_runs_agree() {
    let tree = Tree::build([
        (0, 0),
        (1, 0),
        (2, 0),
        (3, 1),
        (4, 1),
        (5, 1),
        (6, 2),
        (7, 6),
        (8, 6),
        (9, 0),
    ])
    .unwrap();
    let leaf_values = values(&[(3, 7), (4, -2), (5, 11), (7, 100), (8, 1), (9, 3)]);

    let mut sums = std::collections::HashSet::new();
    for _ in 0..25 {
        let report = driver::run(tree.clone(), &leaf_values, &test_config()).unwrap();
        sums.insert(report.sum);
    }

    assert_eq!(sums.len(), 1, "sums diverged across runs: {:?}", sums);
    assert!(sums.contains(&120));
}

#[test]
fn well_formed_trees_finish_in_bounded_time() {
    let config = test_config().with_barrier_timeout(Duration::from_secs(5));
    for size in [1, 2, 10, 50, 100] {
        let tree = chain(size - 1);
        let leaf_values = values(&[(size - 1, 1)]);
        let report = driver::run(tree, &leaf_values, &config).expect("no barrier times out");
        assert_eq!(report.sum, 1);
        assert!(report.elapsed < Duration::from_secs(30));
    }
}
