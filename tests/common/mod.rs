//! Shared tree and value builders for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use treesum::{FixedValues, NodeId, ReductionConfig, Tree};

/// Generous per-wait limit so a broken protocol fails instead of hanging
pub fn test_config() -> ReductionConfig {
    ReductionConfig::default()
        .with_barrier_timeout(Duration::from_secs(10))
        .with_stack_size(256 * 1024)
}

/// Root 0 with `leaves` children numbered 1..=leaves
pub fn star(leaves: usize) -> Tree {
    let mut pairs = vec![(0, 0)];
    pairs.extend((1..=leaves).map(|leaf| (leaf, 0)));
    Tree::build(pairs).expect("star is well formed")
}

/// Path 0 ← 1 ← … ← `last`
pub fn chain(last: usize) -> Tree {
    let mut pairs = vec![(0, 0)];
    pairs.extend((1..=last).map(|id| (id, id - 1)));
    Tree::build(pairs).expect("chain is well formed")
}

/// Tree from a parent list: entry `i` is the parent of node `i`, `None` for the root
pub fn from_parents(parents: &[Option<NodeId>]) -> Tree {
    let pairs = parents
        .iter()
        .enumerate()
        .map(|(id, parent)| (id, parent.unwrap_or(id)));
    Tree::build_with_capacity(pairs, parents.len().max(1)).expect("parent list is well formed")
}

/// Value table for the given leaves
pub fn values(entries: &[(NodeId, i64)]) -> FixedValues {
    entries.iter().copied().collect()
}

/// Sum of the values assigned to the tree's leaves
pub fn expected_sum(tree: &Tree, values: &FixedValues) -> i64 {
    tree.leaves()
        .into_iter()
        .map(|leaf| values.get(leaf).unwrap_or(0))
        .sum()
}

/// Write `contents` to a per-process scratch file
pub fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("treesum-tests-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch directory");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write scratch file");
    path
}
