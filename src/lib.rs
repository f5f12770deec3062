//! # Tree Sum via Per-Node Barriers
//!
//! Computes the sum of the values supplied at the leaves of a static tree by
//! running one worker thread per node and propagating partial sums upward.
//!
//! ## Core Protocol
//!
//! 1. **Tree model**: `(child, parent)` records validated into an arena
//! 2. **Primitives**: one lock-guarded accumulator and one barrier per node,
//!    barrier arity = child count; one global barrier, arity = node count
//! 3. **Workers**: leaves add their value and arrive at the parent's
//!    barrier; internal nodes wait on their own barrier, add their children,
//!    then arrive at their parent's
//! 4. **Driver**: waits on the global barrier, then reads the root
//!
//! ## Usage Example
//!
//! ```no_run
//! use treesum::{driver, FixedValues, ReductionConfig, Tree};
//!
//! let tree = Tree::build([(1, 0), (2, 0), (0, 0)])?;
//! let values: FixedValues = [(1, 3), (2, 4)].into_iter().collect();
//! let report = driver::run(tree, &values, &ReductionConfig::default())?;
//! assert_eq!(report.sum, 7);
//! # Ok::<(), treesum::ReductionError>(())
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod driver; // Reduction aggregate and thread spawning
pub mod sync; // Accumulators and rendezvous barriers
pub mod tree; // Validated static tree
pub mod worker; // Per-node protocol and leaf sources

pub use driver::Reduction;
pub use sync::{BarrierId, SyncError};
pub use tree::{Edge, MalformedTree, NodeId, Tree, TreeError};
pub use worker::{FixedValues, LeafInputError, LeafSource, PromptedValues, WorkerError};

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;
use worker::{ValuesError, WorkerFailures};

/// Stack size for worker threads (2 MiB)
pub const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Configuration parameters for a reduction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionConfig {
    /// Maximum node count accepted when loading a tree
    pub capacity: usize,

    /// Limit on each barrier wait; `None` waits indefinitely
    pub barrier_timeout: Option<Duration>,

    /// Worker thread stack size in bytes
    pub stack_size: usize,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        Self {
            capacity: tree::DEFAULT_CAPACITY,
            barrier_timeout: None,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl ReductionConfig {
    /// Set maximum node count
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Bound every barrier wait
    pub fn with_barrier_timeout(mut self, timeout: Duration) -> Self {
        self.barrier_timeout = Some(timeout);
        self
    }

    /// Set worker stack size
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }
}

/// Final total of one internal node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartialSum {
    /// Internal node id
    pub node: NodeId,
    /// Sum of its subtree's leaves
    pub sum: i64,
}

impl fmt::Display for PartialSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Internal node {} gets the partial sum {} from its children",
            self.node, self.sum
        )
    }
}

/// Result of a reduction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionReport {
    /// Root id
    pub root: NodeId,

    /// Sum of every leaf value
    pub sum: i64,

    /// Internal node totals, deepest first
    pub partial_sums: Vec<PartialSum>,

    /// Number of workers run
    pub node_count: usize,

    /// Number of leaves that supplied a value
    pub leaf_count: usize,

    /// Wall time from spawn to completion
    pub elapsed: Duration,
}

impl fmt::Display for ReductionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sum at root(node {}): {}", self.root, self.sum)
    }
}

/// Errors that can occur while loading or reducing a tree
#[derive(Error, Debug)]
pub enum ReductionError {
    /// Input file could not be read
    #[error("cannot read {}: {source}", .path.display())]
    InputUnavailable {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Tree definition rejected (malformed or over capacity)
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// Leaf values file rejected
    #[error("invalid values file: {0}")]
    Values(#[from] ValuesError),

    /// One or more workers failed; no sum is reported
    #[error("{0}")]
    WorkerFailure(WorkerFailures),

    /// A barrier never reached its arity within the configured timeout
    #[error("synchronization timeout: {0}")]
    SynchronizationTimeout(SyncError),

    /// Global barrier failed without any worker reporting a cause
    #[error("synchronization failed: {0}")]
    Synchronization(SyncError),

    /// Worker thread could not be created
    #[error("failed to spawn worker for node {node}: {source}")]
    WorkerSpawn {
        /// Node whose worker was not started
        node: NodeId,
        /// Underlying OS error
        #[source]
        source: io::Error,
    },
}

impl ReductionError {
    /// Tree definition was malformed
    pub fn is_malformed_tree(&self) -> bool {
        matches!(self, ReductionError::Tree(err) if err.is_malformed())
    }

    /// Tree definition exceeded capacity
    pub fn is_capacity_exceeded(&self) -> bool {
        matches!(
            self,
            ReductionError::Tree(TreeError::CapacityExceeded { .. })
        )
    }

    /// Worker failures, if that is what this is
    pub fn worker_failures(&self) -> Option<&WorkerFailures> {
        match self {
            ReductionError::WorkerFailure(failures) => Some(failures),
            _ => None,
        }
    }
}

/// Read and validate a tree definition file
pub fn load_tree(path: impl AsRef<Path>, capacity: usize) -> Result<Tree, ReductionError> {
    let text = read_input(path.as_ref())?;
    Ok(tree::parse_tree(&text, capacity)?)
}

/// Read a leaf values file (`node value` per line)
pub fn load_values(path: impl AsRef<Path>) -> Result<FixedValues, ReductionError> {
    let text = read_input(path.as_ref())?;
    Ok(FixedValues::parse(&text)?)
}

fn read_input(path: &Path) -> Result<String, ReductionError> {
    std::fs::read_to_string(path).map_err(|source| ReductionError::InputUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReductionConfig::default();
        assert_eq!(config.capacity, 100);
        assert_eq!(config.stack_size, 2_097_152);
        assert_eq!(config.barrier_timeout, None);
    }

    #[test]
    fn test_config_builders() {
        let config = ReductionConfig::default()
            .with_capacity(8)
            .with_barrier_timeout(Duration::from_millis(250))
            .with_stack_size(64 * 1024);
        assert_eq!(config.capacity, 8);
        assert_eq!(config.barrier_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.stack_size, 65_536);
    }

    #[test]
    fn test_report_lines() {
        let report = ReductionReport {
            root: 0,
            sum: 7,
            partial_sums: vec![PartialSum { node: 0, sum: 7 }],
            node_count: 3,
            leaf_count: 2,
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.to_string(), "Sum at root(node 0): 7");
        assert_eq!(
            report.partial_sums[0].to_string(),
            "Internal node 0 gets the partial sum 7 from its children"
        );
    }

    #[test]
    fn test_missing_file_is_input_unavailable() {
        let err = load_tree("/nonexistent/treesum/tree.txt", 100).unwrap_err();
        assert!(matches!(err, ReductionError::InputUnavailable { .. }));
        assert!(err.to_string().contains("/nonexistent/treesum/tree.txt"));
    }
}
