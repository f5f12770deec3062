//! Per-node worker protocol
//!
//! Every node runs one worker:
//!
//! - **Leaf**: fetch a value, add it to its own accumulator under the lock,
//!   arrive at the parent's barrier.
//! - **Internal**: wait on its own barrier until every child has arrived, add
//!   the children's accumulators into its own under the lock, arrive at the
//!   parent's barrier unless it is the root.
//!
//! Both then arrive at the global barrier. A child writes its accumulator
//! before arriving at `B[parent]`, and the parent reads it only after
//! `wait(B[parent])` returns, so every read sees the child's final value.
//!
//! A failing worker aborts the whole primitive set before returning, which
//! turns every blocked wait elsewhere into an `Aborted` error instead of a
//! hang.

mod source;

pub use source::{
    parse_value, FixedValues, LeafInputError, LeafSource, PromptedValues, ValuesError,
};

use std::fmt;
use std::thread;

use thiserror::Error;
use tracing::{debug, info};

use crate::driver::Reduction;
use crate::sync::{AccumulatorOverflow, Primitives, SyncError};
use crate::tree::{Node, NodeId};

/// Failure of a single worker
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Leaf could not obtain its value
    #[error("leaf node {node}: {source}")]
    LeafInput {
        /// Leaf id
        node: NodeId,
        /// Cause
        #[source]
        source: LeafInputError,
    },

    /// Partial sum left the `i64` range
    #[error("node {node}: {source}")]
    Overflow {
        /// Node id
        node: NodeId,
        /// Cause
        #[source]
        source: AccumulatorOverflow,
    },

    /// Barrier operation failed
    #[error("node {node}: {source}")]
    Sync {
        /// Node id
        node: NodeId,
        /// Cause
        #[source]
        source: SyncError,
    },

    /// Worker thread panicked
    #[error("worker for node {node} panicked: {message}")]
    Panicked {
        /// Node id
        node: NodeId,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl WorkerError {
    /// Node whose worker failed
    pub fn node(&self) -> NodeId {
        match self {
            WorkerError::LeafInput { node, .. }
            | WorkerError::Overflow { node, .. }
            | WorkerError::Sync { node, .. }
            | WorkerError::Panicked { node, .. } => *node,
        }
    }

    /// Caused by another worker's abort rather than by this worker
    pub fn is_secondary(&self) -> bool {
        matches!(self, WorkerError::Sync { source, .. } if source.is_abort())
    }

    /// Barrier timeout, if that is what this is
    pub fn as_timeout(&self) -> Option<&SyncError> {
        match self {
            WorkerError::Sync { source, .. } if source.is_timeout() => Some(source),
            _ => None,
        }
    }
}

/// Every primary failure of a run
#[derive(Debug)]
pub struct WorkerFailures(Vec<WorkerError>);

impl WorkerFailures {
    pub(crate) fn new(mut failures: Vec<WorkerError>) -> Self {
        failures.sort_by_key(WorkerError::node);
        Self(failures)
    }

    /// Failures ordered by node id
    pub fn iter(&self) -> impl Iterator<Item = &WorkerError> {
        self.0.iter()
    }

    /// Number of failed workers
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no failures
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids of the failed nodes
    pub fn nodes(&self) -> Vec<NodeId> {
        self.0.iter().map(WorkerError::node).collect()
    }
}

impl fmt::Display for WorkerFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.len() {
            1 => write!(f, "1 worker failed: ")?,
            n => write!(f, "{} workers failed: ", n)?,
        }
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", failure)?;
        }
        Ok(())
    }
}

/// Which branch of the protocol a node ran
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Received an external value
    Leaf,
    /// Aggregated its children
    Internal,
}

/// Result of a successful worker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOutcome {
    /// Node id
    pub node: NodeId,
    /// Branch taken
    pub role: NodeRole,
    /// Final accumulator value
    pub total: i64,
}

/// Aborts the primitive set if the worker unwinds
struct AbortOnPanic<'a>(&'a Primitives);

impl Drop for AbortOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.abort();
        }
    }
}

/// Run the protocol for `node`
///
/// On error the whole primitive set is aborted before returning.
pub fn run_worker<S>(
    reduction: &Reduction,
    node: &Node,
    source: &S,
) -> Result<NodeOutcome, WorkerError>
where
    S: LeafSource + ?Sized,
{
    let _guard = AbortOnPanic(reduction.primitives());

    let result = execute(reduction, node, source);
    if let Err(err) = &result {
        if !err.is_secondary() {
            debug!(node = node.id(), error = %err, "worker failed");
        }
        reduction.primitives().abort();
    }
    result
}

fn execute<S>(reduction: &Reduction, node: &Node, source: &S) -> Result<NodeOutcome, WorkerError>
where
    S: LeafSource + ?Sized,
{
    let id = node.id();
    let sync = reduction.primitives();
    let timeout = reduction.config().barrier_timeout;
    let sync_err = |source: SyncError| WorkerError::Sync { node: id, source };
    let overflow = |source: AccumulatorOverflow| WorkerError::Overflow { node: id, source };

    let (role, total) = if node.is_leaf() {
        let value = source
            .value_for(id)
            .map_err(|source| WorkerError::LeafInput { node: id, source })?;
        let total = sync.accumulator(id).add(value).map_err(overflow)?;
        debug!(node = id, value, "leaf value recorded");
        (NodeRole::Leaf, total)
    } else {
        sync.barrier(id).wait(timeout).map_err(sync_err)?;
        let total = sync
            .accumulator(id)
            .add_all(node.children().iter().map(|&child| sync.accumulator(child).get()))
            .map_err(overflow)?;
        info!(
            node = id,
            partial_sum = total,
            "internal node gets the partial sum from its children"
        );
        (NodeRole::Internal, total)
    };

    if let Some(parent) = node.parent() {
        sync.barrier(parent).arrive().map_err(sync_err)?;
    }
    sync.global().arrive().map_err(sync_err)?;

    Ok(NodeOutcome {
        node: id,
        role,
        total,
    })
}
