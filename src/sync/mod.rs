//! Per-node synchronization primitives
//!
//! For every node `n`: an accumulator behind its own lock and a barrier
//! whose arity is the child count of `n`. One global barrier, sized to the
//! node count, lets the driver know every worker has finished.

mod accumulator;
mod barrier;

pub use accumulator::{Accumulator, AccumulatorOverflow};
pub use barrier::{BarrierId, RendezvousBarrier, SyncError};

use crate::tree::{NodeId, Tree};
use tracing::warn;

/// Locks, accumulators and barriers for one reduction run
#[derive(Debug)]
pub struct Primitives {
    accumulators: Vec<Accumulator>,
    barriers: Vec<RendezvousBarrier>,
    global: RendezvousBarrier,
}

impl Primitives {
    /// Allocate one accumulator and barrier per node of `tree`
    pub fn for_tree(tree: &Tree) -> Self {
        Self {
            accumulators: (0..tree.len()).map(|_| Accumulator::new()).collect(),
            barriers: tree
                .iter()
                .map(|node| RendezvousBarrier::new(BarrierId::Node(node.id()), node.child_count()))
                .collect(),
            global: RendezvousBarrier::new(BarrierId::Global, tree.len()),
        }
    }

    /// Number of nodes covered
    pub fn len(&self) -> usize {
        self.accumulators.len()
    }

    /// Whether the set covers no nodes
    pub fn is_empty(&self) -> bool {
        self.accumulators.is_empty()
    }

    /// Accumulator of `node`
    ///
    /// Panics if `node` is not an id of the tree this set was built for.
    pub fn accumulator(&self, node: NodeId) -> &Accumulator {
        &self.accumulators[node]
    }

    /// Barrier of `node`
    ///
    /// Panics if `node` is not an id of the tree this set was built for.
    pub fn barrier(&self, node: NodeId) -> &RendezvousBarrier {
        &self.barriers[node]
    }

    /// Barrier every worker arrives at when done
    pub fn global(&self) -> &RendezvousBarrier {
        &self.global
    }

    /// Wake every waiter with `Aborted` and fail later operations
    pub fn abort(&self) {
        if self.global.is_aborted() {
            return;
        }
        warn!(nodes = self.len(), "aborting reduction barriers");
        for barrier in &self.barriers {
            barrier.abort();
        }
        self.global.abort();
    }

    /// Whether `abort` has run
    pub fn is_aborted(&self) -> bool {
        self.global.is_aborted()
    }
}
