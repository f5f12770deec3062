//! Reduction driver
//!
//! Owns the tree and its primitive set, spawns one scoped worker thread per
//! node, waits on the global barrier, then reads the root accumulator.

use std::any::Any;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::sync::Primitives;
use crate::tree::Tree;
use crate::worker::{self, LeafSource, NodeOutcome, NodeRole, WorkerError, WorkerFailures};
use crate::{PartialSum, ReductionConfig, ReductionError, ReductionReport};

/// Everything one run shares between the driver and its workers
///
/// Built once per run; the barriers are single use, so `run` consumes it.
#[derive(Debug)]
pub struct Reduction {
    tree: Tree,
    primitives: Primitives,
    config: ReductionConfig,
}

impl Reduction {
    /// Allocate the primitive set for `tree`
    pub fn new(tree: Tree, config: ReductionConfig) -> Self {
        let primitives = Primitives::for_tree(&tree);
        Self {
            tree,
            primitives,
            config,
        }
    }

    /// Tree being reduced
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Locks, accumulators and barriers
    pub fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    /// Run configuration
    pub fn config(&self) -> &ReductionConfig {
        &self.config
    }

    /// Spawn every worker and return the root sum
    pub fn run<S>(self, source: &S) -> Result<ReductionReport, ReductionError>
    where
        S: LeafSource + ?Sized,
    {
        let started = Instant::now();
        let this = &self;
        info!(
            nodes = this.tree.len(),
            root = this.tree.root(),
            height = this.tree.height(),
            "starting reduction"
        );

        let (spawn_error, completion, joined) = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(this.tree.len());
            let mut spawn_error = None;

            for node in this.tree.iter() {
                let spawned = thread::Builder::new()
                    .name(format!("node-{}", node.id()))
                    .stack_size(this.config.stack_size)
                    .spawn_scoped(scope, move || worker::run_worker(this, node, source));
                match spawned {
                    Ok(handle) => handles.push((node.id(), handle)),
                    Err(err) => {
                        warn!(node = node.id(), error = %err, "failed to spawn worker");
                        this.primitives.abort();
                        spawn_error = Some(ReductionError::WorkerSpawn {
                            node: node.id(),
                            source: err,
                        });
                        break;
                    }
                }
            }

            let completion = this.primitives.global().wait(None);
            debug!(ok = completion.is_ok(), "global barrier released");

            let joined: Vec<_> = handles
                .into_iter()
                .map(|(node, handle)| (node, handle.join()))
                .collect();
            (spawn_error, completion, joined)
        });

        if let Some(err) = spawn_error {
            return Err(err);
        }

        let mut outcomes = Vec::with_capacity(joined.len());
        let mut failures = Vec::new();
        for (node, result) in joined {
            match result {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(err)) => failures.push(err),
                Err(payload) => failures.push(WorkerError::Panicked {
                    node,
                    message: panic_message(payload.as_ref()),
                }),
            }
        }

        let primary: Vec<WorkerError> = failures
            .into_iter()
            .filter(|err| !err.is_secondary())
            .collect();
        if !primary.is_empty() {
            // Timeouts alone mean nobody failed outright; something never arrived
            let only_timeouts = primary.iter().all(|err| err.as_timeout().is_some());
            let first_timeout = primary.first().and_then(WorkerError::as_timeout).cloned();
            return Err(match first_timeout {
                Some(timeout) if only_timeouts => ReductionError::SynchronizationTimeout(timeout),
                _ => ReductionError::WorkerFailure(WorkerFailures::new(primary)),
            });
        }
        completion.map_err(ReductionError::Synchronization)?;

        let root = this.tree.root();
        let sum = this.primitives.accumulator(root).get();
        let report = ReductionReport {
            root,
            sum,
            partial_sums: this.partial_sums(&outcomes),
            node_count: this.tree.len(),
            leaf_count: outcomes
                .iter()
                .filter(|outcome| outcome.role == NodeRole::Leaf)
                .count(),
            elapsed: started.elapsed(),
        };
        info!(root, sum, elapsed = ?report.elapsed, "reduction complete");
        Ok(report)
    }

    /// Internal totals, deepest first
    fn partial_sums(&self, outcomes: &[NodeOutcome]) -> Vec<PartialSum> {
        let mut totals = vec![None; self.tree.len()];
        for outcome in outcomes {
            if outcome.role == NodeRole::Internal {
                totals[outcome.node] = Some(outcome.total);
            }
        }
        self.tree
            .internal_nodes_bottom_up()
            .into_iter()
            .filter_map(|node| totals[node].map(|sum| PartialSum { node, sum }))
            .collect()
    }
}

/// Reduce `tree` with values from `source`
pub fn run<S>(
    tree: Tree,
    source: &S,
    config: &ReductionConfig,
) -> Result<ReductionReport, ReductionError>
where
    S: LeafSource + ?Sized,
{
    Reduction::new(tree, config.clone()).run(source)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
