//! Single-use rendezvous barrier
//!
//! Unlike `std::sync::Barrier`, arrivals and waits are separate: a child
//! arrives at its parent's barrier without blocking, while the parent (which
//! is not itself a party) waits for the count to fill. A barrier requiring
//! zero parties starts out satisfied.

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use thiserror::Error;

use crate::tree::NodeId;

/// Which barrier of the primitive set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarrierId {
    /// Rendezvous of a node's children
    Node(NodeId),
    /// Rendezvous of every worker
    Global,
}

impl fmt::Display for BarrierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BarrierId::Node(id) => write!(f, "barrier of node {}", id),
            BarrierId::Global => write!(f, "global barrier"),
        }
    }
}

/// Barrier failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Required arrivals did not happen within the wait limit
    #[error("{barrier} timed out after {waited:?} with {arrived}/{required} arrivals")]
    Timeout {
        /// Barrier waited on
        barrier: BarrierId,
        /// Arrivals seen when the wait gave up
        arrived: usize,
        /// Arrivals required
        required: usize,
        /// Time spent waiting
        waited: Duration,
    },

    /// The primitive set was aborted by a failing worker
    #[error("{barrier} was aborted")]
    Aborted {
        /// Barrier involved
        barrier: BarrierId,
    },

    /// More arrivals than the barrier's arity
    #[error("{barrier} received more than its {required} arrivals")]
    Overfilled {
        /// Barrier involved
        barrier: BarrierId,
        /// Arrivals required
        required: usize,
    },
}

impl SyncError {
    /// Barrier the error refers to
    pub fn barrier(&self) -> BarrierId {
        match self {
            SyncError::Timeout { barrier, .. }
            | SyncError::Aborted { barrier }
            | SyncError::Overfilled { barrier, .. } => *barrier,
        }
    }

    /// Whether this is the knock-on effect of another failure
    pub fn is_abort(&self) -> bool {
        matches!(self, SyncError::Aborted { .. })
    }

    /// Whether a wait ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, SyncError::Timeout { .. })
    }
}

#[derive(Debug)]
struct BarrierState {
    arrived: usize,
    aborted: bool,
}

/// Counting barrier with a fixed number of parties
#[derive(Debug)]
pub struct RendezvousBarrier {
    id: BarrierId,
    required: usize,
    state: Mutex<BarrierState>,
    released: Condvar,
}

impl RendezvousBarrier {
    /// Create barrier expecting `required` arrivals
    pub fn new(id: BarrierId, required: usize) -> Self {
        Self {
            id,
            required,
            state: Mutex::new(BarrierState {
                arrived: 0,
                aborted: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Barrier identity
    pub fn id(&self) -> BarrierId {
        self.id
    }

    /// Number of arrivals required
    pub fn required(&self) -> usize {
        self.required
    }

    /// Number of arrivals so far
    pub fn arrived(&self) -> usize {
        self.state.lock().arrived
    }

    /// All required parties have arrived
    pub fn is_satisfied(&self) -> bool {
        self.state.lock().arrived >= self.required
    }

    /// Barrier has been aborted
    pub fn is_aborted(&self) -> bool {
        self.state.lock().aborted
    }

    /// Register one party without blocking
    ///
    /// The last required arrival releases every waiter.
    pub fn arrive(&self) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        if state.aborted {
            return Err(SyncError::Aborted { barrier: self.id });
        }
        if state.arrived == self.required {
            return Err(SyncError::Overfilled {
                barrier: self.id,
                required: self.required,
            });
        }
        state.arrived += 1;
        if state.arrived == self.required {
            self.released.notify_all();
        }
        Ok(())
    }

    /// Block until every required party has arrived
    ///
    /// With `timeout = None` the wait is unbounded; abort still wakes it.
    pub fn wait(&self, timeout: Option<Duration>) -> Result<(), SyncError> {
        let start = Instant::now();
        let deadline = timeout.map(|limit| start + limit);
        let mut state = self.state.lock();

        loop {
            if let Some(result) = self.settled(&state) {
                return result;
            }

            match deadline {
                None => self.released.wait(&mut state),
                Some(deadline) => {
                    if self.released.wait_until(&mut state, deadline).timed_out() {
                        return self.settled(&state).unwrap_or(Err(SyncError::Timeout {
                            barrier: self.id,
                            arrived: state.arrived,
                            required: self.required,
                            waited: start.elapsed(),
                        }));
                    }
                }
            }
        }
    }

    /// Arrive, then wait for the remaining parties
    pub fn arrive_and_wait(&self, timeout: Option<Duration>) -> Result<(), SyncError> {
        self.arrive()?;
        self.wait(timeout)
    }

    /// Fail every current and future `arrive`/`wait`
    pub fn abort(&self) {
        let mut state = self.state.lock();
        state.aborted = true;
        self.released.notify_all();
    }

    fn settled(&self, state: &BarrierState) -> Option<Result<(), SyncError>> {
        if state.aborted {
            Some(Err(SyncError::Aborted { barrier: self.id }))
        } else if state.arrived >= self.required {
            Some(Ok(()))
        } else {
            None
        }
    }
}
