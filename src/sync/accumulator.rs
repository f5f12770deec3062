//! Lock-guarded per-node running sum

use parking_lot::Mutex;
use thiserror::Error;

/// Addition would leave the `i64` range
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("sum overflow: {total} does not fit in i64")]
pub struct AccumulatorOverflow {
    /// Exact total that was rejected
    pub total: i128,
}

/// Per-node accumulator; the mutex is the node's lock
#[derive(Debug, Default)]
pub struct Accumulator {
    value: Mutex<i64>,
}

impl Accumulator {
    /// Create accumulator at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value
    pub fn get(&self) -> i64 {
        *self.value.lock()
    }

    /// Add one value under the lock
    pub fn add(&self, addend: i64) -> Result<i64, AccumulatorOverflow> {
        self.add_all(std::iter::once(addend))
    }

    /// Add every value under a single acquisition of the lock
    ///
    /// The sum is exact: only a final total outside the `i64` range is an
    /// overflow, whatever the order of the addends. Nothing is stored then.
    pub fn add_all<I>(&self, addends: I) -> Result<i64, AccumulatorOverflow>
    where
        I: IntoIterator<Item = i64>,
    {
        let mut value = self.value.lock();
        // Fewer than 2^64 i64 terms always fit in i128
        let total = addends
            .into_iter()
            .fold(i128::from(*value), |total, addend| total + i128::from(addend));
        *value = i64::try_from(total).map_err(|_| AccumulatorOverflow { total })?;
        Ok(*value)
    }
}
