//! Interest index model.
//!
//! Every collateral asset carries a multiplicative index that starts at 1.0 and
//! grows by `interest_per_period` once per `PERIOD_SECONDS`. Growth is applied
//! one period at a time with truncation after each step, so catching up N
//! periods in one call or in several smaller calls yields the same index.

use odra::casper_types::U256;
use crate::types::{one, PERIOD_SECONDS};

/// Outcome of applying owed periods to an index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexUpdate {
    /// Index after compounding
    pub index_price: U256,
    /// New last index time (seconds)
    pub last_index_time: u64,
}

/// Round a timestamp down to the start of its period
pub fn align_to_period(timestamp_secs: u64) -> u64 {
    timestamp_secs - timestamp_secs % PERIOD_SECONDS
}

/// Number of whole periods elapsed since `last_index_time`
pub fn owed_cycles(last_index_time: u64, now_secs: u64) -> u64 {
    if now_secs <= last_index_time {
        return 0;
    }
    (now_secs - last_index_time) / PERIOD_SECONDS
}

/// Multiply `index` by `interest_per_period` `cycles` times, truncating each step.
pub fn compound_index(index: U256, interest_per_period: U256, cycles: u64) -> U256 {
    let scale = one();
    let mut value = index;
    for _ in 0..cycles {
        value = value * interest_per_period / scale;
    }
    value
}

/// Apply `cycles` periods to an index last updated at `last_index_time`.
///
/// Callers are responsible for checking `cycles` against `owed_cycles`.
pub fn advance_index(
    index: U256,
    interest_per_period: U256,
    last_index_time: u64,
    cycles: u64,
) -> IndexUpdate {
    IndexUpdate {
        index_price: compound_index(index, interest_per_period, cycles),
        last_index_time: last_index_time + cycles * PERIOD_SECONDS,
    }
}

/// A growth factor must be strictly above 1.0
pub fn validate_interest_per_period(interest_per_period: U256) -> bool {
    interest_per_period > one()
}
