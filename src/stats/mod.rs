//! Delta/stats engine and network aggregator.
//!
//! - [`delta`] - 24h USD deltas from cumulative counters
//! - [`apy`] - rolling weekly APY from tick snapshots
//! - [`aggregate`] - network summary fold

pub mod aggregate;
pub mod apy;
pub mod delta;

pub use aggregate::{percent_change, rollup_network, RollupPolicy};
pub use apy::{compound_apy, compute_weekly_apy, select_tick_pair, ApyError, ApyInput};
pub use delta::{
    build_snapshot, compute_usd_delta24, fallback_snapshot, CounterPair, PoolCounters,
    TokenValuation,
};
