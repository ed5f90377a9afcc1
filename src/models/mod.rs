//! Data model of the snapshot documents.
//!
//! Field names follow the JSON layout the front-end reads (camelCase,
//! big integers as decimal strings).

mod apy;
mod counter;
mod pool;
mod snapshot;
mod summary;
mod tick;

pub use apy::{ApyArchiveEntry, ApySnapshot, ArchiveToken, TickRange, WeeklyApyState, WEEK_DAYS};
pub use counter::{CumulativeCounter, Observation, RawAmount};
pub use pool::{FeeTier, PoolIdentity, TokenMetadata, TokenRef, TokenRegistry, FEE_TIER_DECIMALS};
pub use snapshot::{PoolStatsData, Snapshot, TokenStat};
pub use summary::{NetworkSummary, PoolSummary, TimeData, TokenStatsData, ValueWithChange};
pub use tick::{Tick, TickSnapshot};
