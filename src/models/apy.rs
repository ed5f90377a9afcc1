use serde::{Deserialize, Serialize};

use super::counter::RawAmount;

/// Number of daily slots in the rolling APY window.
pub const WEEK_DAYS: usize = 7;

/// Tick range a daily factor was estimated over. Both ends are null when no
/// estimate was made that day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickRange {
    pub tick_lower: Option<i32>,
    pub tick_upper: Option<i32>,
}

impl TickRange {
    pub fn new(tick_lower: i32, tick_upper: i32) -> Self {
        Self {
            tick_lower: Some(tick_lower),
            tick_upper: Some(tick_upper),
        }
    }
}

/// Rolling seven-day yield state of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyApyState {
    pub apy: f64,
    pub weekly_factor: [f64; WEEK_DAYS],
    pub weekly_range: [TickRange; WEEK_DAYS],
    /// Token X locked in the active range when the last factor was estimated
    #[serde(rename = "tokenXamount", default)]
    pub token_x_amount: RawAmount,
    /// Volume (token X units) the last factor was estimated from
    #[serde(default)]
    pub volume_x: f64,
}

impl WeeklyApyState {
    /// Zeroed state: apy 0, all factors 0, no ranges.
    pub fn empty() -> Self {
        Self {
            apy: 0.0,
            weekly_factor: [0.0; WEEK_DAYS],
            weekly_range: [TickRange::default(); WEEK_DAYS],
            token_x_amount: RawAmount::zero(),
            volume_x: 0.0,
        }
    }

    /// Range of the most recent daily factor.
    pub fn latest_range(&self) -> TickRange {
        self.weekly_range[WEEK_DAYS - 1]
    }
}

impl Default for WeeklyApyState {
    fn default() -> Self {
        Self::empty()
    }
}

/// Persisted per-pool APY entry, overwritten every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApySnapshot {
    pub apy: f64,
    pub weekly_factor: [f64; WEEK_DAYS],
    pub weekly_range: [TickRange; WEEK_DAYS],
}

impl ApySnapshot {
    /// Prior state for the next estimate. Per-day amounts do not carry over.
    pub fn to_prior(&self) -> WeeklyApyState {
        WeeklyApyState {
            apy: self.apy,
            weekly_factor: self.weekly_factor,
            weekly_range: self.weekly_range,
            token_x_amount: RawAmount::zero(),
            volume_x: 0.0,
        }
    }
}

impl From<&WeeklyApyState> for ApySnapshot {
    fn from(state: &WeeklyApyState) -> Self {
        Self {
            apy: state.apy,
            weekly_factor: state.weekly_factor,
            weekly_range: state.weekly_range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveToken {
    pub address: String,
    pub ticker: String,
    pub decimals: u8,
}

/// Append-only APY history entry of a pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApyArchiveEntry {
    pub timestamp: i64,
    pub apy: f64,
    pub range: TickRange,
    pub weekly_factor: [f64; WEEK_DAYS],
    #[serde(rename = "tokenXAmount")]
    pub token_x_amount: RawAmount,
    pub volume_x: f64,
    pub token_x: ArchiveToken,
    pub token_y: ArchiveToken,
}
