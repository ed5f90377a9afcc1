use serde::{Deserialize, Serialize};

use super::counter::{CumulativeCounter, RawAmount};

/// Initialized price tick of a concentrated-liquidity pool.
///
/// `liquidity_change` is applied with `sign` when the price crosses the tick
/// upwards (true = added). Growth counters are raw on-chain fixed-point values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub index: i32,
    pub sign: bool,
    pub liquidity_change: RawAmount,
    pub liquidity_gross: RawAmount,
    #[serde(default)]
    pub sqrt_price: RawAmount,
    #[serde(default)]
    pub fee_growth_outside_x: RawAmount,
    #[serde(default)]
    pub fee_growth_outside_y: RawAmount,
    #[serde(default)]
    pub seconds_per_liquidity_outside: RawAmount,
}

/// Full tick set of a pool at one point in time, with the cumulative volume
/// counters read alongside it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickSnapshot {
    pub timestamp: i64,
    pub volume_x: CumulativeCounter,
    pub volume_y: CumulativeCounter,
    #[serde(default)]
    pub ticks: Vec<Tick>,
}
