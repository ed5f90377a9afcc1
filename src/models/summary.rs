use serde::{Deserialize, Serialize};

/// Network-wide headline value with its day-over-day change in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueWithChange {
    pub value: f64,
    pub change: f64,
}

/// One point of a network-wide time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeData {
    pub timestamp: i64,
    pub value: f64,
}

/// Per-token rollup across every pool holding the token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatsData {
    pub address: String,
    pub price: f64,
    pub volume24: f64,
    pub tvl: f64,
}

/// Per-pool entry of the public pool list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub pool_address: String,
    pub token_x: String,
    pub token_y: String,
    /// Fee tier in percent
    pub fee: f64,
    pub apy: f64,
    pub volume24: f64,
    pub tvl: f64,
    pub liquidity_x: f64,
    pub liquidity_y: f64,
}

/// Document consumed by the front-end overview page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSummary {
    pub volume24: ValueWithChange,
    pub tvl24: ValueWithChange,
    pub fees24: ValueWithChange,
    pub tokens_data: Vec<TokenStatsData>,
    pub pools_data: Vec<PoolSummary>,
    pub volume_plot: Vec<TimeData>,
    pub liquidity_plot: Vec<TimeData>,
    pub fees_plot: Vec<TimeData>,
}
