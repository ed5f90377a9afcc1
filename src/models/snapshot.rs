use serde::{Deserialize, Serialize};

use super::{counter::CumulativeCounter, pool::TokenRef};

/// One cumulative counter and the USD value derived from it at observation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStat {
    #[serde(rename = "tokenBNFromBeginning")]
    pub token_bn_from_beginning: CumulativeCounter,
    pub usd_value24: f64,
}

impl TokenStat {
    pub fn new(counter: CumulativeCounter, usd_value24: f64) -> Self {
        Self {
            token_bn_from_beginning: counter,
            usd_value24,
        }
    }
}

/// Daily per-pool observation.
///
/// `timestamp` is in milliseconds, aligned to 12:00 UTC of the run day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub timestamp: i64,
    pub volume_x: TokenStat,
    pub volume_y: TokenStat,
    pub liquidity_x: TokenStat,
    pub liquidity_y: TokenStat,
    pub fee_x: TokenStat,
    pub fee_y: TokenStat,
}

impl Snapshot {
    pub fn volume_usd(&self) -> f64 {
        self.volume_x.usd_value24 + self.volume_y.usd_value24
    }

    pub fn liquidity_usd(&self) -> f64 {
        self.liquidity_x.usd_value24 + self.liquidity_y.usd_value24
    }

    pub fn fees_usd(&self) -> f64 {
        self.fee_x.usd_value24 + self.fee_y.usd_value24
    }
}

/// Snapshot history of a single pool, keyed by pool address in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStatsData {
    #[serde(default)]
    pub snapshots: Vec<Snapshot>,
    pub token_x: TokenRef,
    pub token_y: TokenRef,
}

impl PoolStatsData {
    pub fn new(token_x: TokenRef, token_y: TokenRef) -> Self {
        Self {
            snapshots: Vec::new(),
            token_x,
            token_y,
        }
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.snapshots.last()
    }

    /// Append a snapshot, keeping the history ordered by timestamp.
    ///
    /// Returns false (and leaves the history untouched) when the snapshot is
    /// older than the last recorded one.
    pub fn append(&mut self, snapshot: Snapshot) -> bool {
        if let Some(last) = self.snapshots.last() {
            if snapshot.timestamp < last.timestamp {
                return false;
            }
        }
        self.snapshots.push(snapshot);
        true
    }
}
