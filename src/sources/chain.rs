use std::{future::Future, path::Path};

use anyhow::{anyhow, Context, Result};
use log::info;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::{
    models::{CumulativeCounter, FeeTier, PoolIdentity, Tick},
    stats::{CounterPair, PoolCounters},
};

/// Read access to on-chain pool state.
///
/// Every per-pool read may fail on its own; callers decide whether a failure
/// is fatal for the run or only for that pool.
pub trait ChainReader {
    fn list_pools(&self) -> impl Future<Output = Result<Vec<PoolIdentity>>> + Send;

    fn cumulative_volume(
        &self,
        pool: &PoolIdentity,
    ) -> impl Future<Output = Result<CounterPair>> + Send;

    fn cumulative_liquidity(
        &self,
        pool: &PoolIdentity,
    ) -> impl Future<Output = Result<CounterPair>> + Send;

    fn cumulative_fees(
        &self,
        pool: &PoolIdentity,
    ) -> impl Future<Output = Result<CounterPair>> + Send;

    fn tick_set(&self, pool: &PoolIdentity) -> impl Future<Output = Result<Vec<Tick>>> + Send;

    fn current_tick_index(&self, pool: &PoolIdentity) -> impl Future<Output = Result<i32>> + Send;
}

/// Read the three counter pairs of a pool.
pub async fn read_pool_counters<R: ChainReader>(
    reader: &R,
    pool: &PoolIdentity,
) -> Result<PoolCounters> {
    let volume = reader.cumulative_volume(pool).await?;
    let liquidity = reader.cumulative_liquidity(pool).await?;
    let fees = reader.cumulative_fees(pool).await?;

    Ok(PoolCounters {
        volume,
        liquidity,
        fees,
    })
}

// ============================================
// Chain dump reader
// ============================================

#[derive(Debug, Clone, Deserialize)]
struct DumpPair {
    x: CumulativeCounter,
    y: CumulativeCounter,
}

impl From<&DumpPair> for CounterPair {
    fn from(pair: &DumpPair) -> Self {
        CounterPair::new(pair.x.clone(), pair.y.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DumpPool {
    address: String,
    token_x: String,
    token_y: String,
    fee: FeeTier,
    #[serde(default)]
    current_tick_index: Option<i32>,
    #[serde(default)]
    volume: Option<DumpPair>,
    #[serde(default)]
    liquidity: Option<DumpPair>,
    #[serde(default)]
    fees: Option<DumpPair>,
    #[serde(default)]
    ticks: Option<Vec<Tick>>,
}

#[derive(Debug, Deserialize)]
struct ChainDump {
    pools: Vec<DumpPool>,
}

/// Chain reader over a JSON dump of market state written by an external
/// fetcher. Fields the fetcher could not read are absent, which surfaces as
/// a read error for that pool only.
pub struct ChainDumpReader {
    pools: Vec<PoolIdentity>,
    state: FxHashMap<String, DumpPool>,
}

impl ChainDumpReader {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read chain dump {}", path.display()))?;
        let reader = Self::from_slice(&raw)
            .with_context(|| format!("Malformed chain dump {}", path.display()))?;

        info!(
            "Loaded chain dump {} with {} pools",
            path.display(),
            reader.pools.len()
        );
        Ok(reader)
    }

    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        let dump: ChainDump = serde_json::from_slice(raw)?;

        let pools = dump
            .pools
            .iter()
            .map(|p| PoolIdentity {
                address: p.address.clone(),
                token_x: p.token_x.clone(),
                token_y: p.token_y.clone(),
                fee: p.fee,
            })
            .collect();
        let state = dump
            .pools
            .into_iter()
            .map(|p| (p.address.clone(), p))
            .collect();

        Ok(Self { pools, state })
    }

    fn pool(&self, pool: &PoolIdentity) -> Result<&DumpPool> {
        self.state
            .get(&pool.address)
            .ok_or_else(|| anyhow!("Pool {} not present in chain dump", pool.address))
    }

    fn pair(
        &self,
        pool: &PoolIdentity,
        what: &str,
        field: impl Fn(&DumpPool) -> Option<&DumpPair>,
    ) -> Result<CounterPair> {
        let entry = self.pool(pool)?;
        field(entry)
            .map(CounterPair::from)
            .ok_or_else(|| anyhow!("Pool {} has no {} counters", pool.address, what))
    }
}

impl ChainReader for ChainDumpReader {
    async fn list_pools(&self) -> Result<Vec<PoolIdentity>> {
        Ok(self.pools.clone())
    }

    async fn cumulative_volume(&self, pool: &PoolIdentity) -> Result<CounterPair> {
        self.pair(pool, "volume", |p| p.volume.as_ref())
    }

    async fn cumulative_liquidity(&self, pool: &PoolIdentity) -> Result<CounterPair> {
        self.pair(pool, "liquidity", |p| p.liquidity.as_ref())
    }

    async fn cumulative_fees(&self, pool: &PoolIdentity) -> Result<CounterPair> {
        self.pair(pool, "fee", |p| p.fees.as_ref())
    }

    async fn tick_set(&self, pool: &PoolIdentity) -> Result<Vec<Tick>> {
        self.pool(pool)?
            .ticks
            .clone()
            .ok_or_else(|| anyhow!("Pool {} has no tick data", pool.address))
    }

    async fn current_tick_index(&self, pool: &PoolIdentity) -> Result<i32> {
        self.pool(pool)?
            .current_tick_index
            .ok_or_else(|| anyhow!("Pool {} has no current tick index", pool.address))
    }
}
