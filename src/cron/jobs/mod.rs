//! The three per-network jobs, run in this order:
//!
//! - [`pool_snapshots`] - counters and tick data into the snapshot history
//! - [`pool_apy`] - weekly APY state and archive from the tick history
//! - [`network_summary`] - network-wide rollup document

use std::future::Future;

use futures::{stream, StreamExt};

use crate::{
    config::{ReadMode, ReaderSettings},
    models::{PoolIdentity, TokenRegistry},
    store::JsonStore,
};

pub mod network_summary;
pub mod pool_apy;
pub mod pool_snapshots;

/// Inputs shared by the jobs of one network run.
pub struct JobContext<'a, R, P> {
    pub network: &'a str,
    pub reader: &'a R,
    pub oracle: &'a P,
    pub store: &'a JsonStore,
    pub registry: &'a TokenRegistry,
    pub reader_settings: &'a ReaderSettings,
    /// Day-aligned timestamp (ms) stamped on everything written this run.
    pub timestamp: i64,
}

/// Read every pool with `read`, sequentially with a delay between pools or
/// concurrently up to `max_in_flight`. Results keep the order of `pools`.
pub(crate) async fn for_each_pool<'p, T, F, Fut>(
    pools: &'p [PoolIdentity],
    settings: &ReaderSettings,
    read: F,
) -> Vec<T>
where
    F: Fn(&'p PoolIdentity) -> Fut,
    Fut: Future<Output = T>,
{
    // Futures are lazy: building them up front keeps the closure out of the
    // state held across awaits, so the job futures stay `Send`.
    let reads: Vec<Fut> = pools.iter().map(read).collect();

    match settings.mode {
        ReadMode::Sequential => {
            let mut results = Vec::with_capacity(reads.len());
            for (i, fut) in reads.into_iter().enumerate() {
                if i > 0 && settings.delay_ms > 0 {
                    tokio::time::sleep(settings.delay()).await;
                }
                results.push(fut.await);
            }
            results
        },
        ReadMode::Concurrent => {
            stream::iter(reads)
                .buffered(settings.max_in_flight.max(1))
                .collect()
                .await
        },
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory chain reader and price source for job tests.

    use anyhow::{anyhow, Result};
    use rustc_hash::{FxHashMap, FxHashSet};

    use crate::{
        models::{FeeTier, PoolIdentity, Tick, TokenMetadata, TokenRegistry},
        sources::{ChainReader, PriceSource},
        stats::{CounterPair, PoolCounters},
    };

    #[derive(Default)]
    pub struct FakeChain {
        pub pools: Vec<PoolIdentity>,
        pub counters: FxHashMap<String, PoolCounters>,
        pub ticks: FxHashMap<String, Vec<Tick>>,
        pub tick_index: FxHashMap<String, i32>,
        pub failing: FxHashSet<String>,
    }

    impl FakeChain {
        pub fn add_pool(&mut self, address: &str, x: &str, y: &str, fee: u128) {
            self.pools.push(PoolIdentity {
                address: address.to_string(),
                token_x: x.to_string(),
                token_y: y.to_string(),
                fee: FeeTier(fee),
            });
        }

        fn lookup<'a, T>(&self, map: &'a FxHashMap<String, T>, pool: &PoolIdentity) -> Result<&'a T> {
            if self.failing.contains(&pool.address) {
                return Err(anyhow!("rpc timeout for {}", pool.address));
            }
            map.get(&pool.address)
                .ok_or_else(|| anyhow!("no state for {}", pool.address))
        }
    }

    impl ChainReader for FakeChain {
        async fn list_pools(&self) -> Result<Vec<PoolIdentity>> {
            Ok(self.pools.clone())
        }

        async fn cumulative_volume(&self, pool: &PoolIdentity) -> Result<CounterPair> {
            Ok(self.lookup(&self.counters, pool)?.volume.clone())
        }

        async fn cumulative_liquidity(&self, pool: &PoolIdentity) -> Result<CounterPair> {
            Ok(self.lookup(&self.counters, pool)?.liquidity.clone())
        }

        async fn cumulative_fees(&self, pool: &PoolIdentity) -> Result<CounterPair> {
            Ok(self.lookup(&self.counters, pool)?.fees.clone())
        }

        async fn tick_set(&self, pool: &PoolIdentity) -> Result<Vec<Tick>> {
            Ok(self.lookup(&self.ticks, pool)?.clone())
        }

        async fn current_tick_index(&self, pool: &PoolIdentity) -> Result<i32> {
            Ok(*self.lookup(&self.tick_index, pool)?)
        }
    }

    pub struct FakePrices(pub FxHashMap<String, f64>);

    impl FakePrices {
        pub fn new(entries: &[(&str, f64)]) -> Self {
            Self(entries.iter().map(|(k, v)| (k.to_string(), *v)).collect())
        }
    }

    impl PriceSource for FakePrices {
        async fn prices_by_external_id(&self, ids: &[String]) -> Result<FxHashMap<String, f64>> {
            Ok(ids
                .iter()
                .filter_map(|id| self.0.get(id).map(|p| (id.clone(), *p)))
                .collect())
        }
    }

    /// Registry where every token's price id is its address.
    pub fn registry(tokens: &[(&str, u8)]) -> TokenRegistry {
        TokenRegistry::new(tokens.iter().map(|(address, decimals)| TokenMetadata {
            address: address.to_string(),
            ticker: address.to_uppercase(),
            decimals: *decimals,
            price_id: Some(address.to_string()),
        }))
    }
}
