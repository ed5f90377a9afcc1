//! Job to advance every pool's weekly APY window by one day.
//!
//! Estimates run on the pool's tick history: the latest tick snapshot and the
//! most recent one at least 24h older. The current weekly state overwrites
//! `pool_apy.json`; one entry per pool and day is appended to the archive.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    models::{
        ApyArchiveEntry, ApySnapshot, ArchiveToken, PoolIdentity, RawAmount, TickSnapshot,
        TokenRegistry, WeeklyApyState,
    },
    sources::{ChainReader, PriceSource},
    stats::{compute_weekly_apy, select_tick_pair, ApyInput},
    utils::bigint_to_f64_safe,
};

use super::{for_each_pool, JobContext};

const JOB_NAME: &str = "pool_apy";

/// Estimate one pool's next weekly state. Any failure resets the pool.
fn estimate(
    pool: &PoolIdentity,
    history: &[TickSnapshot],
    prior: &WeeklyApyState,
    current_tick_index: Result<i32>,
) -> WeeklyApyState {
    let Some((previous, current)) = select_tick_pair(history) else {
        info!(
            "[{}] Pool {} has less than 24h of tick history",
            JOB_NAME, pool.address
        );
        return WeeklyApyState::empty();
    };

    let current_tick_index = match current_tick_index {
        Ok(index) => index,
        Err(e) => {
            warn!(
                "[{}] Failed to read current tick of pool {}: {:#}",
                JOB_NAME, pool.address, e
            );
            return WeeklyApyState::empty();
        },
    };

    let volume_delta = |now: &RawAmount, before: &RawAmount| {
        bigint_to_f64_safe(&now.signed_sub(before), 0).unwrap_or(f64::NAN)
    };

    let input = ApyInput {
        fee: pool.fee,
        volume_x_delta: volume_delta(&current.volume_x, &previous.volume_x),
        volume_y_delta: volume_delta(&current.volume_y, &previous.volume_y),
        ticks_previous: previous,
        ticks_current: current,
        prior,
        current_tick_index,
    };

    match compute_weekly_apy(&input) {
        Ok(state) => state,
        Err(e) => {
            warn!(
                "[{}] APY estimate failed for pool {}, resetting: {}",
                JOB_NAME, pool.address, e
            );
            WeeklyApyState::empty()
        },
    }
}

fn archive_token(registry: &TokenRegistry, address: &str) -> ArchiveToken {
    let meta = registry.metadata(address);
    ArchiveToken {
        address: meta.address,
        ticker: meta.ticker,
        decimals: meta.decimals,
    }
}

fn archive_entry(
    pool: &PoolIdentity,
    state: &WeeklyApyState,
    registry: &TokenRegistry,
    timestamp: i64,
) -> ApyArchiveEntry {
    ApyArchiveEntry {
        timestamp,
        apy: state.apy,
        range: state.latest_range(),
        weekly_factor: state.weekly_factor,
        token_x_amount: state.token_x_amount.clone(),
        volume_x: state.volume_x,
        token_x: archive_token(registry, &pool.token_x),
        token_y: archive_token(registry, &pool.token_y),
    }
}

/// Advances the weekly APY window of every listed pool.
pub async fn run<R, P>(ctx: &JobContext<'_, R, P>) -> Result<()>
where
    R: ChainReader + Sync,
    P: PriceSource + Sync,
{
    info!("Starting {} job for {}...", JOB_NAME, ctx.network);

    let start = std::time::Instant::now();

    let pools = ctx
        .reader
        .list_pools()
        .await
        .context("Failed to list pools")?;
    let mut apy = ctx.store.load_apy().await?;
    let mut archive = ctx.store.load_apy_archive().await?;

    let tick_indexes = for_each_pool(&pools, ctx.reader_settings, |pool| {
        ctx.reader.current_tick_index(pool)
    })
    .await;

    let mut estimated = 0;
    for (pool, tick_index) in pools.iter().zip(tick_indexes) {
        let prior = apy
            .get(&pool.address)
            .map(ApySnapshot::to_prior)
            .unwrap_or_default();

        let state = match ctx.store.load_ticks(&pool.address).await {
            Ok(history) => estimate(pool, &history, &prior, tick_index),
            Err(e) => {
                warn!(
                    "[{}] Failed to load tick history of pool {}, resetting: {:#}",
                    JOB_NAME, pool.address, e
                );
                WeeklyApyState::empty()
            },
        };
        if state != WeeklyApyState::empty() {
            estimated += 1;
        }

        let entries = archive.entry(pool.address.clone()).or_default();
        let entry = archive_entry(pool, &state, ctx.registry, ctx.timestamp);
        match entries.last_mut() {
            Some(last) if last.timestamp == entry.timestamp => *last = entry,
            _ => entries.push(entry),
        }

        apy.insert(pool.address.clone(), ApySnapshot::from(&state));
    }

    ctx.store.save_apy(&apy).await?;
    ctx.store.save_apy_archive(&archive).await?;

    info!(
        "Completed {} job for {} in {:?} ({} pools, {} estimated)",
        JOB_NAME,
        ctx.network,
        start.elapsed(),
        pools.len(),
        estimated
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReaderSettings,
        cron::jobs::testing::{registry, FakeChain, FakePrices},
        models::{Tick, TickRange, WEEK_DAYS},
        store::JsonStore,
        utils::DAY_MS,
    };

    const DAY_1: i64 = 1_700_049_600_000;
    const DAY_2: i64 = DAY_1 + DAY_MS;
    const LIQUIDITY: u128 = 1_000_000_000_000;

    fn tick(index: i32, sign: bool) -> Tick {
        Tick {
            index,
            sign,
            liquidity_change: RawAmount::from(LIQUIDITY),
            liquidity_gross: RawAmount::from(LIQUIDITY),
            ..Default::default()
        }
    }

    fn tick_snapshot(timestamp: i64, volume_x: u64) -> TickSnapshot {
        TickSnapshot {
            timestamp,
            volume_x: RawAmount::from(volume_x),
            volume_y: RawAmount::zero(),
            ticks: vec![tick(-100, true), tick(100, false)],
        }
    }

    fn chain() -> FakeChain {
        let mut chain = FakeChain::default();
        chain.add_pool("pool-a", "usdc", "sol", 3_000_000_000);
        chain.add_pool("pool-b", "usdc", "sol", 3_000_000_000);
        chain.tick_index.insert("pool-a".to_string(), 0);
        chain.tick_index.insert("pool-b".to_string(), 0);
        chain
    }

    async fn run_day(store: &JsonStore, reader: &FakeChain, timestamp: i64) {
        let oracle = FakePrices::new(&[]);
        let reg = registry(&[("usdc", 6), ("sol", 9)]);
        let settings = ReaderSettings::default();
        let ctx = JobContext {
            network: "devnet",
            reader,
            oracle: &oracle,
            store,
            registry: &reg,
            reader_settings: &settings,
            timestamp,
        };
        run(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_estimates_from_tick_history() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store
            .save_ticks(
                "pool-a",
                &[tick_snapshot(DAY_1, 0), tick_snapshot(DAY_2, 10_000)],
            )
            .await
            .unwrap();

        run_day(&store, &chain(), DAY_2).await;

        let apy = store.load_apy().await.unwrap();
        let state = &apy["pool-a"];
        assert!(state.apy > 0.0);
        assert!(state.weekly_factor[WEEK_DAYS - 1] > 0.0);
        assert_eq!(state.weekly_range[WEEK_DAYS - 1], TickRange::new(-100, 100));

        // No tick history: cold start
        assert_eq!(apy["pool-b"].apy, 0.0);

        let archive = store.load_apy_archive().await.unwrap();
        let entry = &archive["pool-a"][0];
        assert_eq!(entry.timestamp, DAY_2);
        assert_eq!(entry.range, TickRange::new(-100, 100));
        assert_eq!(entry.volume_x, 10_000.0);
        assert_eq!(entry.token_x.ticker, "USDC");
        assert_eq!(entry.token_y.decimals, 9);
    }

    #[tokio::test]
    async fn test_failed_estimate_resets_only_that_pool() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let history = [tick_snapshot(DAY_1, 0), tick_snapshot(DAY_2, 10_000)];
        store.save_ticks("pool-a", &history).await.unwrap();
        store.save_ticks("pool-b", &history).await.unwrap();

        let mut reader = chain();
        // Price moved past every initialized tick
        reader.tick_index.insert("pool-b".to_string(), 500);

        run_day(&store, &reader, DAY_2).await;

        let apy = store.load_apy().await.unwrap();
        assert!(apy["pool-a"].apy > 0.0);
        assert_eq!(apy["pool-b"], ApySnapshot::from(&WeeklyApyState::empty()));
    }

    #[tokio::test]
    async fn test_corrupt_tick_history_resets_only_that_pool() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        store
            .save_ticks(
                "pool-a",
                &[tick_snapshot(DAY_1, 0), tick_snapshot(DAY_2, 10_000)],
            )
            .await
            .unwrap();
        std::fs::write(dir.path().join("ticks/pool-b.json"), r#"[{"timestamp": 1}]"#).unwrap();

        run_day(&store, &chain(), DAY_2).await;

        let apy = store.load_apy().await.unwrap();
        assert!(apy["pool-a"].apy > 0.0);
        assert_eq!(apy["pool-b"], ApySnapshot::from(&WeeklyApyState::empty()));

        let archive = store.load_apy_archive().await.unwrap();
        assert_eq!(archive["pool-b"].len(), 1);
        assert_eq!(archive["pool-b"][0].apy, 0.0);
    }

    #[tokio::test]
    async fn test_rerun_same_day_replaces_archive_entry() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let reader = chain();

        run_day(&store, &reader, DAY_1).await;
        run_day(&store, &reader, DAY_1).await;
        run_day(&store, &reader, DAY_2).await;

        let archive = store.load_apy_archive().await.unwrap();
        let days: Vec<i64> = archive["pool-a"].iter().map(|e| e.timestamp).collect();
        assert_eq!(days, vec![DAY_1, DAY_2]);
    }
}
