//! Job to append today's snapshot of every pool.
//!
//! Reads cumulative volume/liquidity/fee counters through the chain reader,
//! values them against the previous snapshot and appends the result to the
//! snapshot history. Tick data is appended to each pool's tick history for
//! the APY job.

use anyhow::{Context, Result};
use log::{info, warn};
use rustc_hash::FxHashMap;

use crate::{
    models::{PoolIdentity, PoolStatsData, Tick, TickSnapshot, TokenRegistry},
    sources::{read_pool_counters, resolve_token_prices, ChainReader, PriceSource},
    stats::{build_snapshot, fallback_snapshot, PoolCounters, TokenValuation},
    utils::DAY_MS,
};

use super::{for_each_pool, JobContext};

const JOB_NAME: &str = "pool_snapshots";

struct PoolRead {
    counters: Result<PoolCounters>,
    ticks: Result<Vec<Tick>>,
}

async fn read_pool<R: ChainReader>(reader: &R, pool: &PoolIdentity) -> PoolRead {
    PoolRead {
        counters: read_pool_counters(reader, pool).await,
        ticks: reader.tick_set(pool).await,
    }
}

fn valuation(
    registry: &TokenRegistry,
    prices: &FxHashMap<String, f64>,
    address: &str,
) -> TokenValuation {
    TokenValuation {
        price_usd: prices.get(address).copied().unwrap_or(0.0),
        decimals: registry.decimals(address),
    }
}

/// Takes today's snapshot of every listed pool.
///
/// A pool whose counters cannot be read keeps its previous counters with zero
/// deltas. The snapshot history must already exist; the run fails otherwise.
pub async fn run<R, P>(ctx: &JobContext<'_, R, P>, tick_retention_days: u32) -> Result<()>
where
    R: ChainReader + Sync,
    P: PriceSource + Sync,
{
    info!("Starting {} job for {}...", JOB_NAME, ctx.network);

    let start = std::time::Instant::now();

    let mut history = ctx.store.load_snapshots().await?;
    let pools = ctx
        .reader
        .list_pools()
        .await
        .context("Failed to list pools")?;
    let prices = resolve_token_prices(ctx.oracle, &ctx.registry.tokens()).await?;

    let reads = for_each_pool(&pools, ctx.reader_settings, |pool| {
        read_pool(ctx.reader, pool)
    })
    .await;

    let mut fallbacks = 0;
    let mut tick_snapshots = Vec::new();

    for (pool, read) in pools.iter().zip(reads) {
        let entry = history.entry(pool.address.clone()).or_insert_with(|| {
            PoolStatsData::new(
                ctx.registry.metadata(&pool.token_x).to_token_ref(),
                ctx.registry.metadata(&pool.token_y).to_token_ref(),
            )
        });

        let snapshot = match &read.counters {
            Ok(counters) => build_snapshot(
                ctx.timestamp,
                counters,
                entry.last(),
                valuation(ctx.registry, &prices, &pool.token_x),
                valuation(ctx.registry, &prices, &pool.token_y),
            ),
            Err(e) => {
                warn!(
                    "[{}] Failed to read counters of pool {}, keeping previous values: {:#}",
                    JOB_NAME, pool.address, e
                );
                fallbacks += 1;
                fallback_snapshot(ctx.timestamp, entry.last())
            },
        };

        if !entry.append(snapshot) {
            warn!(
                "[{}] Pool {} already has a snapshot newer than {}, skipping",
                JOB_NAME, pool.address, ctx.timestamp
            );
        }

        match (read.counters, read.ticks) {
            (Ok(counters), Ok(ticks)) => tick_snapshots.push((
                pool.address.clone(),
                TickSnapshot {
                    timestamp: ctx.timestamp,
                    volume_x: counters.volume.x,
                    volume_y: counters.volume.y,
                    ticks,
                },
            )),
            (_, Err(e)) => warn!(
                "[{}] Failed to read ticks of pool {}: {:#}",
                JOB_NAME, pool.address, e
            ),
            (Err(_), Ok(_)) => {},
        }
    }

    ctx.store.save_snapshots(&history).await?;

    for (address, snapshot) in &tick_snapshots {
        let mut ticks = match ctx.store.load_ticks(address).await {
            Ok(ticks) => ticks,
            Err(e) => {
                warn!(
                    "[{}] Failed to load tick history of pool {}, starting over: {:#}",
                    JOB_NAME, address, e
                );
                Vec::new()
            },
        };
        push_tick_snapshot(&mut ticks, snapshot.clone());
        prune_tick_history(&mut ticks, ctx.timestamp, tick_retention_days);
        ctx.store.save_ticks(address, &ticks).await?;
    }

    info!(
        "Completed {} job for {} in {:?} ({} pools, {} fallbacks, {} tick snapshots)",
        JOB_NAME,
        ctx.network,
        start.elapsed(),
        pools.len(),
        fallbacks,
        tick_snapshots.len()
    );
    Ok(())
}

/// Append a tick snapshot; a rerun on the same day replaces that day's entry.
fn push_tick_snapshot(history: &mut Vec<TickSnapshot>, snapshot: TickSnapshot) {
    match history.last_mut() {
        Some(last) if last.timestamp == snapshot.timestamp => *last = snapshot,
        Some(last) if last.timestamp > snapshot.timestamp => {},
        _ => history.push(snapshot),
    }
}

/// Drop tick snapshots older than the retention window. 0 keeps everything.
fn prune_tick_history(history: &mut Vec<TickSnapshot>, now: i64, retention_days: u32) {
    if retention_days == 0 {
        return;
    }
    let cutoff = now - i64::from(retention_days) * DAY_MS;
    history.retain(|s| s.timestamp >= cutoff);
}
