//! Job to write the network summary document (`full.json`).

use anyhow::{Context, Result};
use log::info;

use crate::{
    sources::{resolve_token_prices, ChainReader, PriceSource},
    stats::{rollup_network, RollupPolicy},
};

use super::JobContext;

const JOB_NAME: &str = "network_summary";

/// Rolls the stored snapshot history up into headline values, pool and token
/// tables and plots.
pub async fn run<R, P>(ctx: &JobContext<'_, R, P>, policy: &RollupPolicy) -> Result<()>
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
    let history = ctx.store.load_snapshots().await?;
    let apy = ctx.store.load_apy().await?;
    let prices = resolve_token_prices(ctx.oracle, &ctx.registry.tokens()).await?;

    let summary = rollup_network(&history, &pools, &apy, &prices, policy);
    ctx.store.save_summary(&summary).await?;

    info!(
        "Completed {} job for {} in {:?} ({} pools, {} tokens, volume24 {:.2})",
        JOB_NAME,
        ctx.network,
        start.elapsed(),
        summary.pools_data.len(),
        summary.tokens_data.len(),
        summary.volume24.value
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ReaderSettings,
        cron::jobs::testing::{registry, FakeChain, FakePrices},
        models::{PoolStatsData, RawAmount, Snapshot, TokenStat},
        store::{JsonStore, SnapshotDocument},
    };

    const DAY: i64 = 1_700_049_600_000;

    fn history(volume_usd: f64, liquidity_usd: f64) -> PoolStatsData {
        let reg = registry(&[("usdc", 6), ("sol", 9)]);
        let mut pool = PoolStatsData::new(
            reg.metadata("usdc").to_token_ref(),
            reg.metadata("sol").to_token_ref(),
        );
        pool.append(Snapshot {
            timestamp: DAY,
            volume_x: TokenStat::new(RawAmount::zero(), volume_usd),
            liquidity_x: TokenStat::new(RawAmount::zero(), liquidity_usd),
            ..Default::default()
        });
        pool
    }

    #[tokio::test]
    async fn test_writes_summary_without_excluded_tier() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path());

        let mut doc = SnapshotDocument::new();
        doc.insert("pool-a".to_string(), history(30.0, 100.0));
        doc.insert("pool-b".to_string(), history(50.0, 200.0));
        store.save_snapshots(&doc).await.unwrap();

        let mut reader = FakeChain::default();
        // 0.3%
        reader.add_pool("pool-a", "usdc", "sol", 3_000_000_000);
        // 0.001%, excluded by default
        reader.add_pool("pool-b", "usdc", "sol", 10_000_000);

        let oracle = FakePrices::new(&[("usdc", 1.0), ("sol", 150.0)]);
        let reg = registry(&[("usdc", 6), ("sol", 9)]);
        let settings = ReaderSettings::default();
        let ctx = JobContext {
            network: "devnet",
            reader: &reader,
            oracle: &oracle,
            store: &store,
            registry: &reg,
            reader_settings: &settings,
            timestamp: DAY,
        };
        run(&ctx, &RollupPolicy::default()).await.unwrap();

        let summary = store.load_summary().await.unwrap().unwrap();
        assert_eq!(summary.volume24.value, 30.0);
        assert_eq!(summary.tvl24.value, 100.0);
        assert_eq!(summary.pools_data.len(), 1);
        assert_eq!(summary.pools_data[0].pool_address, "pool-a");

        let usdc = summary
            .tokens_data
            .iter()
            .find(|t| t.address == "usdc")
            .unwrap();
        assert_eq!(usdc.price, 1.0);
        assert_eq!(usdc.volume24, 80.0);
    }
}
