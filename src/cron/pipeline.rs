//! One full run of a network: snapshots, APY, then the summary.

use anyhow::{Context, Result};
use log::info;

use crate::{
    config::{NetworkSettings, PriceSettings, Settings},
    sources::{CachedPriceOracle, ChainDumpReader, MergedPriceOracle, QuoteFileSource},
    store::JsonStore,
};

use super::jobs::{self, JobContext};

/// Price oracle of a network: primary quotes merged with overrides, cached.
pub type NetworkOracle = CachedPriceOracle<MergedPriceOracle<QuoteFileSource, QuoteFileSource>>;

pub fn build_oracle(network: &NetworkSettings, prices: &PriceSettings) -> NetworkOracle {
    let source = |path: &Option<String>| match path {
        Some(path) => QuoteFileSource::new(path),
        None => QuoteFileSource::disabled(),
    };

    CachedPriceOracle::new(
        MergedPriceOracle::new(
            source(&network.price_quotes),
            source(&network.price_overrides),
        ),
        prices.cache_ttl(),
    )
}

/// Run the three jobs of `network` in order, stamping everything with
/// `timestamp`. The first failing job aborts the run.
pub async fn run_network(
    settings: &Settings,
    network: &NetworkSettings,
    oracle: &NetworkOracle,
    timestamp: i64,
) -> Result<()> {
    let start = std::time::Instant::now();

    let reader = ChainDumpReader::load(&network.chain_dump).await?;
    let store = JsonStore::new(&network.data_dir);
    let registry = network.registry();

    let ctx = JobContext {
        network: &network.name,
        reader: &reader,
        oracle,
        store: &store,
        registry: &registry,
        reader_settings: &settings.reader,
        timestamp,
    };

    jobs::pool_snapshots::run(&ctx, network.tick_retention_days)
        .await
        .with_context(|| format!("pool_snapshots failed for {}", network.name))?;
    jobs::pool_apy::run(&ctx)
        .await
        .with_context(|| format!("pool_apy failed for {}", network.name))?;
    jobs::network_summary::run(&ctx, &settings.stats.rollup_policy())
        .await
        .with_context(|| format!("network_summary failed for {}", network.name))?;

    info!("Network {} done in {:?}", network.name, start.elapsed());
    Ok(())
}
