//! Network-wide rollup of per-pool snapshot histories.
//!
//! Each pool is first reduced to an immutable record; the summary is a fold
//! over those records.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::{
    models::{
        ApySnapshot, NetworkSummary, PoolIdentity, PoolStatsData, PoolSummary, Snapshot,
        TimeData, TokenStatsData, ValueWithChange,
    },
    utils::finite_or_zero,
};

/// Which pools feed which part of the summary.
#[derive(Debug, Clone, PartialEq)]
pub struct RollupPolicy {
    /// Fee tiers (percent) hidden from the pool list, totals and plots
    pub excluded_fee_tiers: Vec<f64>,
    /// Also drop pools of excluded tiers from the per-token rollups
    pub exclude_tiers_from_token_rollups: bool,
    /// Number of most recent snapshots per pool summed into the plots
    pub plot_window: usize,
}

impl Default for RollupPolicy {
    fn default() -> Self {
        Self {
            excluded_fee_tiers: vec![0.001, 0.003],
            exclude_tiers_from_token_rollups: false,
            plot_window: 30,
        }
    }
}

/// Per-pool input of the fold.
struct PoolRecord<'a> {
    address: &'a str,
    identity: &'a PoolIdentity,
    history: &'a PoolStatsData,
    excluded: bool,
    /// Last snapshot carries the network-wide latest timestamp
    is_current: bool,
}

impl PoolRecord<'_> {
    fn latest(&self) -> Option<&Snapshot> {
        self.history.last()
    }

    fn current(&self) -> Option<&Snapshot> {
        self.latest().filter(|_| self.is_current)
    }

    fn recent(&self, window: usize) -> &[Snapshot] {
        let snapshots = &self.history.snapshots;
        &snapshots[snapshots.len().saturating_sub(window)..]
    }
}

#[derive(Default, Clone, Copy)]
struct PlotPoint {
    volume: f64,
    liquidity: f64,
    fees: f64,
}

/// Fold per-pool histories into the network summary.
///
/// * `history` - snapshot document, keyed by pool address
/// * `pools` - pools currently listed on-chain; history entries for other
///   pools are ignored
/// * `apy` - latest APY per pool address
/// * `token_prices` - USD price per token address
pub fn rollup_network(
    history: &BTreeMap<String, PoolStatsData>,
    pools: &[PoolIdentity],
    apy: &BTreeMap<String, ApySnapshot>,
    token_prices: &FxHashMap<String, f64>,
    policy: &RollupPolicy,
) -> NetworkSummary {
    let listed: FxHashMap<&str, &PoolIdentity> =
        pools.iter().map(|p| (p.address.as_str(), p)).collect();

    let last_timestamp = history
        .iter()
        .filter(|(address, _)| listed.contains_key(address.as_str()))
        .filter_map(|(_, data)| data.last().map(|s| s.timestamp))
        .max();

    let records: Vec<PoolRecord<'_>> = history
        .iter()
        .filter_map(|(address, data)| {
            let identity = *listed.get(address.as_str())?;
            Some(PoolRecord {
                address,
                identity,
                history: data,
                excluded: identity.fee.is_one_of(&policy.excluded_fee_tiers),
                is_current: data.last().map(|s| s.timestamp) == last_timestamp,
            })
        })
        .collect();

    let pools_data = records
        .iter()
        .filter(|r| !r.excluded)
        .map(|r| pool_summary(r, apy))
        .collect();

    let tokens_data = token_rollups(&records, token_prices, policy);

    let plot = records
        .iter()
        .filter(|r| !r.excluded)
        .flat_map(|r| r.recent(policy.plot_window))
        .fold(BTreeMap::<i64, PlotPoint>::new(), |mut acc, snap| {
            let point = acc.entry(snap.timestamp).or_default();
            point.volume += snap.volume_usd();
            point.liquidity += snap.liquidity_usd();
            point.fees += snap.fees_usd();
            acc
        });

    let series = |value: fn(&PlotPoint) -> f64| -> Vec<TimeData> {
        plot.iter()
            .map(|(timestamp, point)| TimeData {
                timestamp: *timestamp,
                value: value(point),
            })
            .collect()
    };

    let volume_plot = series(|p| p.volume);
    let liquidity_plot = series(|p| p.liquidity);
    let fees_plot = series(|p| p.fees);

    NetworkSummary {
        volume24: headline(&volume_plot),
        tvl24: headline(&liquidity_plot),
        fees24: headline(&fees_plot),
        tokens_data,
        pools_data,
        volume_plot,
        liquidity_plot,
        fees_plot,
    }
}

/// Day-over-day change in percent.
///
/// Returns 0.0 when there is no previous value, the previous value is zero,
/// or the result is not finite.
pub fn percent_change(today: f64, yesterday: Option<f64>) -> f64 {
    match yesterday {
        Some(prev) if prev != 0.0 => finite_or_zero((today - prev) / prev * 100.0),
        _ => 0.0,
    }
}

fn headline(series: &[TimeData]) -> ValueWithChange {
    let mut recent = series.iter().rev().map(|p| p.value);
    let value = recent.next().unwrap_or(0.0);
    ValueWithChange {
        value,
        change: percent_change(value, recent.next()),
    }
}

fn pool_summary(record: &PoolRecord<'_>, apy: &BTreeMap<String, ApySnapshot>) -> PoolSummary {
    let identity = record.identity;
    let latest = record.latest();
    let current = record.current();

    PoolSummary {
        pool_address: record.address.to_string(),
        token_x: identity.token_x.clone(),
        token_y: identity.token_y.clone(),
        fee: identity.fee.percent(),
        apy: apy.get(record.address).map(|a| finite_or_zero(a.apy)).unwrap_or(0.0),
        volume24: current.map(Snapshot::volume_usd).unwrap_or(0.0),
        tvl: current.map(Snapshot::liquidity_usd).unwrap_or(0.0),
        liquidity_x: latest.map(|s| s.liquidity_x.usd_value24).unwrap_or(0.0),
        liquidity_y: latest.map(|s| s.liquidity_y.usd_value24).unwrap_or(0.0),
    }
}

fn token_rollups(
    records: &[PoolRecord<'_>],
    token_prices: &FxHashMap<String, f64>,
    policy: &RollupPolicy,
) -> Vec<TokenStatsData> {
    let mut tokens: BTreeMap<&str, TokenStatsData> = BTreeMap::new();

    let included = records
        .iter()
        .filter(|r| !(r.excluded && policy.exclude_tiers_from_token_rollups));

    for record in included {
        let latest = record.latest();
        let current = record.current();
        let sides = [
            (
                record.identity.token_x.as_str(),
                current.map(|s| s.volume_x.usd_value24),
                latest.map(|s| s.liquidity_x.usd_value24),
            ),
            (
                record.identity.token_y.as_str(),
                current.map(|s| s.volume_y.usd_value24),
                latest.map(|s| s.liquidity_y.usd_value24),
            ),
        ];

        for (address, volume, tvl) in sides {
            let entry = tokens.entry(address).or_insert_with(|| TokenStatsData {
                address: address.to_string(),
                price: token_prices.get(address).copied().unwrap_or(0.0),
                volume24: 0.0,
                tvl: 0.0,
            });
            entry.volume24 += volume.unwrap_or(0.0);
            entry.tvl += tvl.unwrap_or(0.0);
        }
    }

    tokens.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeeTier, RawAmount, TokenRef, TokenStat};

    // 0.001% and 0.003% in on-chain fixed point
    const TIER_0_001: FeeTier = FeeTier(10_000_000);
    const TIER_0_003: FeeTier = FeeTier(30_000_000);

    fn identity(address: &str, x: &str, y: &str, fee: FeeTier) -> PoolIdentity {
        PoolIdentity {
            address: address.to_string(),
            token_x: x.to_string(),
            token_y: y.to_string(),
            fee,
        }
    }

    fn stat(usd: f64) -> TokenStat {
        TokenStat::new(RawAmount::zero(), usd)
    }

    fn snap(timestamp: i64, volume_x: f64, liquidity_x: f64, fee_x: f64) -> Snapshot {
        Snapshot {
            timestamp,
            volume_x: stat(volume_x),
            liquidity_x: stat(liquidity_x),
            fee_x: stat(fee_x),
            ..Default::default()
        }
    }

    fn history(snapshots: Vec<Snapshot>) -> PoolStatsData {
        let token = |a: &str| TokenRef {
            address: a.to_string(),
            decimals: 0,
        };
        PoolStatsData {
            snapshots,
            token_x: token("x"),
            token_y: token("y"),
        }
    }

    fn two_pool_network() -> (BTreeMap<String, PoolStatsData>, Vec<PoolIdentity>) {
        let pools = vec![
            identity("pool-a", "usdc", "sol", TIER_0_001),
            identity("pool-b", "usdc", "eth", TIER_0_003),
        ];
        let mut hist = BTreeMap::new();
        hist.insert("pool-a".to_string(), history(vec![snap(1_000, 50.0, 100.0, 1.0)]));
        hist.insert("pool-b".to_string(), history(vec![snap(1_000, 30.0, 200.0, 2.0)]));
        (hist, pools)
    }

    fn policy(excluded: &[f64], token_flag: bool) -> RollupPolicy {
        RollupPolicy {
            excluded_fee_tiers: excluded.to_vec(),
            exclude_tiers_from_token_rollups: token_flag,
            plot_window: 30,
        }
    }

    fn token<'a>(summary: &'a NetworkSummary, address: &str) -> Option<&'a TokenStatsData> {
        summary.tokens_data.iter().find(|t| t.address == address)
    }

    #[test]
    fn test_excluded_tier_left_out_of_totals() {
        let (hist, pools) = two_pool_network();
        let summary = rollup_network(
            &hist,
            &pools,
            &BTreeMap::new(),
            &FxHashMap::default(),
            &policy(&[0.001], false),
        );

        assert_eq!(summary.volume24.value, 30.0);
        assert_eq!(summary.tvl24.value, 200.0);
        assert_eq!(summary.fees24.value, 2.0);
        assert_eq!(summary.pools_data.len(), 1);
        assert_eq!(summary.pools_data[0].pool_address, "pool-b");

        // token rollups still see the excluded pool
        assert_eq!(token(&summary, "usdc").unwrap().volume24, 80.0);
        assert_eq!(token(&summary, "sol").unwrap().volume24, 0.0);
        assert_eq!(token(&summary, "usdc").unwrap().tvl, 300.0);
    }

    #[test]
    fn test_global_exclusion_drops_token_contributions() {
        let (hist, pools) = two_pool_network();
        let summary = rollup_network(
            &hist,
            &pools,
            &BTreeMap::new(),
            &FxHashMap::default(),
            &policy(&[0.001], true),
        );

        assert_eq!(token(&summary, "usdc").unwrap().volume24, 30.0);
        assert!(token(&summary, "sol").is_none());
    }

    #[test]
    fn test_day_over_day_change() {
        let pools = vec![identity("pool", "a", "b", FeeTier(3_000_000_000))];
        let mut hist = BTreeMap::new();
        hist.insert(
            "pool".to_string(),
            history(vec![snap(1, 10.0, 0.0, 0.0), snap(2, 15.0, 0.0, 0.0)]),
        );

        let summary = rollup_network(
            &hist,
            &pools,
            &BTreeMap::new(),
            &FxHashMap::default(),
            &RollupPolicy::default(),
        );
        assert_eq!(summary.volume24.value, 15.0);
        assert_eq!(summary.volume24.change, 50.0);
        // liquidity stayed at zero both days
        assert_eq!(summary.tvl24.change, 0.0);
    }

    #[test]
    fn test_percent_change_clamps() {
        assert_eq!(percent_change(5.0, Some(0.0)), 0.0);
        assert_eq!(percent_change(5.0, None), 0.0);
        assert_eq!(percent_change(0.0, Some(0.0)), 0.0);
        assert_eq!(percent_change(5.0, Some(f64::NAN)), 0.0);
        assert_eq!(percent_change(5.0, Some(10.0)), -50.0);
    }

    #[test]
    fn test_stale_pool_has_no_volume() {
        let pools = vec![
            identity("fresh", "a", "b", FeeTier(3_000_000_000)),
            identity("stale", "a", "c", FeeTier(3_000_000_000)),
        ];
        let mut hist = BTreeMap::new();
        hist.insert("fresh".to_string(), history(vec![snap(2, 10.0, 1.0, 0.0)]));
        hist.insert("stale".to_string(), history(vec![snap(1, 99.0, 5.0, 0.0)]));

        let summary = rollup_network(
            &hist,
            &pools,
            &BTreeMap::new(),
            &FxHashMap::default(),
            &RollupPolicy::default(),
        );
        let stale = summary
            .pools_data
            .iter()
            .find(|p| p.pool_address == "stale")
            .unwrap();
        assert_eq!(stale.volume24, 0.0);
        assert_eq!(stale.liquidity_x, 5.0);
        assert_eq!(token(&summary, "a").unwrap().volume24, 10.0);
        assert_eq!(token(&summary, "a").unwrap().tvl, 6.0);
    }

    #[test]
    fn test_unlisted_pools_are_skipped() {
        let pools = vec![identity("listed", "a", "b", FeeTier(3_000_000_000))];
        let mut hist = BTreeMap::new();
        hist.insert("listed".to_string(), history(vec![snap(1, 1.0, 0.0, 0.0)]));
        hist.insert("gone".to_string(), history(vec![snap(5, 100.0, 0.0, 0.0)]));

        let summary = rollup_network(
            &hist,
            &pools,
            &BTreeMap::new(),
            &FxHashMap::default(),
            &RollupPolicy::default(),
        );
        assert_eq!(summary.pools_data.len(), 1);
        assert_eq!(summary.volume24.value, 1.0);
    }

    #[test]
    fn test_plots_use_recent_window_sorted() {
        let pools = vec![identity("pool", "a", "b", FeeTier(3_000_000_000))];
        let snapshots = (0..40).map(|i| snap(i, i as f64, 0.0, 0.0)).collect();
        let mut hist = BTreeMap::new();
        hist.insert("pool".to_string(), history(snapshots));

        let summary = rollup_network(
            &hist,
            &pools,
            &BTreeMap::new(),
            &FxHashMap::default(),
            &RollupPolicy::default(),
        );
        assert_eq!(summary.volume_plot.len(), 30);
        assert_eq!(summary.volume_plot[0].timestamp, 10);
        assert!(summary
            .volume_plot
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn test_rollup_is_deterministic() {
        let (hist, pools) = two_pool_network();
        let mut apy = BTreeMap::new();
        apy.insert(
            "pool-b".to_string(),
            ApySnapshot::from(&crate::models::WeeklyApyState::empty()),
        );
        let mut prices = FxHashMap::default();
        prices.insert("usdc".to_string(), 1.0);

        let first = rollup_network(&hist, &pools, &apy, &prices, &policy(&[0.001], false));
        let second = rollup_network(&hist, &pools, &apy, &prices, &policy(&[0.001], false));
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
        assert_eq!(token(&first, "usdc").unwrap().price, 1.0);
    }
}
