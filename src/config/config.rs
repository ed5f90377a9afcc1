use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{
    models::{TokenMetadata, TokenRegistry},
    stats::RollupPolicy,
};

/// Token registry entry as written in `config.yaml`.
#[derive(Debug, Deserialize, Clone)]
pub struct TokenSettings {
    pub address: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub decimals: u8,
    /// Identifier the price providers quote this token under.
    #[serde(default)]
    pub price_id: Option<String>,
}

impl From<&TokenSettings> for TokenMetadata {
    fn from(t: &TokenSettings) -> Self {
        TokenMetadata {
            address: t.address.clone(),
            ticker: t.ticker.clone(),
            decimals: t.decimals,
            price_id: t.price_id.clone(),
        }
    }
}

/// One network target.
///
/// Every network keeps its documents in its own `data_dir`. The chain dump and
/// the price quote files are written by external fetchers.
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkSettings {
    pub name: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub data_dir: String,
    pub chain_dump: String,
    /// Primary price provider quotes (`{id: price}`).
    #[serde(default)]
    pub price_quotes: Option<String>,
    /// Secondary provider, wins over the primary on conflicting ids.
    #[serde(default)]
    pub price_overrides: Option<String>,
    #[serde(default)]
    pub tokens: Vec<TokenSettings>,
    #[serde(default = "default_tick_retention_days")]
    pub tick_retention_days: u32,
}

fn default_enabled() -> bool {
    true
}

fn default_tick_retention_days() -> u32 {
    30
}

impl NetworkSettings {
    pub fn registry(&self) -> TokenRegistry {
        TokenRegistry::new(self.tokens.iter().map(TokenMetadata::from))
    }
}

/// Network rollup tuning.
#[derive(Debug, Deserialize, Clone)]
pub struct StatsSettings {
    /// Fee tiers (percent) left out of the pool list, totals and plots.
    #[serde(default = "default_excluded_fee_tiers")]
    pub excluded_fee_tiers: Vec<f64>,
    /// Also leave excluded tiers out of per-token volume and TVL.
    #[serde(default)]
    pub exclude_tiers_from_token_rollups: bool,
    /// Number of trailing snapshots per pool in the plots.
    #[serde(default = "default_plot_window")]
    pub plot_window: usize,
}

fn default_excluded_fee_tiers() -> Vec<f64> {
    vec![0.001, 0.003]
}

fn default_plot_window() -> usize {
    30
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            excluded_fee_tiers: default_excluded_fee_tiers(),
            exclude_tiers_from_token_rollups: false,
            plot_window: default_plot_window(),
        }
    }
}

impl StatsSettings {
    pub fn rollup_policy(&self) -> RollupPolicy {
        RollupPolicy {
            excluded_fee_tiers: self.excluded_fee_tiers.clone(),
            exclude_tiers_from_token_rollups: self.exclude_tiers_from_token_rollups,
            plot_window: self.plot_window,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    /// One pool at a time with `delay_ms` between pools.
    Sequential,
    /// Up to `max_in_flight` pools read at once.
    Concurrent,
}

/// How pools are read from the chain reader.
#[derive(Debug, Deserialize, Clone)]
pub struct ReaderSettings {
    #[serde(default = "default_read_mode")]
    pub mode: ReadMode,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_read_mode() -> ReadMode {
    ReadMode::Sequential
}

fn default_delay_ms() -> u64 {
    200
}

fn default_max_in_flight() -> usize {
    8
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            mode: default_read_mode(),
            delay_ms: default_delay_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl ReaderSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PriceSettings {
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for PriceSettings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl PriceSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Scheduled mode. Without it the binary runs every job once and exits.
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleSettings {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 {
    86_400
}

/// Root application configuration.
///
/// Loaded from `config.yaml` at startup, with `POOLSNAP__*` environment
/// variables overriding individual keys (e.g. `POOLSNAP__READER__DELAY_MS`).
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub networks: Vec<NetworkSettings>,
    #[serde(default)]
    pub stats: StatsSettings,
    #[serde(default)]
    pub reader: ReaderSettings,
    #[serde(default)]
    pub prices: PriceSettings,
    #[serde(default)]
    pub schedule: Option<ScheduleSettings>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .add_source(
                Environment::with_prefix("POOLSNAP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Self::from_config(s)
    }

    pub fn from_config(config: Config) -> Result<Self, ConfigError> {
        config.try_deserialize()
    }

    pub fn enabled_networks(&self) -> impl Iterator<Item = &NetworkSettings> {
        self.networks.iter().filter(|n| n.enabled)
    }
}
