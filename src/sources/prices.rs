use std::{future::Future, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use log::{info, warn};
use moka::future::Cache;
use rustc_hash::FxHashMap;

use crate::{models::TokenMetadata, utils::validate_usd_price};

/// USD quotes keyed by a provider-side asset identifier.
pub trait PriceSource {
    /// Prices for the requested ids. Ids the provider does not know are
    /// absent from the result.
    fn prices_by_external_id(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<FxHashMap<String, f64>>> + Send;
}

/// Quotes from a JSON object `{ "<id>": <price>, ... }` that an external
/// fetcher keeps up to date. The file is re-read on every request.
#[derive(Debug, Clone)]
pub struct QuoteFileSource {
    path: Option<PathBuf>,
}

impl QuoteFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Source that knows no prices (provider not configured).
    pub fn disabled() -> Self {
        Self { path: None }
    }
}

impl PriceSource for QuoteFileSource {
    async fn prices_by_external_id(&self, ids: &[String]) -> Result<FxHashMap<String, f64>> {
        let Some(path) = &self.path else {
            return Ok(FxHashMap::default());
        };

        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read price quotes {}", path.display()))?;
        let quotes: FxHashMap<String, f64> = serde_json::from_slice(&raw)
            .with_context(|| format!("Malformed price quotes {}", path.display()))?;

        Ok(ids
            .iter()
            .filter_map(|id| quotes.get(id).map(|p| (id.clone(), validate_usd_price(*p))))
            .collect())
    }
}

/// Two providers merged, the second taking precedence on conflicting ids.
///
/// The primary provider is required; a failing secondary only loses its
/// overrides for this request.
pub struct MergedPriceOracle<A, B> {
    primary: A,
    overrides: B,
}

impl<A, B> MergedPriceOracle<A, B> {
    pub fn new(primary: A, overrides: B) -> Self {
        Self { primary, overrides }
    }
}

impl<A, B> PriceSource for MergedPriceOracle<A, B>
where
    A: PriceSource + Sync,
    B: PriceSource + Sync,
{
    async fn prices_by_external_id(&self, ids: &[String]) -> Result<FxHashMap<String, f64>> {
        let mut prices = self.primary.prices_by_external_id(ids).await?;

        match self.overrides.prices_by_external_id(ids).await {
            Ok(overrides) => prices.extend(overrides),
            Err(e) => warn!("Price overrides unavailable, using primary quotes only: {:#}", e),
        }

        Ok(prices)
    }
}

/// TTL cache in front of a price source.
///
/// Scheduled runs share one oracle, so quotes fetched by one job are reused
/// by the next within the TTL.
pub struct CachedPriceOracle<S> {
    inner: S,
    cache: Cache<String, f64>,
}

impl<S> CachedPriceOracle<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }
}

impl<S> PriceSource for CachedPriceOracle<S>
where
    S: PriceSource + Sync,
{
    async fn prices_by_external_id(&self, ids: &[String]) -> Result<FxHashMap<String, f64>> {
        let mut prices = FxHashMap::default();
        let mut missing = Vec::new();

        for id in ids {
            match self.cache.get(id).await {
                Some(price) => {
                    prices.insert(id.clone(), price);
                },
                None => missing.push(id.clone()),
            }
        }

        if missing.is_empty() {
            return Ok(prices);
        }

        let fetched = self.inner.prices_by_external_id(&missing).await?;
        for (id, price) in fetched {
            self.cache.insert(id.clone(), price).await;
            prices.insert(id, price);
        }

        Ok(prices)
    }
}

/// Resolve USD prices for registry tokens, keyed by token address.
///
/// Tokens without a price id, or unknown to every provider, are priced 0.0.
pub async fn resolve_token_prices<P: PriceSource>(
    oracle: &P,
    tokens: &[TokenMetadata],
) -> Result<FxHashMap<String, f64>> {
    let mut ids: Vec<String> = tokens.iter().filter_map(|t| t.price_id.clone()).collect();
    ids.sort();
    ids.dedup();

    let quotes = oracle.prices_by_external_id(&ids).await?;

    let prices: FxHashMap<String, f64> = tokens
        .iter()
        .map(|t| {
            let price = t
                .price_id
                .as_ref()
                .and_then(|id| quotes.get(id))
                .copied()
                .unwrap_or(0.0);
            (t.address.clone(), price)
        })
        .collect();

    info!(
        "Resolved prices for {}/{} tokens",
        prices.values().filter(|p| **p > 0.0).count(),
        tokens.len()
    );
    Ok(prices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        prices: FxHashMap<String, f64>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(entries: &[(&str, f64)]) -> Self {
            Self {
                prices: entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PriceSource for Fixed {
        async fn prices_by_external_id(&self, ids: &[String]) -> Result<FxHashMap<String, f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ids
                .iter()
                .filter_map(|id| self.prices.get(id).map(|p| (id.clone(), *p)))
                .collect())
        }
    }

    struct Failing;

    impl PriceSource for Failing {
        async fn prices_by_external_id(&self, _ids: &[String]) -> Result<FxHashMap<String, f64>> {
            anyhow::bail!("provider down")
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_second_provider_takes_precedence() {
        let oracle = MergedPriceOracle::new(
            Fixed::new(&[("sol", 100.0), ("usdc", 1.0)]),
            Fixed::new(&[("sol", 101.5), ("snd", 0.2)]),
        );
        let prices = oracle
            .prices_by_external_id(&ids(&["sol", "usdc", "snd"]))
            .await
            .unwrap();
        assert_eq!(prices["sol"], 101.5);
        assert_eq!(prices["usdc"], 1.0);
        assert_eq!(prices["snd"], 0.2);
    }

    #[tokio::test]
    async fn test_failing_override_keeps_primary() {
        let oracle = MergedPriceOracle::new(Fixed::new(&[("sol", 100.0)]), Failing);
        let prices = oracle.prices_by_external_id(&ids(&["sol"])).await.unwrap();
        assert_eq!(prices["sol"], 100.0);

        let oracle = MergedPriceOracle::new(Failing, Fixed::new(&[("sol", 100.0)]));
        assert!(oracle.prices_by_external_id(&ids(&["sol"])).await.is_err());
    }

    #[tokio::test]
    async fn test_cache_serves_repeated_lookups() {
        let oracle = CachedPriceOracle::new(Fixed::new(&[("sol", 100.0)]), Duration::from_secs(60));

        let first = oracle.prices_by_external_id(&ids(&["sol"])).await.unwrap();
        let second = oracle.prices_by_external_id(&ids(&["sol"])).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(oracle.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_quote_file_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotes.json");
        std::fs::write(&path, r#"{"sol": 150.25, "bad": -3.0}"#).unwrap();

        let source = QuoteFileSource::new(&path);
        let prices = source
            .prices_by_external_id(&ids(&["sol", "bad", "missing"]))
            .await
            .unwrap();
        assert_eq!(prices["sol"], 150.25);
        assert_eq!(prices["bad"], 0.0);
        assert!(!prices.contains_key("missing"));

        let disabled = QuoteFileSource::disabled();
        assert!(disabled.prices_by_external_id(&ids(&["sol"])).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_token_prices_by_address() {
        let tokens = vec![
            TokenMetadata {
                address: "So111".to_string(),
                ticker: "SOL".to_string(),
                decimals: 9,
                price_id: Some("solana".to_string()),
            },
            TokenMetadata::unknown("Unpriced"),
        ];
        let prices = resolve_token_prices(&Fixed::new(&[("solana", 150.0)]), &tokens)
            .await
            .unwrap();
        assert_eq!(prices["So111"], 150.0);
        assert_eq!(prices["Unpriced"], 0.0);
    }
}
