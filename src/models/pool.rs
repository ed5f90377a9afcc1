use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Decimal places of the on-chain fee tier fixed-point value.
pub const FEE_TIER_DECIMALS: u32 = 12;

/// Pool trading fee as a fixed-point fraction with 12 decimals.
///
/// `1_000_000_000` (1e9) is 0.001 = 0.1%.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeeTier(pub u128);

impl FeeTier {
    /// Fee as a plain fraction (0.003 for a 0.3% pool).
    pub fn fraction(&self) -> f64 {
        self.0 as f64 / 10f64.powi(FEE_TIER_DECIMALS as i32)
    }

    /// Fee as a percentage (0.3 for a 0.3% pool). This is the unit the
    /// front-end displays and the unit excluded tiers are configured in.
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 10f64.powi(FEE_TIER_DECIMALS as i32 - 2)
    }

    /// Whether this tier equals one of `tiers` (percent values).
    pub fn is_one_of(&self, tiers: &[f64]) -> bool {
        let percent = self.percent();
        tiers.iter().any(|t| (percent - t).abs() < 1e-9)
    }
}

impl Serialize for FeeTier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for FeeTier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Num(u64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => s
                .trim()
                .parse::<u128>()
                .map(FeeTier)
                .map_err(serde::de::Error::custom),
            Repr::Num(n) => Ok(FeeTier(n as u128)),
        }
    }
}

/// Immutable identity of a pool as listed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolIdentity {
    pub address: String,
    pub token_x: String,
    pub token_y: String,
    pub fee: FeeTier,
}

/// Token reference stored alongside a pool's snapshot history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRef {
    pub address: String,
    pub decimals: u8,
}

/// Static token metadata (registry entry).
///
/// `price_id` is the identifier the price providers quote the token under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    pub address: String,
    #[serde(default)]
    pub ticker: String,
    #[serde(default)]
    pub decimals: u8,
    #[serde(default)]
    pub price_id: Option<String>,
}

impl TokenMetadata {
    /// Metadata for a token missing from the registry.
    pub fn unknown(address: &str) -> Self {
        Self {
            address: address.to_string(),
            ticker: String::new(),
            decimals: 0,
            price_id: None,
        }
    }

    pub fn to_token_ref(&self) -> TokenRef {
        TokenRef {
            address: self.address.clone(),
            decimals: self.decimals,
        }
    }
}

/// Token metadata keyed by token address.
#[derive(Debug, Clone, Default)]
pub struct TokenRegistry {
    tokens: FxHashMap<String, TokenMetadata>,
}

impl TokenRegistry {
    pub fn new(tokens: impl IntoIterator<Item = TokenMetadata>) -> Self {
        Self {
            tokens: tokens
                .into_iter()
                .map(|t| (t.address.clone(), t))
                .collect(),
        }
    }

    pub fn get(&self, address: &str) -> Option<&TokenMetadata> {
        self.tokens.get(address)
    }

    /// Registry entry, or [`TokenMetadata::unknown`] for unlisted tokens.
    pub fn metadata(&self, address: &str) -> TokenMetadata {
        self.get(address)
            .cloned()
            .unwrap_or_else(|| TokenMetadata::unknown(address))
    }

    pub fn decimals(&self, address: &str) -> u8 {
        self.get(address).map(|t| t.decimals).unwrap_or(0)
    }

    /// All entries sorted by address.
    pub fn tokens(&self) -> Vec<TokenMetadata> {
        let mut tokens: Vec<TokenMetadata> = self.tokens.values().cloned().collect();
        tokens.sort_by(|a, b| a.address.cmp(&b.address));
        tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fee_tier_units() {
        // 0.3%
        let fee = FeeTier(3_000_000_000);
        assert!((fee.fraction() - 0.003).abs() < 1e-15);
        assert!((fee.percent() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_fee_tier_exclusion_match() {
        // 0.001% tier
        let fee = FeeTier(10_000_000);
        assert!(fee.is_one_of(&[0.001, 0.003]));
        assert!(!FeeTier(3_000_000_000).is_one_of(&[0.001, 0.003]));
    }

    #[test]
    fn test_fee_tier_from_string() {
        let fee: FeeTier = serde_json::from_str("\"10000000\"").unwrap();
        assert_eq!(fee, FeeTier(10_000_000));
    }

    #[test]
    fn test_registry_falls_back_to_unknown() {
        let registry = TokenRegistry::new(vec![TokenMetadata {
            address: "usdc".to_string(),
            ticker: "USDC".to_string(),
            decimals: 6,
            price_id: Some("usd-coin".to_string()),
        }]);

        assert_eq!(registry.decimals("usdc"), 6);
        assert_eq!(registry.metadata("usdc").ticker, "USDC");
        assert_eq!(registry.metadata("other"), TokenMetadata::unknown("other"));
        assert_eq!(registry.decimals("other"), 0);
    }
}
