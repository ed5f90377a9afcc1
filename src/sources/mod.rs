//! External inputs: on-chain pool state and USD price quotes.

pub mod chain;
pub mod prices;

pub use chain::{read_pool_counters, ChainDumpReader, ChainReader};
pub use prices::{
    resolve_token_prices, CachedPriceOracle, MergedPriceOracle, PriceSource, QuoteFileSource,
};
