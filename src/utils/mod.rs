//! Utility functions for the snapshot pipeline.
//!
//! This module is organized into focused submodules:
//!
//! - [`conversion`] - Raw counter conversions (BigUint, BigInt, f64)
//! - [`tick_math`] - Tick to price and liquidity amount calculations
//! - [`validation`] - Sanity bounds for prices and yields
//! - [`clock`] - Day-aligned run timestamps

mod clock;
mod conversion;
mod tick_math;
mod validation;

// ============================================
// Re-exports
// ============================================

// Clock
pub use clock::{day_timestamp, DAY_MS, HOUR_MS};

// Conversion utilities
pub use conversion::{bigint_to_f64_safe, f64_to_raw, raw_to_f64, raw_to_f64_safe};

// Tick math utilities
pub use tick_math::{range_amounts, tick_to_price, tick_to_sqrt_price, MAX_TICK, MIN_TICK};

// Validation utilities
pub use validation::{
    finite_or_zero, validate_daily_factor, validate_usd_price, MAX_DAILY_FACTOR,
    MAX_TOKEN_USD_PRICE,
};
