//! Sanity bounds for prices and derived yields.
//!
//! These bounds catch feed and conversion errors. A value outside them is
//! treated as missing rather than propagated into the published documents.

// ============================================
// Validation Constants
// ============================================

/// Maximum reasonable token price in USD.
/// No legitimate token costs more than $10 million per unit.
pub const MAX_TOKEN_USD_PRICE: f64 = 1e7;

/// Maximum plausible daily yield factor (100% of the locked value per day).
/// Anything above comes from a near-empty range or a bad volume delta.
pub const MAX_DAILY_FACTOR: f64 = 1.0;

// ============================================
// Validation Helpers
// ============================================

/// Validate a USD price is within reasonable bounds.
/// Returns the price if valid, 0.0 if invalid.
#[inline]
pub fn validate_usd_price(price: f64) -> f64 {
    if price >= 0.0 && price.is_finite() && price <= MAX_TOKEN_USD_PRICE {
        price
    } else {
        0.0
    }
}

/// Validate a daily yield factor.
/// Returns Some(factor) if it is finite, non-negative and plausible.
#[inline]
pub fn validate_daily_factor(factor: f64) -> Option<f64> {
    if factor.is_finite() && (0.0..=MAX_DAILY_FACTOR).contains(&factor) {
        Some(factor)
    } else {
        None
    }
}

/// Replace NaN and infinities by 0.0 before a value is serialized.
#[inline]
pub fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
