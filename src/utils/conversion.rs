//! Numeric conversions between on-chain integers and float USD math.
//!
//! Counters are converted through BigDecimal so values beyond 2^53 keep
//! their precision until the final division by the token's scale.

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::{FromPrimitive, ToPrimitive};
use once_cell::sync::Lazy;

use crate::models::RawAmount;

// ============================================
// Counter to f64
// ============================================

/// Convert a raw token amount to f64 with decimal adjustment.
///
/// Returns 0.0 if the result is not representable as a finite f64.
///
/// # Example
/// ```ignore
/// let value = RawAmount::from(1_500_000u64);
/// let adjusted = raw_to_f64(&value, 6); // Returns 1.5
/// ```
pub fn raw_to_f64(value: &RawAmount, decimals: u8) -> f64 {
    raw_to_f64_safe(value, decimals).unwrap_or(0.0)
}

/// Convert a raw token amount to f64 with decimal adjustment, returning
/// None when the value cannot be represented as a finite f64.
pub fn raw_to_f64_safe(value: &RawAmount, decimals: u8) -> Option<f64> {
    let big_value = BigDecimal::from(BigInt::from_biguint(Sign::Plus, value.0.clone()));
    scaled_to_f64(big_value, decimals)
}

/// Convert a signed integer (counter difference) to f64 with decimal adjustment.
pub fn bigint_to_f64_safe(value: &BigInt, decimals: u8) -> Option<f64> {
    scaled_to_f64(BigDecimal::from(value.clone()), decimals)
}

fn scaled_to_f64(value: BigDecimal, decimals: u8) -> Option<f64> {
    let adjusted = if decimals == 0 { value } else { value / big_pow10(decimals) };

    let result = adjusted.to_f64()?;

    if result.is_finite() {
        Some(result)
    } else {
        None
    }
}

// ============================================
// f64 to Counter
// ============================================

/// Truncate a non-negative float amount (smallest units) to a raw amount.
///
/// Negative, NaN and infinite inputs map to zero.
pub fn f64_to_raw(value: f64) -> RawAmount {
    if !value.is_finite() || value <= 0.0 {
        return RawAmount::zero();
    }

    let Some(big_value) = BigDecimal::from_f64(value) else {
        return RawAmount::zero();
    };

    let (int, _) = big_value.with_scale(0).into_bigint_and_exponent();
    int.to_biguint().map(RawAmount).unwrap_or_default()
}

// ============================================
// Internal Helpers
// ============================================

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u8) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp as u32))
    }
}
