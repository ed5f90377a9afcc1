//! Tick math for concentrated-liquidity pools.
//!
//! Price at a tick is `1.0001^tick` (token Y per token X). Calculations run
//! in f64 on the normalized square-root price; they feed an estimate, not
//! on-chain settlement.

// ============================================
// Precomputed Constants
// ============================================

/// Largest tick the protocol initializes.
pub const MAX_TICK: i32 = 221_818;

/// Smallest tick the protocol initializes.
pub const MIN_TICK: i32 = -MAX_TICK;

// 1/sqrt(1.0001)^(2^i) = (1.0001)^(-0.5 * 2^i) for i = 0..18
// Bit decomposition of |tick| following the TickMath.sol approach.
const TICK_MULTIPLIERS: [f64; 18] = [
    0.9999500037496876, // 1.0001^(-0.5)
    0.9999000099990001, // 1.0001^(-1)
    0.9998000299960005, // 1.0001^(-2)
    0.9996000999800035, // 1.0001^(-4)
    0.9992003598800331, // 1.0001^(-8)
    0.9984013591843877, // 1.0001^(-16)
    0.9968052740212325, // 1.0001^(-32)
    0.9936207543165446, // 1.0001^(-64)
    0.9872822034085791, // 1.0001^(-128)
    0.9747261491672988, // 1.0001^(-256)
    0.9500910658705113, // 1.0001^(-512)
    0.9026730334469643, // 1.0001^(-1024)
    0.8148186053123443, // 1.0001^(-2048)
    0.6639293595631539, // 1.0001^(-4096)
    0.4408021944899397, // 1.0001^(-8192)
    0.1943065746671466, // 1.0001^(-16384)
    0.0377550449588794, // 1.0001^(-32768)
    0.0014254434198470, // 1.0001^(-65536)
];

// ============================================
// Tick to Price Conversion
// ============================================

/// Square root of the price at `tick`: sqrt(1.0001^tick).
///
/// Ticks outside [MIN_TICK, MAX_TICK] are clamped.
#[inline]
pub fn tick_to_sqrt_price(tick: i32) -> f64 {
    let clamped_tick = tick.clamp(MIN_TICK, MAX_TICK);
    let abs_tick = clamped_tick.unsigned_abs();

    let ratio = TICK_MULTIPLIERS
        .iter()
        .enumerate()
        .filter(|(bit, _)| abs_tick & (1 << bit) != 0)
        .fold(1.0_f64, |acc, (_, m)| acc * m);

    // Table holds reciprocals, flip for positive ticks
    if clamped_tick > 0 {
        1.0 / ratio
    } else {
        ratio
    }
}

/// Price (token Y per token X) at `tick`.
#[inline]
pub fn tick_to_price(tick: i32) -> f64 {
    let sqrt_price = tick_to_sqrt_price(tick);
    sqrt_price * sqrt_price
}

// ============================================
// Liquidity Amount Calculations
// ============================================

/// Token X held by `liquidity` between two square-root prices.
/// amount_x = L * (1/sqrt_a - 1/sqrt_b)
fn amount_x_from_liquidity(liquidity: f64, sqrt_a: f64, sqrt_b: f64) -> f64 {
    let (sqrt_a, sqrt_b) = if sqrt_a > sqrt_b { (sqrt_b, sqrt_a) } else { (sqrt_a, sqrt_b) };

    if sqrt_a <= 0.0 {
        return 0.0;
    }

    let result = liquidity * (1.0 / sqrt_a - 1.0 / sqrt_b);
    if result.is_finite() && result > 0.0 {
        result
    } else {
        0.0
    }
}

/// Token Y held by `liquidity` between two square-root prices.
/// amount_y = L * (sqrt_b - sqrt_a)
fn amount_y_from_liquidity(liquidity: f64, sqrt_a: f64, sqrt_b: f64) -> f64 {
    let (sqrt_a, sqrt_b) = if sqrt_a > sqrt_b { (sqrt_b, sqrt_a) } else { (sqrt_a, sqrt_b) };

    let result = liquidity * (sqrt_b - sqrt_a);
    if result.is_finite() && result > 0.0 {
        result
    } else {
        0.0
    }
}

/// Token amounts (x, y) locked by `liquidity` over [tick_lower, tick_upper)
/// with the pool at `current_tick`.
///
/// Below the range everything is token X, above it everything is token Y.
pub fn range_amounts(
    liquidity: f64,
    current_tick: i32,
    tick_lower: i32,
    tick_upper: i32,
) -> (f64, f64) {
    if tick_lower >= tick_upper {
        return (0.0, 0.0);
    }

    if !liquidity.is_finite() || liquidity <= 0.0 {
        return (0.0, 0.0);
    }

    let sqrt_lower = tick_to_sqrt_price(tick_lower);
    let sqrt_upper = tick_to_sqrt_price(tick_upper);

    if current_tick < tick_lower {
        (amount_x_from_liquidity(liquidity, sqrt_lower, sqrt_upper), 0.0)
    } else if current_tick >= tick_upper {
        (0.0, amount_y_from_liquidity(liquidity, sqrt_lower, sqrt_upper))
    } else {
        let sqrt_current = tick_to_sqrt_price(current_tick);
        (
            amount_x_from_liquidity(liquidity, sqrt_current, sqrt_upper),
            amount_y_from_liquidity(liquidity, sqrt_lower, sqrt_current),
        )
    }
}
