//! Weekly APY estimation from two tick snapshots.
//!
//! A day's yield factor is the fee income of the observed volume divided by
//! the value locked around the current price. Seven daily factors are kept
//! in a rolling window and compounded into an annual yield:
//!
//! ```text
//! apy = (Π (1 + factor_i)) ^ (365 / 7) - 1
//! ```

use num_bigint::BigInt;
use thiserror::Error;

use crate::{
    models::{FeeTier, Tick, TickRange, TickSnapshot, WeeklyApyState, WEEK_DAYS},
    utils::{
        bigint_to_f64_safe, f64_to_raw, range_amounts, tick_to_price, validate_daily_factor,
        DAY_MS,
    },
};

/// Decimal places of the on-chain liquidity fixed-point value.
pub const LIQUIDITY_DECIMALS: u8 = 6;

/// Failures of a single pool's estimate. The caller resets that pool's
/// state and carries on with the others.
#[derive(Debug, Error, PartialEq)]
pub enum ApyError {
    #[error("negative or non-finite volume delta (x: {x}, y: {y})")]
    InvalidVolume { x: f64, y: f64 },
    #[error("no initialized tick at or below current tick {0}")]
    NoLowerTick(i32),
    #[error("no initialized tick above current tick {0}")]
    NoUpperTick(i32),
    #[error("initialized tick {0} has no gross liquidity")]
    EmptyTick(i32),
    #[error("active liquidity at tick {0} is negative or not representable")]
    InvalidLiquidity(i32),
    #[error("implausible daily factor {0}")]
    ImplausibleFactor(f64),
}

/// Inputs of one estimate.
#[derive(Debug, Clone, Copy)]
pub struct ApyInput<'a> {
    pub fee: FeeTier,
    /// Volume of token X traded between the two snapshots (smallest units)
    pub volume_x_delta: f64,
    /// Volume of token Y traded between the two snapshots (smallest units)
    pub volume_y_delta: f64,
    pub ticks_previous: &'a TickSnapshot,
    pub ticks_current: &'a TickSnapshot,
    pub prior: &'a WeeklyApyState,
    pub current_tick_index: i32,
}

/// Advance the weekly window of a pool by one day.
///
/// Returns a zeroed state without advancing when tick data is missing or the
/// snapshots are less than 24h apart.
pub fn compute_weekly_apy(input: &ApyInput<'_>) -> Result<WeeklyApyState, ApyError> {
    let previous = input.ticks_previous;
    let current = input.ticks_current;

    if previous.ticks.is_empty() || current.ticks.is_empty() {
        return Ok(WeeklyApyState::empty());
    }

    let elapsed_ms = current.timestamp - previous.timestamp;
    if elapsed_ms < DAY_MS {
        return Ok(WeeklyApyState::empty());
    }

    let (volume_x, volume_y) = (input.volume_x_delta, input.volume_y_delta);
    if !volume_x.is_finite() || !volume_y.is_finite() || volume_x < 0.0 || volume_y < 0.0 {
        return Err(ApyError::InvalidVolume {
            x: volume_x,
            y: volume_y,
        });
    }

    let tick = input.current_tick_index;
    let range = active_range(&previous.ticks, &current.ticks, tick)?;

    // Depth that stayed in place for the whole interval
    let depth_before = active_liquidity(&previous.ticks, tick)?;
    let depth = depth_before.min(active_liquidity(&current.ticks, tick)?);

    let (lower, upper) = (range.tick_lower.unwrap_or(tick), range.tick_upper.unwrap_or(tick));
    let (amount_x, amount_y) = range_amounts(depth, tick, lower, upper);

    let price = tick_to_price(tick);
    let locked_in_x = amount_x + amount_y / price;
    let volume_in_x = volume_x + volume_y / price;

    let daily_factor = if locked_in_x > 0.0 {
        let fees_in_x = volume_in_x * input.fee.fraction();
        let factor = fees_in_x / locked_in_x * (DAY_MS as f64 / elapsed_ms as f64);
        validate_daily_factor(factor).ok_or(ApyError::ImplausibleFactor(factor))?
    } else {
        0.0
    };

    let weekly_factor = shift_window(&input.prior.weekly_factor, daily_factor);
    let weekly_range = shift_window(&input.prior.weekly_range, range);

    Ok(WeeklyApyState {
        apy: compound_apy(&weekly_factor),
        weekly_factor,
        weekly_range,
        token_x_amount: f64_to_raw(amount_x),
        volume_x,
    })
}

/// Annualize seven daily factors by geometric compounding.
pub fn compound_apy(weekly_factor: &[f64; WEEK_DAYS]) -> f64 {
    let weekly_growth: f64 = weekly_factor.iter().map(|f| 1.0 + f).product();
    weekly_growth.powf(365.0 / WEEK_DAYS as f64) - 1.0
}

/// Pick the snapshot pair an estimate runs on: the latest snapshot and the
/// most recent one at least 24h older. Snapshots must be sorted by time.
pub fn select_tick_pair(snapshots: &[TickSnapshot]) -> Option<(&TickSnapshot, &TickSnapshot)> {
    let current = snapshots.last()?;
    let first = snapshots.first()?;
    if current.timestamp - first.timestamp < DAY_MS {
        return None;
    }

    let previous = snapshots
        .iter()
        .take_while(|s| current.timestamp - s.timestamp >= DAY_MS)
        .last()
        .unwrap_or(first);

    Some((previous, current))
}

/// Drop the oldest slot and append `value`.
fn shift_window<T: Copy, const N: usize>(window: &[T; N], value: T) -> [T; N] {
    std::array::from_fn(|i| if i + 1 < N { window[i + 1] } else { value })
}

/// Range the interval's trading happened in.
///
/// Ticks whose fee-growth-outside counters changed between the snapshots were
/// crossed; the range spans them and the initialized ticks around `current`.
fn active_range(
    previous: &[Tick],
    current: &[Tick],
    current_tick: i32,
) -> Result<TickRange, ApyError> {
    let below = current
        .iter()
        .filter(|t| t.index <= current_tick)
        .max_by_key(|t| t.index)
        .ok_or(ApyError::NoLowerTick(current_tick))?;
    let above = current
        .iter()
        .filter(|t| t.index > current_tick)
        .min_by_key(|t| t.index)
        .ok_or(ApyError::NoUpperTick(current_tick))?;

    for boundary in [below, above] {
        if boundary.liquidity_gross.is_zero() {
            return Err(ApyError::EmptyTick(boundary.index));
        }
    }

    let crossed = current.iter().filter(|t| {
        previous.iter().any(|p| {
            p.index == t.index
                && (p.fee_growth_outside_x != t.fee_growth_outside_x
                    || p.fee_growth_outside_y != t.fee_growth_outside_y)
        })
    });

    let (lower, upper) = crossed.fold((below.index, above.index), |(lo, hi), t| {
        (lo.min(t.index), hi.max(t.index))
    });

    Ok(TickRange::new(lower, upper))
}

/// Liquidity active at `current_tick`: signed liquidity changes of every
/// initialized tick at or below it.
fn active_liquidity(ticks: &[Tick], current_tick: i32) -> Result<f64, ApyError> {
    let sum = ticks
        .iter()
        .filter(|t| t.index <= current_tick)
        .fold(BigInt::default(), |acc, t| {
            let change = BigInt::from(t.liquidity_change.0.clone());
            if t.sign {
                acc + change
            } else {
                acc - change
            }
        });

    if sum < BigInt::default() {
        return Err(ApyError::InvalidLiquidity(current_tick));
    }

    bigint_to_f64_safe(&sum, LIQUIDITY_DECIMALS).ok_or(ApyError::InvalidLiquidity(current_tick))
}
