//! 24h USD deltas from cumulative on-chain counters.

use crate::{
    models::{CumulativeCounter, Observation, Snapshot, TokenStat},
    utils::{raw_to_f64, validate_usd_price},
};

/// USD value of the change of a cumulative counter since the previous observation.
///
/// `(current - previous) / 10^decimals * price`. Returns 0.0 on a cold start,
/// when the counter went backwards (reset), and for an invalid price.
pub fn compute_usd_delta24(
    current: &CumulativeCounter,
    observation: &Observation,
    price_usd: f64,
    decimals: u8,
) -> f64 {
    let previous = match observation {
        Observation::Cold => return 0.0,
        Observation::Warm(previous) => previous,
    };

    if current < previous {
        return 0.0;
    }

    let price = validate_usd_price(price_usd);
    if price == 0.0 {
        return 0.0;
    }

    let delta = current.saturating_sub(previous);
    raw_to_f64(&delta, decimals) * price
}

/// A pair of counters, one per pool token.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CounterPair {
    pub x: CumulativeCounter,
    pub y: CumulativeCounter,
}

impl CounterPair {
    pub fn new(x: CumulativeCounter, y: CumulativeCounter) -> Self {
        Self { x, y }
    }
}

/// Everything read from chain for one pool in one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolCounters {
    pub volume: CounterPair,
    pub liquidity: CounterPair,
    pub fees: CounterPair,
}

/// Price and scale of one pool token at aggregation time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenValuation {
    pub price_usd: f64,
    pub decimals: u8,
}

/// Build this run's snapshot from fresh counters.
///
/// Volume and fees are flows valued against the previous snapshot. Liquidity
/// is a level and is valued as a whole on every run.
pub fn build_snapshot(
    timestamp: i64,
    counters: &PoolCounters,
    previous: Option<&Snapshot>,
    x: TokenValuation,
    y: TokenValuation,
) -> Snapshot {
    let stat = |current: &CumulativeCounter, prev: Option<&TokenStat>, v: TokenValuation| {
        let observation = Observation::from_previous(prev.map(|s| &s.token_bn_from_beginning));
        TokenStat::new(
            current.clone(),
            compute_usd_delta24(current, &observation, v.price_usd, v.decimals),
        )
    };
    let level = |current: &CumulativeCounter, v: TokenValuation| {
        TokenStat::new(
            current.clone(),
            compute_usd_delta24(current, &Observation::zero_baseline(), v.price_usd, v.decimals),
        )
    };

    Snapshot {
        timestamp,
        volume_x: stat(&counters.volume.x, previous.map(|p| &p.volume_x), x),
        volume_y: stat(&counters.volume.y, previous.map(|p| &p.volume_y), y),
        liquidity_x: level(&counters.liquidity.x, x),
        liquidity_y: level(&counters.liquidity.y, y),
        fee_x: stat(&counters.fees.x, previous.map(|p| &p.fee_x), x),
        fee_y: stat(&counters.fees.y, previous.map(|p| &p.fee_y), y),
    }
}

/// Snapshot for a pool whose chain read failed.
///
/// Counters carry over from the previous snapshot with zero volume and fee
/// deltas; liquidity keeps its last known value.
pub fn fallback_snapshot(timestamp: i64, previous: Option<&Snapshot>) -> Snapshot {
    let Some(prev) = previous else {
        return Snapshot {
            timestamp,
            ..Default::default()
        };
    };

    let flat = |s: &TokenStat| TokenStat::new(s.token_bn_from_beginning.clone(), 0.0);

    Snapshot {
        timestamp,
        volume_x: flat(&prev.volume_x),
        volume_y: flat(&prev.volume_y),
        liquidity_x: prev.liquidity_x.clone(),
        liquidity_y: prev.liquidity_y.clone(),
        fee_x: flat(&prev.fee_x),
        fee_y: flat(&prev.fee_y),
    }
}
