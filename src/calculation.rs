use crate::schema::{Collectible, GrowthUnit};
use crate::series::BucketedSeries;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Percentage change from `previous` to `current`; 0 when `previous` is 0.
pub fn delta_percentage(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// `numerator / denominator`, optionally scaled to percent; 0 when `denominator` is 0.
pub fn ratio(numerator: f64, denominator: f64, as_percentage: bool) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let value = numerator / denominator;
    if as_percentage {
        value * 100.0
    } else {
        value
    }
}

/// Sum that saturates at the `Decimal` bounds instead of overflowing.
pub fn sum_amounts<I: IntoIterator<Item = Decimal>>(values: I) -> Decimal {
    values.into_iter().fold(Decimal::ZERO, Decimal::saturating_add)
}

/// `numerator / denominator * 100` in decimal arithmetic. Falls back to f64 when
/// the decimal quotient is out of range; 0 when `denominator` is 0.
fn decimal_percent(numerator: Decimal, denominator: Decimal) -> f64 {
    if denominator.is_zero() {
        return 0.0;
    }
    match numerator
        .checked_div(denominator)
        .and_then(|q| q.checked_mul(Decimal::ONE_HUNDRED))
    {
        Some(value) => value.to_f64().unwrap_or(0.0),
        None => ratio(
            numerator.to_f64().unwrap_or(0.0),
            denominator.to_f64().unwrap_or(0.0),
            true,
        ),
    }
}

/// `delta_percentage` evaluated in decimal arithmetic before converting.
pub fn growth_percentage(current: Decimal, previous: Decimal) -> f64 {
    decimal_percent(current.saturating_sub(previous), previous)
}

/// `part / whole * 100` in decimal arithmetic; 0 when `whole` is 0.
pub fn share_percentage(part: Decimal, whole: Decimal) -> f64 {
    decimal_percent(part, whole)
}

/// Savings share of third-party funds.
pub fn casa_ratio(saving: Decimal, deposito: Decimal) -> f64 {
    share_percentage(saving, saving.saturating_add(deposito))
}

/// Outstanding classified collectibility 3+ over total outstanding, in percent.
pub fn npf_ratio<R: Collectible>(records: &[R]) -> f64 {
    let (non_performing, total) = npf_components(records);
    share_percentage(non_performing, total)
}

pub fn npf_components<R: Collectible>(records: &[R]) -> (Decimal, Decimal) {
    records
        .iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(npf, total), r| {
            let amount = r.amount();
            if r.is_non_performing() {
                (npf.saturating_add(amount), total.saturating_add(amount))
            } else {
                (npf, total.saturating_add(amount))
            }
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, JsonSchema)]
pub struct SummaryStats {
    pub opening: Decimal,
    pub closing: Decimal,
    pub change: Decimal,
    pub growth: f64,
}

impl SummaryStats {
    pub fn new(opening: Decimal, closing: Decimal) -> Self {
        Self {
            opening,
            closing,
            change: closing.saturating_sub(opening),
            growth: growth_percentage(closing, opening),
        }
    }

    /// First bucket as opening, last as closing; all zeros for an empty series.
    pub fn from_series(series: &BucketedSeries) -> Self {
        match (series.values().next(), series.values().next_back()) {
            (Some(first), Some(last)) => Self::new(*first, *last),
            _ => Self::default(),
        }
    }

    /// Stats of the sum of two series, from their individual openings and closings.
    pub fn combine(&self, other: &SummaryStats) -> Self {
        Self::new(
            self.opening.saturating_add(other.opening),
            self.closing.saturating_add(other.closing),
        )
    }
}

pub type GrowthSeries = BTreeMap<NaiveDate, f64>;

/// Bucket-over-bucket change. The first bucket has no predecessor and is dropped.
pub fn growth_series(series: &BucketedSeries, unit: GrowthUnit) -> GrowthSeries {
    series
        .iter()
        .zip(series.iter().skip(1))
        .map(|((_, previous), (bucket, current))| {
            let value = match unit {
                GrowthUnit::Percentage => growth_percentage(*current, *previous),
                GrowthUnit::Nominal => current.saturating_sub(*previous).to_f64().unwrap_or(0.0),
            };
            (*bucket, value)
        })
        .collect()
}
