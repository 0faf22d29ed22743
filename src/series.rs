use crate::schema::{Measured, PeriodBucket};
use crate::utils::bucket_start;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Summed amounts keyed by bucket start, ascending.
pub type BucketedSeries = BTreeMap<NaiveDate, Decimal>;

pub fn bucket_series<R: Measured>(records: &[R], granularity: PeriodBucket) -> BucketedSeries {
    let mut series = BucketedSeries::new();
    for record in records {
        let slot = series
            .entry(bucket_start(record.date(), granularity))
            .or_insert(Decimal::ZERO);
        *slot = slot.saturating_add(record.amount());
    }
    series
}

/// Per-date totals; the first and last entries are the opening and closing balances.
pub fn daily_totals<R: Measured>(records: &[R]) -> BucketedSeries {
    bucket_series(records, PeriodBucket::Day)
}

pub fn latest_date<R: Measured>(records: &[R]) -> Option<NaiveDate> {
    records.iter().map(Measured::date).max()
}

pub fn earliest_date<R: Measured>(records: &[R]) -> Option<NaiveDate> {
    records.iter().map(Measured::date).min()
}

/// Records dated exactly `date`.
pub fn snapshot_at<R: Measured>(records: &[R], date: NaiveDate) -> Vec<&R> {
    records.iter().filter(|r| r.date() == date).collect()
}

/// Two series bucketed on the same boundaries. Every bucket present in one
/// side exists on the other, zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SeriesPair {
    pub granularity: PeriodBucket,
    pub a: BucketedSeries,
    pub b: BucketedSeries,
}

impl SeriesPair {
    pub fn align(a: BucketedSeries, b: BucketedSeries, granularity: PeriodBucket) -> Self {
        let mut a = a;
        let mut b = b;
        for bucket in b.keys() {
            a.entry(*bucket).or_insert(Decimal::ZERO);
        }
        for bucket in a.keys() {
            b.entry(*bucket).or_insert(Decimal::ZERO);
        }
        Self { granularity, a, b }
    }

    pub fn from_records<A: Measured, B: Measured>(a: &[A], b: &[B], granularity: PeriodBucket) -> Self {
        Self::align(
            bucket_series(a, granularity),
            bucket_series(b, granularity),
            granularity,
        )
    }

    pub fn buckets(&self) -> Vec<NaiveDate> {
        self.a.keys().copied().collect()
    }

    pub fn combined(&self) -> BucketedSeries {
        self.a
            .iter()
            .map(|(bucket, value)| {
                let other = self.b.get(bucket).copied().unwrap_or(Decimal::ZERO);
                (*bucket, value.saturating_add(other))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }
}
