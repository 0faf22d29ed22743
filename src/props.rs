//! Property-based tests for the aggregation pipeline.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::breakdown::{breakdown_by_branch, top_n_with_others, Breakdown};
use crate::calculation::{delta_percentage, growth_series, ratio, SummaryStats};
use crate::mapping::{CodeDomain, CodeMapping, CodeMappings};
use crate::pivot::{PivotRowKind, PivotTable};
use crate::schema::{BalanceRecord, GrowthUnit, PeriodBucket, PortfolioLabels};
use crate::series::{bucket_series, BucketedSeries};
use crate::utils::month_start;

/// Amounts from 0.00 to 10,000,000.00.
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A record somewhere in 2021 at one of five branches and three products.
fn record() -> impl Strategy<Value = BalanceRecord> {
    (0u64..365, 1u32..=5, 1u32..=3, amount()).prop_map(|(offset, branch, product, amount)| {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        BalanceRecord::new(
            start + Days::new(offset),
            format!("{:02}", branch),
            format!("P{}", product),
            amount,
        )
    })
}

fn records() -> impl Strategy<Value = Vec<BalanceRecord>> {
    prop::collection::vec(record(), 0..60)
}

fn series() -> impl Strategy<Value = BucketedSeries> {
    prop::collection::vec(amount(), 1..30).prop_map(|values| {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (start + Days::new(i as u64), v))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Zero denominators never divide.
    #[test]
    fn prop_zero_denominator_is_zero(x in -1e12f64..1e12f64) {
        prop_assert_eq!(delta_percentage(x, 0.0), 0.0);
        prop_assert_eq!(ratio(x, 0.0, true), 0.0);
        prop_assert_eq!(ratio(x, 0.0, false), 0.0);
    }

    #[test]
    fn prop_change_is_closing_minus_opening(opening in amount(), closing in amount()) {
        let stats = SummaryStats::new(opening, closing);
        prop_assert_eq!(stats.change, closing - opening);
    }

    /// Growth drops exactly the first bucket.
    #[test]
    fn prop_growth_series_one_shorter(s in series()) {
        prop_assert_eq!(growth_series(&s, GrowthUnit::Percentage).len(), s.len() - 1);
        prop_assert_eq!(growth_series(&s, GrowthUnit::Nominal).len(), s.len() - 1);
    }

    /// Summing day buckets per month gives the month buckets.
    #[test]
    fn prop_day_buckets_roll_up_to_months(rs in records()) {
        let daily = bucket_series(&rs, PeriodBucket::Day);
        let monthly = bucket_series(&rs, PeriodBucket::Month);

        let mut rolled = BucketedSeries::new();
        for (day, value) in daily {
            *rolled.entry(month_start(day)).or_insert(Decimal::ZERO) += value;
        }
        prop_assert_eq!(rolled, monthly);
    }

    /// Top-N plus "Others" accounts for every group.
    #[test]
    fn prop_top_n_preserves_total(values in prop::collection::vec(amount(), 0..60)) {
        let totals: Breakdown = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("G{:03}", i), v))
            .collect();
        let bars = top_n_with_others(&totals, &CodeMapping::new(CodeDomain::Group));

        let shown: Decimal = bars.iter().map(|b| b.value).sum();
        let whole: Decimal = totals.values().copied().sum();
        prop_assert_eq!(shown, whole);
        prop_assert_eq!(bars.len(), totals.len().min(20) + 1);
    }

    /// The bottom-right pivot cell holds every amount, whatever the record order.
    #[test]
    fn prop_pivot_grand_total_is_sum_of_cells(a in records(), b in records()) {
        let branches: Vec<String> = (1..=5).map(|i| format!("{:02}", i)).collect();
        let mappings = CodeMappings::default();
        let pivot = PivotTable::build(&a, &b, &branches, &PortfolioLabels::FUNDING, &mappings);

        let expected: Decimal = a.iter().map(|r| r.amount).chain(b.iter().map(|r| r.amount)).sum();
        prop_assert_eq!(pivot.grand_total(), expected);

        let cells: Decimal = pivot
            .rows
            .iter()
            .filter(|row| row.kind == PivotRowKind::Product)
            .flat_map(|row| row.cells[..branches.len()].iter().copied())
            .sum();
        prop_assert_eq!(cells, expected);

        let mut reversed = a.clone();
        reversed.reverse();
        let again = PivotTable::build(&reversed, &b, &branches, &PortfolioLabels::FUNDING, &mappings);
        prop_assert_eq!(again.grand_total(), pivot.grand_total());
    }

    #[test]
    fn prop_branch_breakdown_sums_to_total(rs in records()) {
        let by_branch = breakdown_by_branch(&rs);
        let total: Decimal = rs.iter().map(|r| r.amount).sum();
        prop_assert_eq!(by_branch.values().copied().sum::<Decimal>(), total);
    }
}
