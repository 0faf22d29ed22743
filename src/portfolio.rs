//! The dashboard pipeline shared by funding and lending.
//!
//! A portfolio is two record series (savings and deposito, or financing and rahn)
//! plus their combined total. [`PortfolioAnalysis`] filters both series through a
//! [`FilterContext`] and derives every table and chart payload from the result.
//! [`FundingReport`] and [`LendingReport`] add the ratio cards and breakdowns that
//! only make sense for one side of the balance sheet.

use crate::breakdown::{
    breakdown_by, breakdown_by_branch, breakdown_by_product, resolve_breakdown,
    top_n_with_others, NamedValue, ShareTable,
};
use crate::calculation::{
    casa_ratio, delta_percentage, growth_series, npf_components, share_percentage, GrowthSeries,
    SummaryStats,
};
use crate::comparison::BranchComparison;
use crate::error::Result;
use crate::filter::{filter_records, product_options, FilterContext};
use crate::format::{format_date, format_growth, format_percent, format_rupiah_millions};
use crate::mapping::{CodeMapping, CodeMappings};
use crate::pivot::PivotTable;
use crate::schema::{
    BalanceRecord, Collectible, GrowthUnit, LendingRecord, Measured, PortfolioLabels, RahnRecord,
};
use crate::series::{
    bucket_series, daily_totals, earliest_date, latest_date, snapshot_at, BucketedSeries, SeriesPair,
};
use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;

/// One metric card: closing value with its change since the start of the range.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Headline {
    pub label: String,
    pub opening: Decimal,
    pub closing: Decimal,
    pub delta: f64,
    pub formatted_value: String,
    pub formatted_delta: String,
}

impl Headline {
    fn new(label: String, stats: &SummaryStats) -> Self {
        Self {
            label,
            opening: stats.opening,
            closing: stats.closing,
            delta: stats.growth,
            formatted_value: format_rupiah_millions(stats.closing),
            formatted_delta: format!("{:+.1}% dari periode awal", stats.growth),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Headlines {
    pub total: Headline,
    pub a: Headline,
    pub b: Headline,
}

/// A ratio card such as CASA or NPF.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct RatioCard {
    pub label: String,
    pub current: f64,
    pub previous: f64,
    pub delta: f64,
    pub formatted_value: String,
    pub formatted_delta: String,
}

impl RatioCard {
    fn new(label: &str, current: f64, previous: f64, delta: f64) -> Self {
        Self {
            label: label.to_string(),
            current,
            previous,
            delta,
            formatted_value: format_percent(current, 1),
            formatted_delta: format!("{:+.1}% dari periode awal", delta),
        }
    }
}

/// A row of the growth summary (Ringkasan) table.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct SummaryRow {
    pub label: String,
    pub stats: SummaryStats,
    pub formatted_opening: String,
    pub formatted_closing: String,
    pub formatted_change: String,
    pub formatted_growth: String,
}

impl SummaryRow {
    fn new(label: String, stats: SummaryStats) -> Self {
        Self {
            formatted_opening: format_rupiah_millions(stats.opening),
            formatted_closing: format_rupiah_millions(stats.closing),
            formatted_change: format_rupiah_millions(stats.change),
            formatted_growth: format_percent(stats.growth, 2),
            label,
            stats,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct GrowthReport {
    pub unit: GrowthUnit,
    pub a: GrowthSeries,
    pub b: GrowthSeries,
    pub total: GrowthSeries,
}

impl GrowthReport {
    /// Bucket label and the three growth values rendered in the report's unit.
    pub fn formatted(&self) -> Vec<Vec<String>> {
        self.total
            .iter()
            .map(|(bucket, total)| {
                let a = self.a.get(bucket).copied().unwrap_or(0.0);
                let b = self.b.get(bucket).copied().unwrap_or(0.0);
                vec![
                    format_date(*bucket),
                    format_growth(a, self.unit),
                    format_growth(b, self.unit),
                    format_growth(*total, self.unit),
                ]
            })
            .collect()
    }
}

/// One bucket of the detailed balance table. Growth is percent and `None` for the first bucket.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DetailRow {
    pub bucket: NaiveDate,
    pub date: String,
    pub a: Decimal,
    pub b: Decimal,
    pub total: Decimal,
    pub growth_a: Option<f64>,
    pub growth_b: Option<f64>,
    pub growth_total: Option<f64>,
}

impl DetailRow {
    pub fn formatted(&self) -> Vec<String> {
        let growth = |g: Option<f64>| g.map(|v| format_percent(v, 2)).unwrap_or_default();
        vec![
            self.date.clone(),
            format_rupiah_millions(self.a),
            format_rupiah_millions(self.b),
            format_rupiah_millions(self.total),
            growth(self.growth_a),
            growth(self.growth_b),
            growth(self.growth_total),
        ]
    }
}

/// Named slices for a pair of proportion pies.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct Proportions {
    pub a: Vec<NamedValue>,
    pub b: Vec<NamedValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PortfolioReport {
    pub headline: Headlines,
    pub trend: SeriesPair,
    /// A, B, then the combined total.
    pub summary: Vec<SummaryRow>,
    pub growth: GrowthReport,
    pub detail: Vec<DetailRow>,
    pub by_branch: Proportions,
    pub by_product: Proportions,
    pub pivot: PivotTable,
}

/// Aggregation over two record series sharing branch and product codes.
pub struct PortfolioAnalysis<'a, A, B> {
    pub labels: PortfolioLabels,
    pub a: &'a [A],
    pub b: &'a [B],
    pub mappings: &'a CodeMappings,
}

impl<'a, A, B> PortfolioAnalysis<'a, A, B>
where
    A: Measured,
    B: Measured,
{
    pub fn new(
        labels: PortfolioLabels,
        a: &'a [A],
        b: &'a [B],
        mappings: &'a CodeMappings,
    ) -> Self {
        Self {
            labels,
            a,
            b,
            mappings,
        }
    }

    /// Products selectable for this portfolio as `(code, name)`.
    pub fn product_options(&self) -> Vec<(String, String)> {
        product_options(self.a, self.b, &self.mappings.products())
    }

    pub fn filtered(&self, ctx: &FilterContext) -> (Vec<&'a A>, Vec<&'a B>) {
        (filter_records(self.a, ctx), filter_records(self.b, ctx))
    }

    pub fn run(&self, ctx: &FilterContext) -> Result<PortfolioReport> {
        ctx.ensure_selection()?;

        let (a, b) = self.filtered(ctx);
        info!(
            "Analysing {} for {} branches and {} products ({} to {})",
            self.labels.total,
            ctx.branches().len(),
            ctx.products().len(),
            ctx.range().start,
            ctx.range().end
        );
        debug!(
            "{} {} records and {} {} records after filtering",
            a.len(),
            self.labels.a,
            b.len(),
            self.labels.b
        );

        let headline = self.headlines(&a, &b);

        let granularity = ctx.granularity();
        let stats_a = SummaryStats::from_series(&bucket_series(&a, granularity));
        let stats_b = SummaryStats::from_series(&bucket_series(&b, granularity));
        let summary = vec![
            SummaryRow::new(self.labels.a.to_string(), stats_a),
            SummaryRow::new(self.labels.b.to_string(), stats_b),
            SummaryRow::new(self.labels.total_overall(), stats_a.combine(&stats_b)),
        ];

        let trend = SeriesPair::from_records(&a, &b, granularity);
        let combined = trend.combined();

        let growth = GrowthReport {
            unit: ctx.growth_unit(),
            a: growth_series(&trend.a, ctx.growth_unit()),
            b: growth_series(&trend.b, ctx.growth_unit()),
            total: growth_series(&combined, ctx.growth_unit()),
        };

        let detail = detail_rows(&trend, &combined);

        let by_branch = Proportions {
            a: resolve_breakdown(&breakdown_by_branch(&a), &self.mappings.branches),
            b: resolve_breakdown(&breakdown_by_branch(&b), &self.mappings.branches),
        };
        let by_product = Proportions {
            a: resolve_breakdown(&breakdown_by_product(&a), &self.mappings.products_a),
            b: resolve_breakdown(&breakdown_by_product(&b), &self.mappings.products_b),
        };

        let branch_codes: Vec<String> = ctx.branches().iter().cloned().collect();
        let pivot = PivotTable::build(&a, &b, &branch_codes, &self.labels, self.mappings);

        Ok(PortfolioReport {
            headline,
            trend,
            summary,
            growth,
            detail,
            by_branch,
            by_product,
            pivot,
        })
    }

    /// Side-by-side view of two branches over the filtered records. A branch
    /// outside the context's selection has no records and compares as zeros.
    pub fn compare_branches(
        &self,
        ctx: &FilterContext,
        branch1: &str,
        branch2: &str,
    ) -> Result<BranchComparison> {
        ctx.ensure_selection()?;
        for branch in [branch1, branch2] {
            if !ctx.branches().contains(branch) {
                warn!("Branch {} is not selected; comparing it as empty", branch);
            }
        }

        let (a, b) = self.filtered(ctx);
        debug!("Comparing branch {} with branch {}", branch1, branch2);

        Ok(BranchComparison::build(
            &a,
            &b,
            branch1,
            branch2,
            &self.labels,
            self.mappings,
        ))
    }

    fn headlines(&self, a: &[&A], b: &[&B]) -> Headlines {
        let stats_a = SummaryStats::from_series(&daily_totals(a));
        let stats_b = SummaryStats::from_series(&daily_totals(b));
        Headlines {
            total: Headline::new(self.labels.total_overall(), &stats_a.combine(&stats_b)),
            a: Headline::new(self.labels.total_a(), &stats_a),
            b: Headline::new(self.labels.total_b(), &stats_b),
        }
    }
}

fn detail_rows(trend: &SeriesPair, combined: &BucketedSeries) -> Vec<DetailRow> {
    let growth_a = growth_series(&trend.a, GrowthUnit::Percentage);
    let growth_b = growth_series(&trend.b, GrowthUnit::Percentage);
    let growth_total = growth_series(combined, GrowthUnit::Percentage);

    trend
        .buckets()
        .into_iter()
        .map(|bucket| DetailRow {
            bucket,
            date: format_date(bucket),
            a: trend.a.get(&bucket).copied().unwrap_or(Decimal::ZERO),
            b: trend.b.get(&bucket).copied().unwrap_or(Decimal::ZERO),
            total: combined.get(&bucket).copied().unwrap_or(Decimal::ZERO),
            growth_a: growth_a.get(&bucket).copied(),
            growth_b: growth_b.get(&bucket).copied(),
            growth_total: growth_total.get(&bucket).copied(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct FundingReport {
    pub portfolio: PortfolioReport,
    pub casa: RatioCard,
}

impl FundingReport {
    pub fn build(
        saving: &[BalanceRecord],
        deposito: &[BalanceRecord],
        mappings: &CodeMappings,
        ctx: &FilterContext,
    ) -> Result<Self> {
        let analysis = PortfolioAnalysis::new(PortfolioLabels::FUNDING, saving, deposito, mappings);
        let portfolio = analysis.run(ctx)?;

        let headline = &portfolio.headline;
        let current = casa_ratio(headline.a.closing, headline.b.closing);
        let previous = casa_ratio(headline.a.opening, headline.b.opening);
        let casa = RatioCard::new(
            "CASA Ratio",
            current,
            previous,
            delta_percentage(current, previous),
        );

        Ok(Self { portfolio, casa })
    }
}

/// Top-N bars and the full share table for one grouping of outstanding financing.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct GroupBreakdown {
    /// Latest date in the filtered financing, the snapshot the breakdown is taken from.
    pub as_of: Option<NaiveDate>,
    pub top: Vec<NamedValue>,
    pub table: ShareTable,
}

impl GroupBreakdown {
    fn build<F>(records: &[&LendingRecord], names: &CodeMapping, key: F) -> Self
    where
        F: Fn(&LendingRecord) -> Option<&str>,
    {
        let as_of = latest_date(records);
        let snapshot: Vec<&LendingRecord> = match as_of {
            Some(date) => snapshot_at(records, date).into_iter().copied().collect(),
            None => Vec::new(),
        };
        let totals = breakdown_by(&snapshot, |r| key(*r));

        Self {
            as_of,
            top: top_n_with_others(&totals, names),
            table: ShareTable::build(&totals, names, "Total"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct LendingReport {
    pub portfolio: PortfolioReport,
    pub npf: RatioCard,
    pub group1: GroupBreakdown,
    pub group2: GroupBreakdown,
    pub collectors: GroupBreakdown,
}

/// Non-performing and total amounts on the given date, or zeros without a date.
fn npf_on<R: Collectible>(records: &[R], date: Option<NaiveDate>) -> (Decimal, Decimal) {
    match date {
        Some(date) => npf_components(&snapshot_at(records, date)),
        None => (Decimal::ZERO, Decimal::ZERO),
    }
}

/// NPF over both series, each taken at its own latest (or earliest) date.
fn combined_npf<A: Collectible, B: Collectible>(
    a: &[A],
    a_date: Option<NaiveDate>,
    b: &[B],
    b_date: Option<NaiveDate>,
) -> f64 {
    let (npf_a, total_a) = npf_on(a, a_date);
    let (npf_b, total_b) = npf_on(b, b_date);
    share_percentage(npf_a.saturating_add(npf_b), total_a.saturating_add(total_b))
}

impl LendingReport {
    pub fn build(
        financing: &[LendingRecord],
        rahn: &[RahnRecord],
        mappings: &CodeMappings,
        ctx: &FilterContext,
    ) -> Result<Self> {
        let analysis = PortfolioAnalysis::new(PortfolioLabels::LENDING, financing, rahn, mappings);
        let portfolio = analysis.run(ctx)?;
        let (financing, rahn) = analysis.filtered(ctx);

        let current = combined_npf(
            &financing,
            latest_date(&financing),
            &rahn,
            latest_date(&rahn),
        );
        let previous = combined_npf(
            &financing,
            earliest_date(&financing),
            &rahn,
            earliest_date(&rahn),
        );
        let npf_delta = current - previous;
        debug!("NPF moved from {:.2}% to {:.2}%", previous, current);

        Ok(Self {
            portfolio,
            npf: RatioCard::new("NPF Ratio", current, previous, npf_delta),
            group1: GroupBreakdown::build(&financing, &mappings.group1, |r| {
                r.group1_code.as_deref()
            }),
            group2: GroupBreakdown::build(&financing, &mappings.group2, |r| {
                r.group2_code.as_deref()
            }),
            collectors: GroupBreakdown::build(&financing, &mappings.collectors, |r| {
                r.collector_code.as_deref()
            }),
        })
    }
}
