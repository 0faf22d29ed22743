use crate::breakdown::{breakdown_by_product, resolve_breakdown, NamedValue};
use crate::calculation::SummaryStats;
use crate::filter::records_for_branch;
use crate::format::{format_change, format_rupiah_millions};
use crate::mapping::{CodeMappings, Resolve};
use crate::schema::{Measured, PortfolioLabels};
use crate::series::daily_totals;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Opening and closing position of one branch over the filtered range.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BranchSnapshot {
    pub branch_code: String,
    pub branch_name: String,
    pub a: SummaryStats,
    pub b: SummaryStats,
    pub total: SummaryStats,
    pub products_a: BTreeMap<String, SummaryStats>,
    pub products_b: BTreeMap<String, SummaryStats>,
    /// Range totals per product, for the composition pies.
    pub composition_a: Vec<NamedValue>,
    pub composition_b: Vec<NamedValue>,
}

fn per_product<R: Measured>(records: &[&R]) -> BTreeMap<String, SummaryStats> {
    let codes: BTreeSet<&str> = records.iter().map(|r| r.product_code()).collect();
    codes
        .into_iter()
        .map(|code| {
            let product: Vec<&R> = records
                .iter()
                .copied()
                .filter(|r| r.product_code() == code)
                .collect();
            (code.to_string(), SummaryStats::from_series(&daily_totals(&product)))
        })
        .collect()
}

impl BranchSnapshot {
    pub fn build<A, B>(branch_code: &str, a: &[A], b: &[B], mappings: &CodeMappings) -> Self
    where
        A: Measured,
        B: Measured,
    {
        let a = records_for_branch(a, branch_code);
        let b = records_for_branch(b, branch_code);

        let stats_a = SummaryStats::from_series(&daily_totals(&a));
        let stats_b = SummaryStats::from_series(&daily_totals(&b));

        Self {
            branch_code: branch_code.to_string(),
            branch_name: mappings.branches.resolve(branch_code),
            total: stats_a.combine(&stats_b),
            a: stats_a,
            b: stats_b,
            products_a: per_product(&a),
            products_b: per_product(&b),
            composition_a: resolve_breakdown(&breakdown_by_product(&a), &mappings.products_a),
            composition_b: resolve_breakdown(&breakdown_by_product(&b), &mappings.products_b),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum ComparisonRowKind {
    Product,
    Total,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ComparisonRow {
    pub label: String,
    pub kind: ComparisonRowKind,
    pub branch1: SummaryStats,
    pub branch2: SummaryStats,
}

impl ComparisonRow {
    fn total(label: String, branch1: SummaryStats, branch2: SummaryStats) -> Self {
        Self {
            label,
            kind: ComparisonRowKind::Total,
            branch1,
            branch2,
        }
    }

    fn formatted(&self) -> Vec<String> {
        let mut cells = vec![self.label.clone()];
        for stats in [&self.branch1, &self.branch2] {
            cells.push(format_rupiah_millions(stats.opening));
            cells.push(format_rupiah_millions(stats.closing));
            cells.push(format_change(stats.change, stats.growth));
        }
        cells
    }
}

/// Closing values of one product at both branches, for the grouped bar chart.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ComparisonBar {
    pub label: String,
    pub branch1: Decimal,
    pub branch2: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct BranchComparison {
    pub branch1: BranchSnapshot,
    pub branch2: BranchSnapshot,
    /// Total, A, B.
    pub summary: Vec<ComparisonRow>,
    /// Products of A then B over the union of both branches, then the three totals.
    pub products: Vec<ComparisonRow>,
}

fn product_rows<F>(
    first: &BTreeMap<String, SummaryStats>,
    second: &BTreeMap<String, SummaryStats>,
    label: F,
) -> Vec<ComparisonRow>
where
    F: Fn(&str) -> String,
{
    let codes: BTreeSet<&String> = first.keys().chain(second.keys()).collect();
    codes
        .into_iter()
        .map(|code| ComparisonRow {
            label: label(code),
            kind: ComparisonRowKind::Product,
            branch1: first.get(code).copied().unwrap_or_default(),
            branch2: second.get(code).copied().unwrap_or_default(),
        })
        .collect()
}

impl BranchComparison {
    pub fn build<A, B>(
        a: &[A],
        b: &[B],
        branch1: &str,
        branch2: &str,
        labels: &PortfolioLabels,
        mappings: &CodeMappings,
    ) -> Self
    where
        A: Measured,
        B: Measured,
    {
        let first = BranchSnapshot::build(branch1, a, b, mappings);
        let second = BranchSnapshot::build(branch2, a, b, mappings);

        let summary = vec![
            ComparisonRow::total(labels.total_overall(), first.total, second.total),
            ComparisonRow::total(labels.total_a(), first.a, second.a),
            ComparisonRow::total(labels.total_b(), first.b, second.b),
        ];

        let mut products = product_rows(&first.products_a, &second.products_a, |code| {
            labels.product_a(&mappings.products_a.resolve(code))
        });
        products.extend(product_rows(
            &first.products_b,
            &second.products_b,
            |code| labels.product_b(&mappings.products_b.resolve(code)),
        ));
        products.push(ComparisonRow::total(labels.total_a(), first.a, second.a));
        products.push(ComparisonRow::total(labels.total_b(), first.b, second.b));
        products.push(ComparisonRow::total(
            labels.total_overall(),
            first.total,
            second.total,
        ));

        Self {
            branch1: first,
            branch2: second,
            summary,
            products,
        }
    }

    /// `<branch> Awal`, `<branch> Akhir`, `<branch> Pertumbuhan` for each branch.
    pub fn headers(&self) -> Vec<String> {
        [&self.branch1.branch_name, &self.branch2.branch_name]
            .into_iter()
            .flat_map(|name| {
                [
                    format!("{} Awal", name),
                    format!("{} Akhir", name),
                    format!("{} Pertumbuhan", name),
                ]
            })
            .collect()
    }

    pub fn chart_rows(&self) -> Vec<ComparisonBar> {
        self.products
            .iter()
            .filter(|row| row.kind == ComparisonRowKind::Product)
            .map(|row| ComparisonBar {
                label: row.label.clone(),
                branch1: row.branch1.closing,
                branch2: row.branch2.closing,
            })
            .collect()
    }

    pub fn summary_table(&self) -> Vec<Vec<String>> {
        self.summary.iter().map(ComparisonRow::formatted).collect()
    }

    pub fn detail_table(&self) -> Vec<Vec<String>> {
        self.products.iter().map(ComparisonRow::formatted).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakdown::Breakdown;
    use crate::mapping::{CodeDomain, CodeMapping};
    use crate::schema::BalanceRecord;
    use crate::series::{latest_date, snapshot_at};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 6, day).unwrap()
    }

    fn mappings() -> CodeMappings {
        CodeMappings {
            branches: CodeMapping::from_pairs(CodeDomain::Branch, [("01", "Pusat"), ("02", "Kota")]),
            products_a: CodeMapping::from_pairs(CodeDomain::Product, [("T1", "Wadiah")]),
            ..CodeMappings::default()
        }
    }

    fn records() -> (Vec<BalanceRecord>, Vec<BalanceRecord>) {
        let saving = vec![
            BalanceRecord::new(d(1), "01", "T1", dec!(1_000_000)),
            BalanceRecord::new(d(2), "01", "T1", dec!(1_500_000)),
            BalanceRecord::new(d(1), "02", "T2", dec!(400_000)),
            BalanceRecord::new(d(2), "02", "T2", dec!(200_000)),
        ];
        let deposito = vec![
            BalanceRecord::new(d(1), "01", "D1", dec!(2_000_000)),
            BalanceRecord::new(d(2), "01", "D1", dec!(2_000_000)),
        ];
        (saving, deposito)
    }

    #[test]
    fn test_snapshot_uses_first_and_last_dates() {
        let (saving, deposito) = records();
        let snapshot = BranchSnapshot::build("01", &saving, &deposito, &mappings());

        assert_eq!(snapshot.branch_name, "Pusat");
        assert_eq!(snapshot.a.change, dec!(500_000));
        assert_eq!(snapshot.a.growth, 50.0);
        assert_eq!(snapshot.total.opening, dec!(3_000_000));
        assert_eq!(snapshot.total.closing, dec!(3_500_000));
        assert_eq!(snapshot.composition_a[0].value, dec!(2_500_000));
    }

    #[test]
    fn test_branch_without_records_is_zero() {
        let (saving, deposito) = records();
        let snapshot = BranchSnapshot::build("07", &saving, &deposito, &mappings());
        assert_eq!(snapshot.total, SummaryStats::default());
        assert_eq!(snapshot.branch_name, "Branch 07");
        assert!(snapshot.products_a.is_empty());
    }

    #[test]
    fn test_comparison_rows_cover_product_union() {
        let (saving, deposito) = records();
        let comparison = BranchComparison::build(
            &saving,
            &deposito,
            "01",
            "02",
            &PortfolioLabels::FUNDING,
            &mappings(),
        );

        let summary_labels: Vec<&str> =
            comparison.summary.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(summary_labels, vec!["Total DPK", "Total Tabungan", "Total Deposito"]);

        let labels: Vec<&str> = comparison.products.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Tabungan - Wadiah",
                "Tabungan - Product T2",
                "Deposito - Product D1",
                "Total Tabungan",
                "Total Deposito",
                "Total DPK",
            ]
        );

        let t2 = &comparison.products[1];
        assert_eq!(t2.branch1, SummaryStats::default());
        assert_eq!(t2.branch2.change, dec!(-200_000));

        assert_eq!(comparison.chart_rows().len(), 3);
        assert_eq!(comparison.headers()[0], "Pusat Awal");
        assert_eq!(comparison.headers()[5], "Kota Pertumbuhan");
    }

    #[test]
    fn test_comparison_formatted_tables() {
        let (saving, deposito) = records();
        let comparison = BranchComparison::build(
            &saving,
            &deposito,
            "01",
            "02",
            &PortfolioLabels::FUNDING,
            &mappings(),
        );

        let summary = comparison.summary_table();
        assert_eq!(
            summary[1],
            vec![
                "Total Tabungan",
                "Rp 1.00 Juta",
                "Rp 1.50 Juta",
                "Rp 0.50 Juta (50.0%)",
                "Rp 0.40 Juta",
                "Rp 0.20 Juta",
                "Rp -0.20 Juta (-50.0%)",
            ]
        );
        assert_eq!(comparison.detail_table().len(), 6);
    }

    fn closing_breakdown(records: &[BalanceRecord], branch: &str) -> Breakdown {
        let branch_records = records_for_branch(records, branch);
        match latest_date(&branch_records) {
            Some(date) => breakdown_by_product(&snapshot_at(&branch_records, date)),
            None => Breakdown::new(),
        }
    }

    #[test]
    fn test_equal_branches_compare_equally_and_bars_match_breakdowns() {
        let saving = vec![
            BalanceRecord::new(d(1), "01", "T1", dec!(100)),
            BalanceRecord::new(d(2), "01", "T1", dec!(150)),
            BalanceRecord::new(d(1), "01", "T2", dec!(50)),
            BalanceRecord::new(d(2), "01", "T2", dec!(50)),
            BalanceRecord::new(d(1), "02", "T1", dec!(80)),
            BalanceRecord::new(d(2), "02", "T1", dec!(120)),
            BalanceRecord::new(d(1), "02", "T2", dec!(70)),
            BalanceRecord::new(d(2), "02", "T2", dec!(80)),
        ];
        let deposito = vec![
            BalanceRecord::new(d(1), "01", "D1", dec!(300)),
            BalanceRecord::new(d(2), "01", "D1", dec!(300)),
            BalanceRecord::new(d(1), "02", "D1", dec!(300)),
            BalanceRecord::new(d(2), "02", "D1", dec!(300)),
        ];
        let mappings = mappings();
        let labels = PortfolioLabels::FUNDING;
        let comparison =
            BranchComparison::build(&saving, &deposito, "01", "02", &labels, &mappings);

        let total = &comparison.summary[0];
        assert_eq!(total.branch1.closing, total.branch2.closing);
        assert_eq!(total.branch1.growth, total.branch2.growth);
        assert_eq!(comparison.branch1.a.growth, comparison.branch2.a.growth);

        let mut expected: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
        for (records, is_a) in [(&saving, true), (&deposito, false)] {
            let first = closing_breakdown(records, "01");
            let second = closing_breakdown(records, "02");
            let codes: BTreeSet<&String> = first.keys().chain(second.keys()).collect();
            for code in codes {
                let label = if is_a {
                    labels.product_a(&mappings.products_a.resolve(code))
                } else {
                    labels.product_b(&mappings.products_b.resolve(code))
                };
                let values = (
                    first.get(code).copied().unwrap_or_default(),
                    second.get(code).copied().unwrap_or_default(),
                );
                expected.insert(label, values);
            }
        }

        let bars: BTreeMap<String, (Decimal, Decimal)> = comparison
            .chart_rows()
            .into_iter()
            .map(|bar| (bar.label, (bar.branch1, bar.branch2)))
            .collect();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars, expected);
    }
}
