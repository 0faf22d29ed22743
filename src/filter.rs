use crate::error::{AnalyticsError, Result};
use crate::mapping::{CodeMapping, Resolve};
use crate::schema::{GrowthUnit, Measured, PeriodBucket};
use crate::utils::parse_period_string;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(AnalyticsError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Accepts "YYYY-MM" or "YYYY-MM:YYYY-MM".
    pub fn parse(period: &str) -> Result<Self> {
        let (start, end) = parse_period_string(period)?;
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Everything one dashboard request filters by. Built once per request and
/// never mutated; narrowing it produces a new context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterContext {
    range: DateRange,
    branches: BTreeSet<String>,
    products: BTreeSet<String>,
    granularity: PeriodBucket,
    growth_unit: GrowthUnit,
}

impl FilterContext {
    pub fn new<B, P>(
        range: DateRange,
        branches: B,
        products: P,
        granularity: PeriodBucket,
        growth_unit: GrowthUnit,
    ) -> Self
    where
        B: IntoIterator,
        B::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            range,
            branches: branches.into_iter().map(Into::into).collect(),
            products: products.into_iter().map(Into::into).collect(),
            granularity,
            growth_unit,
        }
    }

    pub fn range(&self) -> DateRange {
        self.range
    }

    pub fn branches(&self) -> &BTreeSet<String> {
        &self.branches
    }

    pub fn products(&self) -> &BTreeSet<String> {
        &self.products
    }

    pub fn granularity(&self) -> PeriodBucket {
        self.granularity
    }

    pub fn growth_unit(&self) -> GrowthUnit {
        self.growth_unit
    }

    pub fn with_products<P>(&self, products: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            products: products.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    pub fn with_branches<B>(&self, branches: B) -> Self
    where
        B: IntoIterator,
        B::Item: Into<String>,
    {
        Self {
            branches: branches.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    pub fn with_granularity(&self, granularity: PeriodBucket) -> Self {
        Self {
            granularity,
            ..self.clone()
        }
    }

    pub fn with_growth_unit(&self, growth_unit: GrowthUnit) -> Self {
        Self {
            growth_unit,
            ..self.clone()
        }
    }

    /// Fails with `EmptySelection` when the user deselected every branch or product.
    pub fn ensure_selection(&self) -> Result<()> {
        if self.branches.is_empty() {
            return Err(AnalyticsError::EmptySelection {
                dimension: "branch".to_string(),
            });
        }
        if self.products.is_empty() {
            return Err(AnalyticsError::EmptySelection {
                dimension: "product".to_string(),
            });
        }
        Ok(())
    }

    pub fn matches<R: Measured>(&self, record: &R) -> bool {
        self.range.contains(record.date())
            && self.branches.contains(record.branch_code())
            && self.products.contains(record.product_code())
    }
}

/// Records inside the date range whose branch and product are selected.
/// An empty branch or product selection keeps nothing.
pub fn filter_records<'a, R: Measured>(records: &'a [R], ctx: &FilterContext) -> Vec<&'a R> {
    records.iter().filter(|r| ctx.matches(*r)).collect()
}

pub fn records_for_branch<'a, R: Measured>(records: &'a [R], branch_code: &str) -> Vec<&'a R> {
    records
        .iter()
        .filter(|r| r.branch_code() == branch_code)
        .collect()
}

/// A user's branch access as stored with their account: `all` or a comma-separated code list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchAccess {
    All,
    Only(Vec<String>),
}

impl BranchAccess {
    pub fn parse(raw: &str) -> Self {
        if raw.to_lowercase().contains("all") {
            return BranchAccess::All;
        }
        BranchAccess::Only(
            raw.split(',')
                .map(str::trim)
                .filter(|code| !code.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Branch codes the user may select, in mapping order for full access.
    pub fn available_branches(&self, branches: &CodeMapping) -> Vec<String> {
        match self {
            BranchAccess::All => branches.codes().map(str::to_string).collect(),
            BranchAccess::Only(codes) => codes.clone(),
        }
    }
}

/// Selectable products: the sorted union of codes seen in either series, with display names.
pub fn product_options<A, B, N>(a: &[A], b: &[B], names: &N) -> Vec<(String, String)>
where
    A: Measured,
    B: Measured,
    N: Resolve,
{
    let codes: BTreeSet<&str> = a
        .iter()
        .map(Measured::product_code)
        .chain(b.iter().map(Measured::product_code))
        .collect();

    codes
        .into_iter()
        .map(|code| (code.to_string(), names.resolve(code)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{CodeDomain, ProductCatalog};
    use crate::schema::BalanceRecord;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample() -> Vec<BalanceRecord> {
        vec![
            BalanceRecord::new(d(2021, 5, 31), "01", "A", dec!(100)),
            BalanceRecord::new(d(2021, 6, 1), "01", "A", dec!(200)),
            BalanceRecord::new(d(2021, 6, 1), "02", "A", dec!(300)),
            BalanceRecord::new(d(2021, 6, 2), "01", "B", dec!(400)),
            BalanceRecord::new(d(2021, 7, 1), "01", "A", dec!(500)),
        ]
    }

    fn ctx(branches: &[&str], products: &[&str]) -> FilterContext {
        FilterContext::new(
            DateRange::new(d(2021, 6, 1), d(2021, 6, 30)).unwrap(),
            branches.iter().copied(),
            products.iter().copied(),
            PeriodBucket::Day,
            GrowthUnit::Percentage,
        )
    }

    #[test]
    fn test_filter_applies_all_three_predicates() {
        let records = sample();
        let kept = filter_records(&records, &ctx(&["01"], &["A"]));
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].amount, dec!(200));
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let records = vec![
            BalanceRecord::new(d(2021, 6, 1), "01", "A", dec!(1)),
            BalanceRecord::new(d(2021, 6, 30), "01", "A", dec!(2)),
        ];
        assert_eq!(filter_records(&records, &ctx(&["01"], &["A"])).len(), 2);
    }

    #[test]
    fn test_empty_selection_selects_nothing() {
        let records = sample();
        assert!(filter_records(&records, &ctx(&[], &["A", "B"])).is_empty());
        assert!(filter_records(&records, &ctx(&["01", "02"], &[])).is_empty());
    }

    #[test]
    fn test_ensure_selection_reports_dimension() {
        let err = ctx(&[], &["A"]).ensure_selection().unwrap_err();
        assert!(matches!(err, AnalyticsError::EmptySelection { ref dimension } if dimension == "branch"));

        let err = ctx(&["01"], &[]).ensure_selection().unwrap_err();
        assert!(matches!(err, AnalyticsError::EmptySelection { ref dimension } if dimension == "product"));

        assert!(ctx(&["01"], &["A"]).ensure_selection().is_ok());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let result = DateRange::new(d(2021, 6, 2), d(2021, 6, 1));
        assert!(matches!(result, Err(AnalyticsError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_with_products_leaves_original_untouched() {
        let base = ctx(&["01"], &["A", "B"]);
        let narrowed = base.with_products(["B"]);
        assert_eq!(base.products().len(), 2);
        assert_eq!(narrowed.products().len(), 1);
        assert_eq!(narrowed.range(), base.range());
    }

    #[test]
    fn test_builders_replace_one_field() {
        let base = ctx(&["01"], &["A"]);

        let wider = base.with_branches(["01", "02"]);
        assert_eq!(wider.branches().len(), 2);
        assert_eq!(wider.products(), base.products());
        assert_eq!(filter_records(&sample(), &wider).len(), 2);

        let monthly = base.with_granularity(PeriodBucket::Month);
        assert_eq!(monthly.granularity(), PeriodBucket::Month);
        assert_eq!(monthly.growth_unit(), base.growth_unit());

        let nominal = base.with_growth_unit(GrowthUnit::Nominal);
        assert_eq!(nominal.growth_unit(), GrowthUnit::Nominal);
        assert_eq!(nominal.granularity(), base.granularity());
        assert_eq!(base.growth_unit(), GrowthUnit::Percentage);
    }

    #[test]
    fn test_branch_access_parsing() {
        let mapping =
            CodeMapping::from_pairs(CodeDomain::Branch, [("01", "Pusat"), ("02", "Kota")]);

        assert_eq!(BranchAccess::parse("all"), BranchAccess::All);
        assert_eq!(
            BranchAccess::parse("all").available_branches(&mapping),
            vec!["01".to_string(), "02".to_string()]
        );
        assert_eq!(
            BranchAccess::parse("03, 05,").available_branches(&mapping),
            vec!["03".to_string(), "05".to_string()]
        );
    }

    #[test]
    fn test_product_options_union() {
        let saving = vec![BalanceRecord::new(d(2021, 6, 1), "01", "T1", dec!(1))];
        let deposito = vec![
            BalanceRecord::new(d(2021, 6, 1), "01", "D1", dec!(1)),
            BalanceRecord::new(d(2021, 6, 2), "01", "T1", dec!(1)),
        ];
        let a = CodeMapping::from_pairs(CodeDomain::Product, [("T1", "Tabungan iB")]);
        let b = CodeMapping::new(CodeDomain::Product);

        let options = product_options(&saving, &deposito, &ProductCatalog { a: &a, b: &b });
        assert_eq!(
            options,
            vec![
                ("D1".to_string(), "Product D1".to_string()),
                ("T1".to_string(), "Tabungan iB".to_string()),
            ]
        );
    }
}
