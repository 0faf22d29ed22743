use crate::error::{AnalyticsError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum PeriodBucket {
    #[schemars(description = "One bucket per calendar day")]
    Day,

    #[schemars(description = "Calendar weeks starting on Monday")]
    Week,

    #[schemars(description = "Calendar months, keyed by the first day of the month")]
    Month,

    #[schemars(description = "Calendar years, keyed by 1 January")]
    Year,
}

impl PeriodBucket {
    /// Dashboard label for the granularity, as shown in chart titles.
    pub fn label(&self) -> &'static str {
        match self {
            PeriodBucket::Day => "Hari",
            PeriodBucket::Week => "Minggu",
            PeriodBucket::Month => "Bulan",
            PeriodBucket::Year => "Tahun",
        }
    }
}

impl FromStr for PeriodBucket {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" | "d" | "hari" => Ok(PeriodBucket::Day),
            "week" | "w" | "minggu" => Ok(PeriodBucket::Week),
            "month" | "m" | "bulan" => Ok(PeriodBucket::Month),
            "year" | "y" | "tahun" => Ok(PeriodBucket::Year),
            _ => Err(AnalyticsError::InvalidGranularity(s.to_string())),
        }
    }
}

impl fmt::Display for PeriodBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum GrowthUnit {
    #[default]
    #[schemars(description = "Period-over-period change relative to the prior bucket, in percent")]
    Percentage,

    #[schemars(description = "Period-over-period change as an absolute amount")]
    Nominal,
}

/// Loan classification (kolektibilitas). Codes 3 and above are non-performing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(try_from = "i64", into = "i64")]
pub enum Collectibility {
    #[default]
    Current,
    SpecialMention,
    Substandard,
    Doubtful,
    Loss,
}

impl Collectibility {
    pub fn code(&self) -> i64 {
        match self {
            Collectibility::Current => 1,
            Collectibility::SpecialMention => 2,
            Collectibility::Substandard => 3,
            Collectibility::Doubtful => 4,
            Collectibility::Loss => 5,
        }
    }

    pub fn is_non_performing(&self) -> bool {
        *self >= Collectibility::Substandard
    }
}

impl TryFrom<i64> for Collectibility {
    type Error = AnalyticsError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            1 => Ok(Collectibility::Current),
            2 => Ok(Collectibility::SpecialMention),
            3 => Ok(Collectibility::Substandard),
            4 => Ok(Collectibility::Doubtful),
            5 => Ok(Collectibility::Loss),
            other => Err(AnalyticsError::InvalidCollectibility(other)),
        }
    }
}

impl From<Collectibility> for i64 {
    fn from(value: Collectibility) -> Self {
        value.code()
    }
}

/// A dated, branch- and product-keyed amount. Everything the aggregation
/// pipeline needs from a record stream goes through this trait.
pub trait Measured {
    fn date(&self) -> NaiveDate;
    fn branch_code(&self) -> &str;
    fn product_code(&self) -> &str;
    fn amount(&self) -> Decimal;
}

pub trait Collectible: Measured {
    fn collectibility(&self) -> Collectibility;

    fn is_non_performing(&self) -> bool {
        self.collectibility().is_non_performing()
    }
}

impl<T: Measured + ?Sized> Measured for &T {
    fn date(&self) -> NaiveDate {
        (**self).date()
    }

    fn branch_code(&self) -> &str {
        (**self).branch_code()
    }

    fn product_code(&self) -> &str {
        (**self).product_code()
    }

    fn amount(&self) -> Decimal {
        (**self).amount()
    }
}

impl<T: Collectible + ?Sized> Collectible for &T {
    fn collectibility(&self) -> Collectibility {
        (**self).collectibility()
    }
}

/// Funding balance (deposito or saving) for one product at one branch on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceRecord {
    pub date: NaiveDate,
    pub branch_code: String,
    pub product_code: String,
    pub amount: Decimal,
}

impl BalanceRecord {
    pub fn new(
        date: NaiveDate,
        branch_code: impl Into<String>,
        product_code: impl Into<String>,
        amount: Decimal,
    ) -> Self {
        Self {
            date,
            branch_code: branch_code.into(),
            product_code: product_code.into(),
            amount,
        }
    }
}

impl Measured for BalanceRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn branch_code(&self) -> &str {
        &self.branch_code
    }

    fn product_code(&self) -> &str {
        &self.product_code
    }

    fn amount(&self) -> Decimal {
        self.amount
    }
}

/// Financing position. `outstanding` defaults to `disbursed - principal_paid`;
/// ingestion replaces it when the source carries its own `Outstanding` column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingRecord {
    pub date: NaiveDate,
    pub branch_code: String,
    pub product_code: String,
    pub collectibility: Collectibility,
    pub disbursed: Decimal,
    pub principal_paid: Decimal,
    pub outstanding: Decimal,
    pub payment_status: Option<String>,
    pub group1_code: Option<String>,
    pub group2_code: Option<String>,
    pub collector_code: Option<String>,
}

impl LendingRecord {
    pub fn new(
        date: NaiveDate,
        branch_code: impl Into<String>,
        product_code: impl Into<String>,
        collectibility: Collectibility,
        disbursed: Decimal,
        principal_paid: Decimal,
    ) -> Self {
        Self {
            date,
            branch_code: branch_code.into(),
            product_code: product_code.into(),
            collectibility,
            disbursed,
            principal_paid,
            outstanding: disbursed.saturating_sub(principal_paid),
            payment_status: None,
            group1_code: None,
            group2_code: None,
            collector_code: None,
        }
    }

    pub fn with_groups(mut self, group1: Option<String>, group2: Option<String>) -> Self {
        self.group1_code = group1;
        self.group2_code = group2;
        self
    }

    pub fn with_collector(mut self, collector: Option<String>) -> Self {
        self.collector_code = collector;
        self
    }

    pub fn with_payment_status(mut self, status: Option<String>) -> Self {
        self.payment_status = status;
        self
    }
}

impl Measured for LendingRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn branch_code(&self) -> &str {
        &self.branch_code
    }

    fn product_code(&self) -> &str {
        &self.product_code
    }

    fn amount(&self) -> Decimal {
        self.outstanding
    }
}

impl Collectible for LendingRecord {
    fn collectibility(&self) -> Collectibility {
        self.collectibility
    }
}

/// Pawn-backed (rahn) loan position, measured by its nominal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RahnRecord {
    pub date: NaiveDate,
    pub branch_code: String,
    pub product_code: String,
    pub collectibility: Collectibility,
    pub nominal: Decimal,
}

impl RahnRecord {
    pub fn new(
        date: NaiveDate,
        branch_code: impl Into<String>,
        product_code: impl Into<String>,
        collectibility: Collectibility,
        nominal: Decimal,
    ) -> Self {
        Self {
            date,
            branch_code: branch_code.into(),
            product_code: product_code.into(),
            collectibility,
            nominal,
        }
    }
}

impl Measured for RahnRecord {
    fn date(&self) -> NaiveDate {
        self.date
    }

    fn branch_code(&self) -> &str {
        &self.branch_code
    }

    fn product_code(&self) -> &str {
        &self.product_code
    }

    fn amount(&self) -> Decimal {
        self.nominal
    }
}

impl Collectible for RahnRecord {
    fn collectibility(&self) -> Collectibility {
        self.collectibility
    }
}

/// Display labels for a pair of reconciled series and their combined total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortfolioLabels {
    pub a: &'static str,
    pub b: &'static str,
    pub total: &'static str,
}

impl PortfolioLabels {
    pub const FUNDING: PortfolioLabels = PortfolioLabels {
        a: "Tabungan",
        b: "Deposito",
        total: "DPK",
    };

    pub const LENDING: PortfolioLabels = PortfolioLabels {
        a: "Pembiayaan",
        b: "Rahn",
        total: "Lending",
    };

    pub fn total_a(&self) -> String {
        format!("Total {}", self.a)
    }

    pub fn total_b(&self) -> String {
        format!("Total {}", self.b)
    }

    pub fn total_overall(&self) -> String {
        format!("Total {}", self.total)
    }

    pub fn product_a(&self, name: &str) -> String {
        format!("{} - {}", self.a, name)
    }

    pub fn product_b(&self, name: &str) -> String {
        format!("{} - {}", self.b, name)
    }
}
