//! # Branch Balance Analytics
//!
//! Aggregation engine behind a branch-banking dashboard. It turns daily balance
//! records for funding (savings and time deposits) and lending (financing and
//! pawn-backed rahn loans) into period-bucketed trends, growth series, ratio
//! cards, breakdowns, cross-tabs and branch comparisons.
//!
//! ## Core Concepts
//!
//! - **Record streams**: Deposito, Saving, Financing and Rahn rows keyed by date, branch and product
//! - **Filter context**: The date range, branch and product selection, granularity and growth unit of one request
//! - **Portfolio**: Two series and their combined total (Tabungan + Deposito = DPK, Pembiayaan + Rahn = Lending)
//! - **Reports**: Plain serde structs; currency strings render as `Rp {millions:,.2f} Juta`
//!
//! ## Example
//!
//! ```rust,ignore
//! use branch_balance_analytics::*;
//! use chrono::NaiveDate;
//!
//! let range = DateRange::new(
//!     NaiveDate::from_ymd_opt(2021, 6, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2021, 6, 30).unwrap(),
//! )?;
//!
//! let data = load_funding(&source, range, &EngineConfig::default())?;
//! for issue in &data.issues {
//!     eprintln!("{}", issue);
//! }
//!
//! let ctx = FilterContext::new(
//!     range,
//!     ["01", "02"],
//!     ["T1", "D1"],
//!     PeriodBucket::Week,
//!     GrowthUnit::Percentage,
//! );
//!
//! let report = analyze_funding(&data, &mappings, &ctx)?;
//! println!("{}", report.portfolio.headline.total.formatted_value);
//! ```

pub mod breakdown;
pub mod calculation;
pub mod comparison;
pub mod config;
pub mod error;
pub mod filter;
pub mod format;
pub mod ingestion;
pub mod mapping;
pub mod pivot;
pub mod portfolio;
pub mod schema;
pub mod series;
pub mod source;
pub mod utils;

#[cfg(test)]
mod props;

pub use breakdown::{
    breakdown_by, breakdown_by_branch, breakdown_by_product, resolve_breakdown,
    top_n_with_others, Breakdown, NamedValue, ShareRow, ShareTable, OTHERS_LABEL, TOP_GROUPS,
};
pub use calculation::*;
pub use comparison::{BranchComparison, BranchSnapshot, ComparisonBar, ComparisonRow};
pub use config::EngineConfig;
pub use error::{AnalyticsError, Result};
pub use filter::*;
pub use format::*;
pub use ingestion::{load_funding, load_lending, FundingData, Ingested, LendingData};
pub use mapping::{CodeDomain, CodeMapping, CodeMappings, ProductCatalog, Resolve};
pub use pivot::{PivotRow, PivotRowKind, PivotTable};
pub use portfolio::*;
pub use schema::*;
pub use series::*;
pub use source::{fetch_in_batches, InMemorySource, RawRow, RecordSource, RecordStream};
pub use utils::*;

use log::{debug, info};

pub struct BranchAnalytics;

impl BranchAnalytics {
    pub fn funding(
        data: &FundingData,
        mappings: &CodeMappings,
        ctx: &FilterContext,
    ) -> Result<FundingReport> {
        info!(
            "Building funding report from {} saving and {} deposito records",
            data.saving.len(),
            data.deposito.len()
        );
        FundingReport::build(&data.saving, &data.deposito, mappings, ctx)
    }

    pub fn lending(
        data: &LendingData,
        mappings: &CodeMappings,
        ctx: &FilterContext,
    ) -> Result<LendingReport> {
        info!(
            "Building lending report from {} financing and {} rahn records",
            data.financing.len(),
            data.rahn.len()
        );
        LendingReport::build(&data.financing, &data.rahn, mappings, ctx)
    }

    pub fn compare_funding(
        data: &FundingData,
        mappings: &CodeMappings,
        ctx: &FilterContext,
        branch1: &str,
        branch2: &str,
    ) -> Result<BranchComparison> {
        PortfolioAnalysis::new(PortfolioLabels::FUNDING, &data.saving, &data.deposito, mappings)
            .compare_branches(ctx, branch1, branch2)
    }

    pub fn compare_lending(
        data: &LendingData,
        mappings: &CodeMappings,
        ctx: &FilterContext,
        branch1: &str,
        branch2: &str,
    ) -> Result<BranchComparison> {
        PortfolioAnalysis::new(PortfolioLabels::LENDING, &data.financing, &data.rahn, mappings)
            .compare_branches(ctx, branch1, branch2)
    }

    /// JSON schema of a report payload, for the presentation layer.
    pub fn report_schema<T: schemars::JsonSchema>() -> Result<serde_json::Value> {
        let schema = schemars::schema_for!(T);
        debug!("Generated report schema");
        Ok(serde_json::to_value(schema)?)
    }
}

pub fn analyze_funding(
    data: &FundingData,
    mappings: &CodeMappings,
    ctx: &FilterContext,
) -> Result<FundingReport> {
    BranchAnalytics::funding(data, mappings, ctx)
}

pub fn analyze_lending(
    data: &LendingData,
    mappings: &CodeMappings,
    ctx: &FilterContext,
) -> Result<LendingReport> {
    BranchAnalytics::lending(data, mappings, ctx)
}
