use crate::calculation::{share_percentage, sum_amounts};
use crate::format::{format_percent, format_rupiah_millions_whole};
use crate::mapping::Resolve;
use crate::schema::Measured;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

/// Number of bars kept before the remainder is folded into "Others". Not configurable.
pub const TOP_GROUPS: usize = 20;
pub const OTHERS_LABEL: &str = "Others";

/// Summed amount per code.
pub type Breakdown = BTreeMap<String, Decimal>;

pub fn breakdown_by<R, F>(records: &[R], key: F) -> Breakdown
where
    R: Measured,
    F: Fn(&R) -> Option<&str>,
{
    let mut totals = Breakdown::new();
    for record in records {
        if let Some(code) = key(record) {
            let slot = totals.entry(code.to_string()).or_insert(Decimal::ZERO);
            *slot = slot.saturating_add(record.amount());
        }
    }
    totals
}

pub fn breakdown_by_branch<R: Measured>(records: &[R]) -> Breakdown {
    breakdown_by(records, |r| Some(r.branch_code()))
}

pub fn breakdown_by_product<R: Measured>(records: &[R]) -> Breakdown {
    breakdown_by(records, |r| Some(r.product_code()))
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct NamedValue {
    /// `None` for synthetic rows such as "Others".
    pub code: Option<String>,
    pub name: String,
    pub value: Decimal,
}

pub fn resolve_breakdown<N: Resolve>(totals: &Breakdown, names: &N) -> Vec<NamedValue> {
    totals
        .iter()
        .map(|(code, value)| NamedValue {
            code: Some(code.clone()),
            name: names.resolve(code),
            value: *value,
        })
        .collect()
}

fn sorted_descending(totals: &Breakdown) -> Vec<(&String, &Decimal)> {
    let mut entries: Vec<_> = totals.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    entries
}

/// The `TOP_GROUPS` largest groups, then one "Others" entry holding the rest (0 when nothing is left).
pub fn top_n_with_others<N: Resolve>(totals: &Breakdown, names: &N) -> Vec<NamedValue> {
    let entries = sorted_descending(totals);

    let mut bars: Vec<NamedValue> = entries
        .iter()
        .take(TOP_GROUPS)
        .map(|(code, value)| NamedValue {
            code: Some((*code).clone()),
            name: names.resolve(code),
            value: **value,
        })
        .collect();

    let others = sum_amounts(entries.iter().skip(TOP_GROUPS).map(|(_, v)| **v));
    bars.push(NamedValue {
        code: None,
        name: OTHERS_LABEL.to_string(),
        value: others,
    });

    bars
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ShareRow {
    pub name: String,
    pub value: Decimal,
    pub share: f64,
    pub formatted_value: String,
    pub formatted_share: String,
}

impl ShareRow {
    fn new(name: String, value: Decimal, share: f64) -> Self {
        Self {
            formatted_value: format_rupiah_millions_whole(value),
            formatted_share: format_percent(share, 2),
            name,
            value,
            share,
        }
    }
}

/// Every group with its share of the whole, largest first, plus a total row.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ShareTable {
    pub rows: Vec<ShareRow>,
    pub total: ShareRow,
}

impl ShareTable {
    pub fn build<N: Resolve>(totals: &Breakdown, names: &N, total_label: &str) -> Self {
        let whole = sum_amounts(totals.values().copied());
        let rows = sorted_descending(totals)
            .into_iter()
            .map(|(code, value)| {
                ShareRow::new(names.resolve(code), *value, share_percentage(*value, whole))
            })
            .collect();

        Self {
            rows,
            total: ShareRow::new(total_label.to_string(), whole, 100.0),
        }
    }

    pub fn formatted(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .chain(std::iter::once(&self.total))
            .map(|row| {
                vec![
                    row.name.clone(),
                    row.formatted_value.clone(),
                    row.formatted_share.clone(),
                ]
            })
            .collect()
    }
}
