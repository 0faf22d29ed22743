use crate::calculation::sum_amounts;
use crate::format::format_rupiah_millions;
use crate::mapping::{CodeMappings, Resolve};
use crate::schema::{Measured, PortfolioLabels};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::Serialize;
use std::collections::BTreeMap;

pub const TOTAL_PRODUCT_COLUMN: &str = "Total Product";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
pub enum PivotRowKind {
    #[schemars(description = "One product of either series")]
    Product,

    #[schemars(description = "Sum of all product rows of one series")]
    Subtotal,

    #[schemars(description = "Sum of every product row")]
    GrandTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PivotRow {
    pub label: String,
    pub kind: PivotRowKind,
    /// One cell per branch column, then the row total.
    pub cells: Vec<Decimal>,
}

/// Product x branch cross-tab over the filtered range.
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct PivotTable {
    pub branch_codes: Vec<String>,
    /// Branch names followed by `Total Product`.
    pub columns: Vec<String>,
    pub rows: Vec<PivotRow>,
}

/// product code -> branch code -> summed amount
fn cross_tab<R: Measured>(records: &[R]) -> BTreeMap<String, BTreeMap<String, Decimal>> {
    let mut tab: BTreeMap<String, BTreeMap<String, Decimal>> = BTreeMap::new();
    for record in records {
        let slot = tab
            .entry(record.product_code().to_string())
            .or_default()
            .entry(record.branch_code().to_string())
            .or_insert(Decimal::ZERO);
        *slot = slot.saturating_add(record.amount());
    }
    tab
}

fn product_rows<R, F>(records: &[R], branch_codes: &[String], label: F) -> Vec<PivotRow>
where
    R: Measured,
    F: Fn(&str) -> String,
{
    cross_tab(records)
        .into_iter()
        .map(|(product, by_branch)| {
            let mut cells: Vec<Decimal> = branch_codes
                .iter()
                .map(|code| by_branch.get(code).copied().unwrap_or(Decimal::ZERO))
                .collect();
            cells.push(sum_amounts(cells.iter().copied()));
            PivotRow {
                label: label(&product),
                kind: PivotRowKind::Product,
                cells,
            }
        })
        .collect()
}

fn sum_rows(rows: &[PivotRow], label: String, kind: PivotRowKind, width: usize) -> PivotRow {
    let mut cells = vec![Decimal::ZERO; width];
    for row in rows {
        for (total, cell) in cells.iter_mut().zip(&row.cells) {
            *total = total.saturating_add(*cell);
        }
    }
    PivotRow { label, kind, cells }
}

impl PivotTable {
    /// Records outside `branch_codes` do not contribute to any cell.
    pub fn build<A, B>(
        a: &[A],
        b: &[B],
        branch_codes: &[String],
        labels: &PortfolioLabels,
        mappings: &CodeMappings,
    ) -> Self
    where
        A: Measured,
        B: Measured,
    {
        let width = branch_codes.len() + 1;
        let product_a = product_rows(a, branch_codes, |code| {
            labels.product_a(&mappings.products_a.resolve(code))
        });
        let product_b = product_rows(b, branch_codes, |code| {
            labels.product_b(&mappings.products_b.resolve(code))
        });

        let subtotal_a = sum_rows(&product_a, labels.total_a(), PivotRowKind::Subtotal, width);
        let subtotal_b = sum_rows(&product_b, labels.total_b(), PivotRowKind::Subtotal, width);
        let grand = sum_rows(
            &[subtotal_a.clone(), subtotal_b.clone()],
            labels.total_overall(),
            PivotRowKind::GrandTotal,
            width,
        );

        let mut rows = product_a;
        rows.extend(product_b);
        rows.push(subtotal_a);
        rows.push(subtotal_b);
        rows.push(grand);

        let mut columns: Vec<String> = branch_codes
            .iter()
            .map(|code| mappings.branches.resolve(code))
            .collect();
        columns.push(TOTAL_PRODUCT_COLUMN.to_string());

        Self {
            branch_codes: branch_codes.to_vec(),
            columns,
            rows,
        }
    }

    /// Bottom-right cell: everything in the table.
    pub fn grand_total(&self) -> Decimal {
        self.rows
            .iter()
            .find(|row| row.kind == PivotRowKind::GrandTotal)
            .and_then(|row| row.cells.last().copied())
            .unwrap_or(Decimal::ZERO)
    }

    pub fn product_rows(&self) -> impl Iterator<Item = &PivotRow> {
        self.rows.iter().filter(|row| row.kind == PivotRowKind::Product)
    }

    /// Row label followed by each cell as `Rp .. Juta`.
    pub fn formatted(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                std::iter::once(row.label.clone())
                    .chain(row.cells.iter().map(|cell| format_rupiah_millions(*cell)))
                    .collect()
            })
            .collect()
    }
}
