//! Rendering of amounts and percentages for dashboard tables.
//!
//! Currency strings follow the `Rp {value / 1_000_000:,.2f} Juta` convention that
//! existing exports rely on, so the output here must stay byte-for-byte stable.

use crate::schema::GrowthUnit;
use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const MILLION: f64 = 1_000_000.0;

/// Inserts comma thousands separators into an already-rendered decimal string.
fn group_thousands(rendered: &str) -> String {
    let (sign, digits) = match rendered.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", rendered),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (idx, ch) in int_part.chars().enumerate() {
        if idx > 0 && (int_part.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

/// Fixed-point rendering with comma grouping. Rounds the nearest `f64`, so
/// `1.005` gives `1.00` and a small negative value keeps its sign (`-0.00`).
pub fn format_float(value: f64, decimals: usize) -> String {
    group_thousands(&format!("{:.*}", decimals, value))
}

/// A zero `Decimal` maps to `0.0` whatever its sign bit.
fn to_float(value: Decimal) -> f64 {
    if value.is_zero() {
        return 0.0;
    }
    value.to_f64().unwrap_or(0.0)
}

pub fn format_decimal(value: Decimal, decimals: usize) -> String {
    format_float(to_float(value), decimals)
}

fn rupiah_millions(value: Decimal, decimals: usize) -> String {
    let millions = to_float(value) / MILLION;
    format!("Rp {} Juta", format_float(millions, decimals))
}

/// `Rp 1,234.57 Juta` for 1,234,567,890.
pub fn format_rupiah_millions(value: Decimal) -> String {
    rupiah_millions(value, 2)
}

/// Whole millions, `Rp 1,235 Juta`, as used for group share tables.
pub fn format_rupiah_millions_whole(value: Decimal) -> String {
    rupiah_millions(value, 0)
}

pub fn format_percent(value: f64, decimals: usize) -> String {
    format!("{}%", format_float(value, decimals))
}

/// `Rp 500.00 Juta (50.0%)`
pub fn format_change(change: Decimal, growth: f64) -> String {
    format!(
        "{} ({})",
        format_rupiah_millions(change),
        format_percent(growth, 1)
    )
}

pub fn format_growth(value: f64, unit: GrowthUnit) -> String {
    match unit {
        GrowthUnit::Percentage => format_percent(value, 2),
        GrowthUnit::Nominal => {
            format!("Rp {} Juta", format_float(value / MILLION, 2))
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
