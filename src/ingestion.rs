use crate::config::EngineConfig;
use crate::error::{AnalyticsError, Result};
use crate::filter::DateRange;
use crate::schema::{BalanceRecord, Collectibility, LendingRecord, RahnRecord};
use crate::source::{
    fetch_in_batches, RawRow, RecordSource, RecordStream, BRANCH_COLUMN, COLLECTIBILITY_COLUMN,
    COLLECTOR_COLUMN, DATE_COLUMN, DISBURSED_COLUMN, GROUP1_COLUMN, GROUP2_COLUMN,
    NOMINAL_COLUMN, OUTSTANDING_COLUMN, PAYMENT_STATUS_COLUMN, PRINCIPAL_PAID_COLUMN,
    PRODUCT_COLUMN,
};
use crate::utils::parse_date;
use chrono::NaiveDate;
use log::{debug, warn};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Typed records plus everything that went wrong turning rows into them.
#[derive(Debug)]
pub struct Ingested<T> {
    pub records: Vec<T>,
    pub issues: Vec<AnalyticsError>,
}

impl<T> Default for Ingested<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            issues: Vec::new(),
        }
    }
}

fn decimal_from_text(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .ok()
}

/// Numbers and numeric strings; anything else counts as zero.
fn amount(row: &RawRow, column: &str) -> Decimal {
    let parsed = match row.get(column) {
        Some(Value::Number(n)) => {
            decimal_from_text(&n.to_string()).or_else(|| n.as_f64().and_then(Decimal::from_f64))
        }
        Some(Value::String(s)) => decimal_from_text(s),
        _ => None,
    };
    parsed.unwrap_or(Decimal::ZERO)
}

fn code(row: &RawRow, column: &str) -> String {
    row.text(column).unwrap_or_default()
}

fn optional_code(row: &RawRow, column: &str) -> Option<String> {
    row.text(column).filter(|c| !c.is_empty())
}

fn collectibility(row: &RawRow, issues: &mut Vec<AnalyticsError>) -> Collectibility {
    let raw = match row.text(COLLECTIBILITY_COLUMN) {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Collectibility::default(),
    };

    let code = raw
        .parse::<i64>()
        .ok()
        .or_else(|| decimal_from_text(&raw).filter(|d| d.fract().is_zero())?.to_i64());

    match code.map(Collectibility::try_from) {
        Some(Ok(value)) => value,
        Some(Err(err)) => {
            warn!("{}; treating as current", err);
            issues.push(err);
            Collectibility::default()
        }
        None => {
            warn!("Unreadable collectibility '{}'; treating as current", raw);
            Collectibility::default()
        }
    }
}

/// First missing required column, judged on the first row.
fn missing_column(stream: RecordStream, first: &RawRow) -> Option<&'static str> {
    let keys = [DATE_COLUMN, BRANCH_COLUMN, PRODUCT_COLUMN];
    if let Some(column) = keys.into_iter().find(|c| !first.has_column(c)) {
        return Some(column);
    }

    let value = stream.value_column();
    let derivable = stream == RecordStream::Financing
        && first.has_column(DISBURSED_COLUMN)
        && first.has_column(PRINCIPAL_PAID_COLUMN);
    if !first.has_column(value) && !derivable {
        return Some(value);
    }
    None
}

/// Shared row walk: column check, date parsing and per-row conversion.
fn ingest<T, F>(stream: RecordStream, rows: &[RawRow], mut convert: F) -> Ingested<T>
where
    F: FnMut(&RawRow, NaiveDate, &mut Vec<AnalyticsError>) -> T,
{
    let mut out = Ingested::default();
    let first = match rows.first() {
        Some(first) => first,
        None => return out,
    };

    if let Some(column) = missing_column(stream, first) {
        let err = AnalyticsError::MissingColumn {
            stream: stream.name().to_string(),
            column: column.to_string(),
        };
        warn!("{}; {} data will be empty", err, stream);
        out.issues.push(err);
        return out;
    }

    let mut invalid_dates = 0usize;
    for row in rows {
        let date = row.text(DATE_COLUMN).and_then(|raw| parse_date(&raw).ok());
        match date {
            Some(date) => {
                let record = convert(row, date, &mut out.issues);
                out.records.push(record);
            }
            None => invalid_dates += 1,
        }
    }

    if invalid_dates > 0 {
        warn!("Removed {} {} rows with invalid dates", invalid_dates, stream);
        out.issues.push(AnalyticsError::DateError(format!(
            "{} {} rows had an invalid {}",
            invalid_dates, stream, DATE_COLUMN
        )));
    }
    debug!("Ingested {} {} records", out.records.len(), stream);

    out
}

pub fn balance_records(stream: RecordStream, rows: &[RawRow]) -> Ingested<BalanceRecord> {
    ingest(stream, rows, |row, date, _| {
        BalanceRecord::new(
            date,
            code(row, BRANCH_COLUMN),
            code(row, PRODUCT_COLUMN),
            amount(row, NOMINAL_COLUMN),
        )
    })
}

/// Outstanding comes from its own column when present, else disbursed minus principal paid.
pub fn lending_records(rows: &[RawRow]) -> Ingested<LendingRecord> {
    ingest(RecordStream::Financing, rows, |row, date, issues| {
        let disbursed = amount(row, DISBURSED_COLUMN);
        let principal_paid = amount(row, PRINCIPAL_PAID_COLUMN);

        let mut record = LendingRecord::new(
            date,
            code(row, BRANCH_COLUMN),
            code(row, PRODUCT_COLUMN),
            collectibility(row, issues),
            disbursed,
            principal_paid,
        )
        .with_groups(optional_code(row, GROUP1_COLUMN), optional_code(row, GROUP2_COLUMN))
        .with_collector(optional_code(row, COLLECTOR_COLUMN))
        .with_payment_status(optional_code(row, PAYMENT_STATUS_COLUMN));

        if row.has_column(OUTSTANDING_COLUMN) {
            record.outstanding = amount(row, OUTSTANDING_COLUMN);
        }
        record
    })
}

pub fn rahn_records(rows: &[RawRow]) -> Ingested<RahnRecord> {
    ingest(RecordStream::Rahn, rows, |row, date, issues| {
        RahnRecord::new(
            date,
            code(row, BRANCH_COLUMN),
            code(row, PRODUCT_COLUMN),
            collectibility(row, issues),
            amount(row, NOMINAL_COLUMN),
        )
    })
}

#[derive(Debug, Default)]
pub struct FundingData {
    pub saving: Vec<BalanceRecord>,
    pub deposito: Vec<BalanceRecord>,
    pub issues: Vec<AnalyticsError>,
}

#[derive(Debug, Default)]
pub struct LendingData {
    pub financing: Vec<LendingRecord>,
    pub rahn: Vec<RahnRecord>,
    pub issues: Vec<AnalyticsError>,
}

fn fetch_rows<S: RecordSource + ?Sized>(
    source: &S,
    stream: RecordStream,
    range: DateRange,
    config: &EngineConfig,
    issues: &mut Vec<AnalyticsError>,
) -> Vec<RawRow> {
    let fetch = fetch_in_batches(source, stream, range, config.fetch_batch_days);
    issues.extend(fetch.failures);
    fetch.rows
}

/// Loads savings and deposito for `range`. Fetch and row problems end up in
/// `issues`; only an invalid config is an error.
pub fn load_funding<S: RecordSource + ?Sized>(
    source: &S,
    range: DateRange,
    config: &EngineConfig,
) -> Result<FundingData> {
    config.validate()?;
    let mut data = FundingData::default();

    let rows = fetch_rows(source, RecordStream::Saving, range, config, &mut data.issues);
    let saving = balance_records(RecordStream::Saving, &rows);
    data.saving = saving.records;
    data.issues.extend(saving.issues);

    let rows = fetch_rows(source, RecordStream::Deposito, range, config, &mut data.issues);
    let deposito = balance_records(RecordStream::Deposito, &rows);
    data.deposito = deposito.records;
    data.issues.extend(deposito.issues);

    Ok(data)
}

pub fn load_lending<S: RecordSource + ?Sized>(
    source: &S,
    range: DateRange,
    config: &EngineConfig,
) -> Result<LendingData> {
    config.validate()?;
    let mut data = LendingData::default();

    let rows = fetch_rows(source, RecordStream::Financing, range, config, &mut data.issues);
    let financing = lending_records(&rows);
    data.financing = financing.records;
    data.issues.extend(financing.issues);

    let rows = fetch_rows(source, RecordStream::Rahn, range, config, &mut data.issues);
    let rahn = rahn_records(&rows);
    data.rahn = rahn.records;
    data.issues.extend(rahn.issues);

    Ok(data)
}
