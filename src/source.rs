use crate::error::{AnalyticsError, Result};
use crate::filter::DateRange;
use crate::utils::{batch_windows, parse_date};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

pub const DATE_COLUMN: &str = "Tanggal";
pub const BRANCH_COLUMN: &str = "KodeCabang";
pub const PRODUCT_COLUMN: &str = "KodeProduk";
pub const NOMINAL_COLUMN: &str = "Nominal";
pub const OUTSTANDING_COLUMN: &str = "Outstanding";
pub const DISBURSED_COLUMN: &str = "JmlPencairan";
pub const PRINCIPAL_PAID_COLUMN: &str = "ByrPokok";
pub const COLLECTIBILITY_COLUMN: &str = "Kolektibilitas";
pub const PAYMENT_STATUS_COLUMN: &str = "KdStsPemb";
pub const GROUP1_COLUMN: &str = "KodeGrup1";
pub const GROUP2_COLUMN: &str = "KodeGrup2";
pub const COLLECTOR_COLUMN: &str = "KdKolektor";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordStream {
    Deposito,
    Saving,
    Financing,
    Rahn,
}

impl RecordStream {
    pub fn name(&self) -> &'static str {
        match self {
            RecordStream::Deposito => "deposito",
            RecordStream::Saving => "saving",
            RecordStream::Financing => "financing",
            RecordStream::Rahn => "rahn",
        }
    }

    pub fn table_name(&self) -> &'static str {
        match self {
            RecordStream::Deposito => "DepositoData",
            RecordStream::Saving => "SavingData",
            RecordStream::Financing => "FinancingData",
            RecordStream::Rahn => "RahnData",
        }
    }

    /// Column holding the measured amount.
    pub fn value_column(&self) -> &'static str {
        match self {
            RecordStream::Financing => OUTSTANDING_COLUMN,
            _ => NOMINAL_COLUMN,
        }
    }
}

impl fmt::Display for RecordStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One untyped row as a client library returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawRow(pub Map<String, Value>);

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.0.insert(column.to_string(), value.into());
        self
    }

    /// Case-insensitive lookup; an exact match wins.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column).or_else(|| {
            self.0
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    /// The value as a string, with numbers rendered without a fraction when integral.
    /// Null and missing columns give `None`.
    pub fn text(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.trim().to_string()),
            Value::Number(n) => Some(match n.as_i64() {
                Some(i) => i.to_string(),
                None => n.to_string(),
            }),
            other => Some(other.to_string()),
        }
    }
}

impl From<Map<String, Value>> for RawRow {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Read access to the four record streams. Implementations return rows dated
/// within `[from, to)`.
pub trait RecordSource {
    fn fetch(&self, stream: RecordStream, from: NaiveDate, to: NaiveDate) -> Result<Vec<RawRow>>;
}

/// Rows held in memory, keyed by stream. Used by tests and the demo, and as
/// the landing spot for rows loaded by other means.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rows: BTreeMap<RecordStream, Vec<RawRow>>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(mut self, stream: RecordStream, rows: Vec<RawRow>) -> Self {
        self.rows.entry(stream).or_default().extend(rows);
        self
    }

    pub fn insert(&mut self, stream: RecordStream, row: RawRow) {
        self.rows.entry(stream).or_default().push(row);
    }
}

impl RecordSource for InMemorySource {
    fn fetch(&self, stream: RecordStream, from: NaiveDate, to: NaiveDate) -> Result<Vec<RawRow>> {
        let rows = match self.rows.get(&stream) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };

        Ok(rows
            .iter()
            .filter(|row| {
                row.text(DATE_COLUMN)
                    .and_then(|raw| parse_date(&raw).ok())
                    .map_or(false, |date| from <= date && date < to)
            })
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
pub struct BatchFetch {
    pub rows: Vec<RawRow>,
    pub failures: Vec<AnalyticsError>,
    pub batches: usize,
}

impl BatchFetch {
    pub fn all_failed(&self) -> bool {
        self.batches > 0 && self.failures.len() == self.batches
    }
}

/// Fetches `range` in consecutive windows of `batch_days` days. A failed window
/// is logged and skipped; the rows of the others are kept.
pub fn fetch_in_batches<S: RecordSource + ?Sized>(
    source: &S,
    stream: RecordStream,
    range: DateRange,
    batch_days: u32,
) -> BatchFetch {
    let windows = batch_windows(range.start, range.end, batch_days);
    info!(
        "Fetching {} from {} to {} in {} batches",
        stream.table_name(),
        range.start,
        range.end,
        windows.len()
    );

    let mut fetch = BatchFetch {
        batches: windows.len(),
        ..BatchFetch::default()
    };

    for (from, to) in windows {
        match source.fetch(stream, from, to) {
            Ok(rows) => {
                debug!("Batch {} to {}: {} rows", from, to, rows.len());
                fetch.rows.extend(rows);
            }
            Err(err) => {
                warn!("Skipping {} batch {} to {}: {}", stream, from, to, err);
                fetch.failures.push(match err {
                    e @ AnalyticsError::UpstreamFetch { .. } => e,
                    other => AnalyticsError::UpstreamFetch {
                        stream: stream.name().to_string(),
                        from,
                        to,
                        reason: other.to_string(),
                    },
                });
            }
        }
    }

    if fetch.rows.is_empty() {
        warn!(
            "No {} rows found between {} and {}",
            stream, range.start, range.end
        );
    }

    fetch
}
