//! CSV row source. Deserializes the upstream exports into typed tables.
//!
//! The header decides which required columns are present; the engine judges
//! missing ones. Empty cells are null. A cell that is present but cannot be
//! read is a load error naming its row and column.

use crate::{
    engine::DatasetInput,
    error::{ReconError, ReconResult},
    model::{Field, PeriodField, PeriodRow, PeriodTable, Table, YearField, YearRow, YearTable},
    types::Amount,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_PERIOD_PATH: &str = "outputs/epoch_treasury_fees.csv";
pub const DEFAULT_YEAR_PATH: &str = "outputs/year_treasury_fees.csv";

/// Tokens dataframe exporters write for a missing value.
const NULL_TOKENS: &[&str] = &["nan", "NaN", "NaT", "None", "null", "NULL"];

// ── Inputs ───────────────────────────────────────────────────────

/// Load a period CSV, turning absence and unreadable files into inputs the
/// engine reports instead of errors the caller has to handle.
pub fn period_input(path: &Path) -> DatasetInput<PeriodTable> {
    let source = path.display().to_string();
    if !path.exists() {
        return DatasetInput::missing(source);
    }
    match read_period_csv(path) {
        Ok(table) => DatasetInput::loaded(source, table),
        Err(e) => DatasetInput::failed(source, e),
    }
}

pub fn year_input(path: &Path) -> DatasetInput<YearTable> {
    let source = path.display().to_string();
    if !path.exists() {
        return DatasetInput::missing(source);
    }
    match read_year_csv(path) {
        Ok(table) => DatasetInput::loaded(source, table),
        Err(e) => DatasetInput::failed(source, e),
    }
}

pub fn read_period_csv(path: &Path) -> ReconResult<PeriodTable> {
    let file = open(path)?;
    let table = parse_period_csv(file)?;
    log::debug!("read {} period rows from {}", table.len(), path.display());
    Ok(table)
}

pub fn read_year_csv(path: &Path) -> ReconResult<YearTable> {
    let file = open(path)?;
    let table = parse_year_csv(file)?;
    log::debug!("read {} year rows from {}", table.len(), path.display());
    Ok(table)
}

fn open(path: &Path) -> ReconResult<File> {
    File::open(path).map_err(|source| ReconError::Io {
        path: path.display().to_string(),
        source,
    })
}

// ── Parsing ──────────────────────────────────────────────────────

pub fn parse_period_csv<R: Read>(reader: R) -> ReconResult<PeriodTable> {
    parse_csv(reader)
}

pub fn parse_year_csv<R: Read>(reader: R) -> ReconResult<YearTable> {
    parse_csv(reader)
}

fn parse_csv<F: Field, T: FromCells<F>, R: Read>(reader: R) -> ReconResult<Table<F, T>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    // Position of every required column found in the header. Extra columns
    // (e.g. the `*_ada` convenience columns) are ignored.
    let index: BTreeMap<F, usize> = csv
        .headers()?
        .iter()
        .enumerate()
        .filter_map(|(pos, name)| F::from_column(name).map(|f| (f, pos)))
        .collect();

    let mut rows = Vec::new();
    for (i, record) in csv.records().enumerate() {
        let record = record?;
        rows.push(T::from_cells(&CsvCells { record: &record, row: i + 1, index: &index })?);
    }

    Ok(Table::with_columns(index.keys().copied(), rows))
}

// ── Row construction ─────────────────────────────────────────────

/// Raw cell access shared by the CSV and SQLite sources.
pub(crate) trait CellSource<F: Field> {
    /// Text of the cell, or None when the column is absent or the cell is SQL NULL.
    fn raw(&self, field: F) -> Option<Cow<'_, str>>;

    /// 1-based data row, header excluded.
    fn row_number(&self) -> usize;

    fn get<T>(&self, field: F, parse: fn(&str) -> Option<T>) -> ReconResult<Option<T>> {
        let Some(raw) = self.raw(field) else {
            return Ok(None);
        };
        let raw = raw.trim();
        if is_null(raw) {
            return Ok(None);
        }
        parse(raw).map(Some).ok_or_else(|| ReconError::CellParse {
            row: self.row_number(),
            column: field.column().to_string(),
            value: raw.to_string(),
        })
    }
}

/// A row type that can be built from any cell source.
pub(crate) trait FromCells<F: Field>: Sized {
    fn from_cells<C: CellSource<F>>(cells: &C) -> ReconResult<Self>;
}

impl FromCells<PeriodField> for PeriodRow {
    fn from_cells<C: CellSource<PeriodField>>(cells: &C) -> ReconResult<Self> {
        Ok(PeriodRow {
            period_index:            cells.get(PeriodField::PeriodIndex, parse_integer)?,
            start_time:              cells.get(PeriodField::StartTime, parse_timestamp)?,
            end_time:                cells.get(PeriodField::EndTime, parse_timestamp)?,
            fees_collected:          cells.get(PeriodField::FeesCollected, parse_amount)?,
            balance_start:           cells.get(PeriodField::BalanceStart, parse_amount)?,
            balance_end:             cells.get(PeriodField::BalanceEnd, parse_amount)?,
            balance_delta:           cells.get(PeriodField::BalanceDelta, parse_amount)?,
            reserves_start:          cells.get(PeriodField::ReservesStart, parse_amount)?,
            monetary_expansion_rate: cells.get(PeriodField::MonetaryExpansionRate, parse_f64)?,
            treasury_cut_rate:       cells.get(PeriodField::TreasuryCutRate, parse_f64)?,
            estimated_inflow:        cells.get(PeriodField::EstimatedInflow, parse_amount)?,
            donations_inflow:        cells.get(PeriodField::DonationsInflow, parse_amount)?,
            pot_transfer_inflow:     cells.get(PeriodField::PotTransferInflow, parse_amount)?,
            withdrawal_amount_a:     cells.get(PeriodField::WithdrawalAmountA, parse_amount)?,
            withdrawal_amount_b:     cells.get(PeriodField::WithdrawalAmountB, parse_amount)?,
        })
    }
}

impl FromCells<YearField> for YearRow {
    fn from_cells<C: CellSource<YearField>>(cells: &C) -> ReconResult<Self> {
        Ok(YearRow {
            year:                   cells.get(YearField::Year, parse_year)?,
            period_count:           cells.get(YearField::PeriodCount, parse_count)?,
            fees_total:             cells.get(YearField::FeesTotal, parse_f64)?,
            estimated_inflow_total: cells.get(YearField::EstimatedInflowTotal, parse_f64)?,
            balance_delta_total:    cells.get(YearField::BalanceDeltaTotal, parse_f64)?,
        })
    }
}

struct CsvCells<'a, F> {
    record: &'a csv::StringRecord,
    row: usize,
    index: &'a BTreeMap<F, usize>,
}

impl<F: Field> CellSource<F> for CsvCells<'_, F> {
    fn raw(&self, field: F) -> Option<Cow<'_, str>> {
        let pos = self.index.get(&field)?;
        self.record.get(*pos).map(Cow::Borrowed)
    }

    fn row_number(&self) -> usize {
        self.row
    }
}

fn is_null(cell: &str) -> bool {
    cell.is_empty() || NULL_TOKENS.contains(&cell)
}

// ── Cell parsers ─────────────────────────────────────────────────

/// Plain or scientific decimal text ("1000", "1000000.25", "1.5e6").
fn parse_amount(s: &str) -> Option<Amount> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Integer text, or decimal text with no fractional part ("208.0"), which is
/// how dataframe exports write integer columns that contain nulls.
fn parse_integer(s: &str) -> Option<i64> {
    s.parse::<i64>().ok().or_else(|| {
        let v: f64 = s.parse().ok()?;
        whole_f64(v)
    })
}

fn whole_f64(v: f64) -> Option<i64> {
    // 2^63 is exactly representable; anything at or beyond it does not fit.
    let in_range = v >= -9_223_372_036_854_775_808.0 && v < 9_223_372_036_854_775_808.0;
    (v.is_finite() && v.fract() == 0.0 && in_range).then_some(v as i64)
}

fn parse_f64(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_year(s: &str) -> Option<i32> {
    parse_integer(s).and_then(|v| i32::try_from(v).ok())
}

fn parse_count(s: &str) -> Option<u32> {
    parse_integer(s).and_then(|v| u32::try_from(v).ok())
}

/// RFC 3339, SQL-style timestamps with or without offset. Naive values are UTC.
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}
