//! SQLite persistence layer: local index of the treasury exports and the
//! ledger of validation runs.
//!
//! RULE: Only store.rs talks to the database.
//! The engine never sees a connection; it receives materialized tables.

use crate::{
    error::{ReconError, ReconResult},
    loader::{CellSource, FromCells},
    model::{Field, PeriodRow, PeriodTable, Table, YearRow, YearTable},
    report::Verdict,
    types::{Amount, RunId},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, types::Value, Connection, OptionalExtension};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;

pub const PERIOD_TABLE: &str = "epoch_treasury";
pub const YEAR_TABLE: &str = "year_treasury";

/// One recorded validation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub verdict: Verdict,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub report_json: String,
}

pub struct RowStore {
    conn: Connection,
}

impl RowStore {
    /// Open (or create) the index database at `path`.
    pub fn open(path: &Path) -> ReconResult<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ReconResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Create the index and run-ledger tables if they do not exist yet.
    pub fn migrate(&self) -> ReconResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/001_treasury.sql"))?;
        self.migrate_run_ledger()
    }

    /// Create only the run ledger. Safe on an index built by another tool:
    /// dataset tables are left exactly as found.
    pub fn migrate_run_ledger(&self) -> ReconResult<()> {
        self.conn
            .execute_batch(include_str!("../migrations/002_validation_run.sql"))?;
        Ok(())
    }

    // ── Period rows ────────────────────────────────────────────

    pub fn insert_period_row(&self, row: &PeriodRow) -> ReconResult<()> {
        self.conn.execute(
            "INSERT INTO epoch_treasury (
                epoch_no, start_time, end_time, fees_epoch,
                treasury_start, treasury_end, treasury_delta, reserves_start,
                rho, tau, inflow_fees_plus_reserves_est,
                treasury_donations, pot_transfer_treasury,
                mir_treasury_payments, conway_enacted_withdrawals
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                row.period_index,
                row.start_time.map(|t| t.to_rfc3339()),
                row.end_time.map(|t| t.to_rfc3339()),
                amount_text(row.fees_collected),
                amount_text(row.balance_start),
                amount_text(row.balance_end),
                amount_text(row.balance_delta),
                amount_text(row.reserves_start),
                row.monetary_expansion_rate,
                row.treasury_cut_rate,
                amount_text(row.estimated_inflow),
                amount_text(row.donations_inflow),
                amount_text(row.pot_transfer_inflow),
                amount_text(row.withdrawal_amount_a),
                amount_text(row.withdrawal_amount_b),
            ],
        )?;
        Ok(())
    }

    /// Period rows in insertion order, or None if the table does not exist.
    /// Order is preserved as stored so monotonicity is judged, not imposed.
    pub fn load_periods(&self) -> ReconResult<Option<PeriodTable>> {
        self.load_table(PERIOD_TABLE)
    }

    // ── Year rows ──────────────────────────────────────────────

    pub fn insert_year_row(&self, row: &YearRow) -> ReconResult<()> {
        self.conn.execute(
            "INSERT INTO year_treasury (
                year, epochs, fees_ada, inflow_fees_plus_reserves_ada, treasury_delta_ada
             ) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                row.year,
                row.period_count,
                row.fees_total,
                row.estimated_inflow_total,
                row.balance_delta_total,
            ],
        )?;
        Ok(())
    }

    pub fn load_years(&self) -> ReconResult<Option<YearTable>> {
        self.load_table(YEAR_TABLE)
    }

    // ── Run ledger ─────────────────────────────────────────────

    pub fn record_run(&self, run: &RunRecord) -> ReconResult<()> {
        self.conn.execute(
            "INSERT INTO validation_run
                (run_id, started_at, verdict, passed, warned, failed, report_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                run.run_id,
                run.started_at.to_rfc3339(),
                run.verdict.to_string(),
                run.passed as i64,
                run.warned as i64,
                run.failed as i64,
                run.report_json,
            ],
        )?;
        log::debug!("recorded validation run {}", run.run_id);
        Ok(())
    }

    pub fn get_run(&self, run_id: &str) -> ReconResult<Option<RunRecord>> {
        let raw = self
            .conn
            .query_row(
                "SELECT run_id, started_at, verdict, passed, warned, failed, report_json
                 FROM validation_run WHERE run_id = ?1",
                params![run_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((run_id, started_at, verdict, passed, warned, failed, report_json)) = raw else {
            return Ok(None);
        };
        let started_at = DateTime::parse_from_rfc3339(&started_at)
            .map_err(|_| ReconError::CellParse {
                row: 1,
                column: "started_at".into(),
                value: started_at.clone(),
            })?
            .with_timezone(&Utc);
        let verdict = verdict.parse::<Verdict>().map_err(|_| ReconError::CellParse {
            row: 1,
            column: "verdict".into(),
            value: verdict.clone(),
        })?;

        Ok(Some(RunRecord {
            run_id,
            started_at,
            verdict,
            passed: passed as usize,
            warned: warned as usize,
            failed: failed as usize,
            report_json,
        }))
    }

    pub fn run_count(&self) -> ReconResult<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM validation_run", [], |row| row.get(0))?;
        Ok(n)
    }

    // ── Internals ──────────────────────────────────────────────

    /// Column names of `table`; empty when the table does not exist.
    fn table_columns(&self, table: &str) -> ReconResult<Vec<String>> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(columns)
    }

    /// Read every required column the table carries, in rowid order.
    /// Tables written by other tools may lack columns; the engine reports those.
    /// Views and WITHOUT ROWID tables have no rowid and are read in their
    /// natural order.
    fn load_table<F: Field, R: FromCells<F>>(&self, table: &str) -> ReconResult<Option<Table<F, R>>> {
        let columns = self.table_columns(table)?;
        if columns.is_empty() {
            return Ok(None);
        }

        let present: Vec<F> = columns.iter().filter_map(|c| F::from_column(c)).collect();
        let select = if present.is_empty() {
            "NULL".to_string()
        } else {
            present
                .iter()
                .map(|f| format!("\"{}\"", f.column()))
                .collect::<Vec<_>>()
                .join(", ")
        };

        let natural = format!("SELECT {select} FROM \"{table}\"");
        let mut stmt = match self.conn.prepare(&format!("{natural} ORDER BY rowid")) {
            Ok(stmt) => stmt,
            Err(e) => {
                log::debug!("{table} has no rowid ({e}), reading in natural order");
                self.conn.prepare(&natural)?
            }
        };
        let mut query = stmt.query([])?;

        let mut rows = Vec::new();
        while let Some(row) = query.next()? {
            let mut values = BTreeMap::new();
            for (i, field) in present.iter().enumerate() {
                values.insert(*field, row.get::<_, Value>(i)?);
            }
            rows.push(R::from_cells(&SqlCells { values, row: rows.len() + 1 })?);
        }

        log::debug!("loaded {} rows from {table}", rows.len());
        Ok(Some(Table::with_columns(present, rows)))
    }
}

/// Decimal has no SQLite mapping; bind its text and let column affinity
/// decide the storage class.
fn amount_text(amount: Option<Amount>) -> Option<String> {
    amount.map(|a| a.to_string())
}

struct SqlCells<F> {
    values: BTreeMap<F, Value>,
    row: usize,
}

impl<F: Field> CellSource<F> for SqlCells<F> {
    fn raw(&self, field: F) -> Option<Cow<'_, str>> {
        match self.values.get(&field)? {
            Value::Null => None,
            Value::Integer(i) => Some(Cow::Owned(i.to_string())),
            Value::Real(f) => Some(Cow::Owned(f.to_string())),
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Blob(_) => Some(Cow::Borrowed("<blob>")),
        }
    }

    fn row_number(&self) -> usize {
        self.row
    }
}
