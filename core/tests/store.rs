//! SQLite index and run ledger.

mod common;

use common::{amount, consistent_periods, consistent_years};
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::TempDir;
use treasury_recon_core::{
    model::PeriodField,
    store::RowStore,
    DatasetInput, ReconEngine, ValidationPolicy, Verdict,
};

fn migrated() -> RowStore {
    let store = RowStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
}

#[test]
fn period_rows_round_trip_in_insertion_order() {
    let store = migrated();
    let mut rows = consistent_periods(300, 6);
    rows.swap(2, 4); // stored order must be kept, not sorted
    for row in &rows {
        store.insert_period_row(row).expect("insert period");
    }

    let table = store.load_periods().expect("load").expect("table exists");
    assert!(table.missing_columns().is_empty());
    assert_eq!(table.rows, rows);
}

#[test]
fn year_rows_round_trip() {
    let store = migrated();
    let rows = consistent_years();
    for row in &rows {
        store.insert_year_row(row).expect("insert year");
    }

    let table = store.load_years().expect("load").expect("table exists");
    assert_eq!(table.rows, rows);
}

#[test]
fn absent_tables_load_as_none() {
    let store = RowStore::in_memory().expect("in-memory store");
    assert!(store.load_periods().expect("load").is_none());
    assert!(store.load_years().expect("load").is_none());
}

#[test]
fn migration_is_idempotent() {
    let store = migrated();
    store.migrate().expect("second migration");
    assert_eq!(store.run_count().expect("count"), 0);
}

#[test]
fn partial_upstream_table_reports_missing_columns() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("index.sqlite");
    {
        let conn = Connection::open(&path).expect("open");
        conn.execute_batch(
            "CREATE TABLE epoch_treasury (epoch_no INTEGER, fees_epoch REAL, note TEXT);
             INSERT INTO epoch_treasury VALUES (1, 10.0, 'a'), (2, -3.0, 'b'), (4, 7, NULL);",
        )
        .expect("seed table");
    }

    let store = RowStore::open(&path).expect("open store");
    let table = store.load_periods().expect("load").expect("table exists");

    assert_eq!(table.len(), 3);
    assert!(table.has(PeriodField::PeriodIndex));
    assert!(!table.has(PeriodField::BalanceEnd));
    assert_eq!(table.rows[1].fees_collected, Some(amount(-3)));

    let input = DatasetInput::loaded("index.sqlite#epoch_treasury", table);
    let outcome = ReconEngine::new(ValidationPolicy::default()).run(Some(&input), None);
    let summary = outcome.summary();

    assert_eq!(summary.verdict, Verdict::Fail);
    assert!(summary.text.contains("Missing columns"), "{}", summary.text);
    assert!(summary.text.contains("1 periods have negative fees"), "{}", summary.text);
    assert!(summary.text.contains("increasing but has gaps"), "{}", summary.text);
}

#[test]
fn fractional_amounts_survive_the_index() {
    let store = migrated();
    let mut rows = consistent_periods(1, 2);
    rows[1].estimated_inflow = Some(Decimal::from_str("1000000.25").expect("decimal"));
    for row in &rows {
        store.insert_period_row(row).expect("insert period");
    }

    let table = store.load_periods().expect("load").expect("table exists");
    assert_eq!(table.rows, rows);
}

#[test]
fn fractional_real_column_loads() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("index.sqlite");
    {
        let conn = Connection::open(&path).expect("open");
        conn.execute_batch(
            "CREATE TABLE epoch_treasury (epoch_no INTEGER, inflow_fees_plus_reserves_est REAL);
             INSERT INTO epoch_treasury VALUES (1, NULL), (2, 1000000.25);",
        )
        .expect("seed table");
    }

    let store = RowStore::open(&path).expect("open store");
    let table = store.load_periods().expect("load").expect("table exists");
    assert_eq!(
        table.rows[1].estimated_inflow,
        Some(Decimal::from_str("1000000.25").expect("decimal"))
    );
}

#[test]
fn views_and_without_rowid_tables_load_in_natural_order() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("index.sqlite");
    {
        let conn = Connection::open(&path).expect("open");
        conn.execute_batch(
            "CREATE TABLE raw_epochs (epoch_no INTEGER, fees_epoch INTEGER);
             INSERT INTO raw_epochs VALUES (7, 70), (8, 80);
             CREATE VIEW epoch_treasury AS SELECT epoch_no, fees_epoch FROM raw_epochs;
             CREATE TABLE year_treasury (year INTEGER PRIMARY KEY, epochs INTEGER) WITHOUT ROWID;
             INSERT INTO year_treasury VALUES (2020, 73), (2021, 73);",
        )
        .expect("seed tables");
    }

    let store = RowStore::open(&path).expect("open store");

    let periods = store.load_periods().expect("view loads").expect("view exists");
    let indices: Vec<_> = periods.rows.iter().map(|r| r.period_index).collect();
    assert_eq!(indices, vec![Some(7), Some(8)]);
    assert_eq!(periods.rows[1].fees_collected, Some(amount(80)));

    let years = store.load_years().expect("table loads").expect("table exists");
    let listed: Vec<_> = years.rows.iter().map(|r| r.year).collect();
    assert_eq!(listed, vec![Some(2020), Some(2021)]);
}

#[test]
fn recording_a_run_leaves_dataset_tables_alone() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("index.sqlite");
    {
        let conn = Connection::open(&path).expect("open");
        conn.execute_batch(
            "CREATE TABLE year_treasury (year INTEGER, epochs INTEGER);
             INSERT INTO year_treasury VALUES (2020, 73);",
        )
        .expect("seed table");
    }

    let store = RowStore::open(&path).expect("open store");
    assert!(store.load_periods().expect("load").is_none());

    let missing = DatasetInput::missing(format!("{}#epoch_treasury", path.display()));
    let engine = ReconEngine::new(ValidationPolicy::default());
    let first = engine.run(Some(&missing), None);
    assert!(first.has_failures());

    store.migrate_run_ledger().expect("ledger migration");
    store
        .record_run(&first.to_run_record().expect("record"))
        .expect("insert run");

    assert!(store.load_periods().expect("load").is_none());
    assert_eq!(store.load_years().expect("load").expect("table exists").len(), 1);
    assert_eq!(store.run_count().expect("count"), 1);
}

#[test]
fn unreadable_cell_is_a_load_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("index.sqlite");
    {
        let conn = Connection::open(&path).expect("open");
        conn.execute_batch(
            "CREATE TABLE year_treasury (year TEXT, epochs INTEGER);
             INSERT INTO year_treasury VALUES ('2020', 73), ('next', 73);",
        )
        .expect("seed table");
    }

    let store = RowStore::open(&path).expect("open store");
    let err = store.load_years().expect_err("bad year must not load");
    assert_eq!(err.to_string(), "Row 2, column 'year': cannot parse 'next'");
}

#[test]
fn run_record_round_trips() {
    let store = migrated();
    let mut rows = consistent_periods(1, 4);
    rows[1].balance_end = Some(amount(-1));
    let input = DatasetInput::loaded("periods", treasury_recon_core::PeriodTable::from_rows(rows));

    let outcome = ReconEngine::new(ValidationPolicy::default()).run(Some(&input), None);
    let record = outcome.to_run_record().expect("record");
    store.record_run(&record).expect("insert run");

    let loaded = store.get_run(&outcome.run_id).expect("get").expect("run exists");
    assert_eq!(loaded.verdict, Verdict::Fail);
    assert_eq!(loaded.failed, record.failed);
    assert_eq!(loaded.report_json, record.report_json);
    assert_eq!(loaded.started_at.timestamp_micros(), record.started_at.timestamp_micros());

    assert_eq!(store.run_count().expect("count"), 1);
    assert!(store.get_run("no-such-run").expect("get").is_none());
}

#[test]
fn duplicate_run_id_is_rejected() {
    let store = migrated();
    let outcome = ReconEngine::new(ValidationPolicy::default()).run(None, None);
    let record = outcome.to_run_record().expect("record");

    store.record_run(&record).expect("first insert");
    assert!(store.record_run(&record).is_err());
}
