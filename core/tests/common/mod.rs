//! Shared dataset builders for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use treasury_recon_core::model::{PeriodRow, YearRow};

pub const OPENING_BALANCE: i64 = 1_000_000_000_000;
pub const INFLOW: i64 = 1_000_000;

/// Whole smallest-unit amount.
pub fn amount(v: i64) -> Decimal {
    Decimal::from(v)
}

pub fn genesis() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 7, 29, 21, 44, 51).unwrap()
}

/// `n` internally consistent periods starting at `first_index`: sequential,
/// reconciling exactly, continuous balances. The first period has no prior
/// balance, like a real series.
pub fn consistent_periods(first_index: i64, n: usize) -> Vec<PeriodRow> {
    let mut rows = Vec::with_capacity(n);
    let mut balance = OPENING_BALANCE;
    for i in 0..n {
        let start = genesis() + Duration::days(5 * i as i64);
        let (balance_start, delta) = if i == 0 {
            (None, None)
        } else {
            (Some(amount(balance)), Some(amount(INFLOW)))
        };
        if i > 0 {
            balance += INFLOW;
        }
        rows.push(PeriodRow {
            period_index: Some(first_index + i as i64),
            start_time: Some(start),
            end_time: Some(start + Duration::days(5)),
            fees_collected: Some(amount(50_000_000)),
            balance_start,
            balance_end: Some(amount(balance)),
            balance_delta: delta,
            reserves_start: Some(amount(13_000_000_000_000_000)),
            monetary_expansion_rate: Some(0.003),
            treasury_cut_rate: Some(0.2),
            estimated_inflow: Some(amount(INFLOW)),
            donations_inflow: Some(Decimal::ZERO),
            pot_transfer_inflow: Some(Decimal::ZERO),
            withdrawal_amount_a: Some(Decimal::ZERO),
            withdrawal_amount_b: Some(Decimal::ZERO),
        });
    }
    rows
}

/// Rows carrying only a period index.
pub fn indexed(indices: &[Option<i64>]) -> Vec<PeriodRow> {
    indices
        .iter()
        .map(|i| PeriodRow {
            period_index: *i,
            ..Default::default()
        })
        .collect()
}

pub fn year(year: i32, period_count: u32) -> YearRow {
    YearRow {
        year: Some(year),
        period_count: Some(period_count),
        fees_total: Some(1_500_000.0),
        estimated_inflow_total: Some(200_000_000.0),
        balance_delta_total: Some(150_000_000.0),
    }
}

/// 2017 partial, full years, then the current partial year.
pub fn consistent_years() -> Vec<YearRow> {
    vec![
        year(2017, 19),
        year(2018, 73),
        year(2019, 73),
        year(2020, 73),
        year(2021, 73),
        year(2022, 73),
        year(2023, 73),
        year(2024, 41),
    ]
}

pub fn messages(result: &treasury_recon_core::ValidationResult) -> Vec<String> {
    result
        .findings()
        .iter()
        .map(|f| f.message().to_string())
        .collect()
}
