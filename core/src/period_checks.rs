//! Period-level checks.
//!
//! CHECK ORDER (fixed, every check always runs):
//!   1. Schema completeness
//!   2. Monotonicity of the period index
//!   3. Reconciliation of flows against the reported delta
//!   4. Balance continuity across period boundaries
//!   5. Sanity (no negative fees or balances)
//!   6. Freshness (latest end_time, informational)
//!
//! Each check is a single linear pass and returns its own result.
//! A failing check never skips the ones after it.

use crate::{
    config::{ReconciliationPolicy, ValidationPolicy},
    finding::ValidationResult,
    model::{Field, PeriodField, PeriodRow, PeriodTable},
    types::Amount,
};
use rust_decimal::Decimal;

/// Run every period check over `table`.
pub fn validate_periods(table: &PeriodTable, policy: &ValidationPolicy) -> ValidationResult {
    let mut result = ValidationResult::new("Period dataset");
    result.ok(format!("Loaded {} rows", table.len()));

    // Nothing to judge. Vacuous checks would only produce noise.
    if table.is_empty() {
        return result;
    }

    result.merge(check_schema(table));

    if table.has(PeriodField::PeriodIndex) {
        result.merge(check_monotonicity(&table.rows));
    }
    if table.has_all(PeriodField::FLOWS) {
        result.merge(check_reconciliation(&table.rows, &policy.reconciliation));
    }
    if table.has(PeriodField::BalanceStart) && table.has(PeriodField::BalanceEnd) {
        result.merge(check_continuity(&table.rows));
    }
    result.merge(check_sanity(table));
    if table.has(PeriodField::EndTime) {
        result.merge(check_freshness(&table.rows));
    }

    result
}

// ── 1. Schema ────────────────────────────────────────────────────

/// Required columns must exist. A column that is null in every row after the
/// first points at a broken upstream join, which is worth a warning.
pub fn check_schema(table: &PeriodTable) -> ValidationResult {
    let mut r = ValidationResult::default();

    let missing = table.missing_columns();
    if missing.is_empty() {
        r.ok("All required columns present");
    } else {
        r.fail(format!("Missing columns: {missing:?}"));
    }

    if table.len() > 2 {
        for field in PeriodField::ALL {
            if !table.has(*field) {
                continue;
            }
            if table.rows[1..].iter().all(|row| field.is_null(row)) {
                r.warn(format!(
                    "Column '{}' is all-null (after first period)",
                    field.column()
                ));
            }
        }
    }

    r
}

// ── 2. Monotonicity ──────────────────────────────────────────────

/// Successive differences of the defined period indices.
/// All +1 is ok, gaps warn, duplicates or decreases fail.
pub fn check_monotonicity(rows: &[PeriodRow]) -> ValidationResult {
    let mut r = ValidationResult::default();
    let column = PeriodField::PeriodIndex.column();

    let indices: Vec<i128> = rows
        .iter()
        .filter_map(|row| row.period_index)
        .map(i128::from)
        .collect();
    let steps: Vec<i128> = indices.windows(2).map(|w| w[1] - w[0]).collect();

    if steps.iter().all(|s| *s == 1) {
        r.ok(format!("{column} is strictly sequential (+1)"));
    } else if steps.iter().all(|s| *s > 0) {
        let min = steps.iter().min().copied().unwrap_or_default();
        let max = steps.iter().max().copied().unwrap_or_default();
        r.warn(format!(
            "{column} is increasing but has gaps (min step={min}, max step={max})"
        ));
    } else {
        r.fail(format!("{column} is NOT monotonically increasing"));
    }

    r
}

// ── 3. Reconciliation ────────────────────────────────────────────

/// Modeled balance change: inflows minus the two withdrawal mechanisms.
/// Null cells count as zero. Saturates instead of overflowing.
pub fn expected_delta(row: &PeriodRow) -> Amount {
    let v = |cell: Option<Amount>| cell.unwrap_or(Decimal::ZERO);
    v(row.estimated_inflow)
        .saturating_add(v(row.donations_inflow))
        .saturating_add(v(row.pot_transfer_inflow))
        .saturating_sub(v(row.withdrawal_amount_a))
        .saturating_sub(v(row.withdrawal_amount_b))
}

/// |reported delta - expected delta|, in smallest units.
pub fn drift(row: &PeriodRow) -> Amount {
    row.balance_delta
        .unwrap_or(Decimal::ZERO)
        .saturating_sub(expected_delta(row))
        .abs()
}

/// The inflow estimate is an approximation, so drift beyond tolerance is a
/// warning with its extent, never a failure. The first period has no prior
/// balance and is excluded.
pub fn check_reconciliation(rows: &[PeriodRow], policy: &ReconciliationPolicy) -> ValidationResult {
    let mut r = ValidationResult::default();
    let tolerance = policy.tolerance_amount();

    let mut checked = 0usize;
    let mut bad = 0usize;
    let mut max_drift = Decimal::ZERO;
    for row in rows.iter().skip(1) {
        checked += 1;
        let d = drift(row);
        if d > tolerance {
            bad += 1;
            max_drift = max_drift.max(d);
        }
    }

    if bad == 0 {
        r.ok(format!(
            "Reconciliation passes for all {checked} periods (tolerance: {} {})",
            group_thousands(policy.to_whole_units(tolerance)),
            policy.unit_label
        ));
    } else {
        let pct = bad as f64 / checked as f64 * 100.0;
        r.warn(format!(
            "Reconciliation drift in {bad}/{checked} periods ({pct:.1}%), max diff: {} {}. \
             Expected: the inflow estimate tau*(fees+rho*reserves) omits \
             deposit, refund and unclaimed-reward effects",
            group_thousands(policy.to_whole_units(max_drift)),
            policy.unit_label
        ));
    }

    r
}

// ── 4. Continuity ────────────────────────────────────────────────

/// balance_end[t] == balance_start[t+1] wherever both are known.
/// Snapshot coverage gaps can break this without invalidating the balance
/// levels, so mismatches warn.
pub fn check_continuity(rows: &[PeriodRow]) -> ValidationResult {
    let mut r = ValidationResult::default();

    let mut pairs = 0usize;
    let mut mismatches = 0usize;
    for w in rows.windows(2) {
        if let (Some(end), Some(next_start)) = (w[0].balance_end, w[1].balance_start) {
            pairs += 1;
            if end != next_start {
                mismatches += 1;
            }
        }
    }

    if pairs == 0 {
        r.warn("Cannot check balance continuity (too many nulls)");
    } else if mismatches == 0 {
        r.ok(format!(
            "Balance continuity: end[t] == start[t+1] for all {pairs} consecutive pairs"
        ));
    } else {
        r.warn(format!(
            "Balance continuity mismatch in {mismatches}/{pairs} period transitions \
             (investigate snapshot coverage)"
        ));
    }

    r
}

// ── 5. Sanity ────────────────────────────────────────────────────

pub fn check_sanity(table: &PeriodTable) -> ValidationResult {
    let mut r = ValidationResult::default();

    if table.has(PeriodField::FeesCollected) {
        let negative = table
            .rows
            .iter()
            .filter(|row| row.fees_collected.is_some_and(|v| v < Decimal::ZERO))
            .count();
        if negative == 0 {
            r.ok("No negative fees");
        } else {
            r.fail(format!("{negative} periods have negative fees"));
        }
    }

    if table.has(PeriodField::BalanceEnd) {
        let negative = table
            .rows
            .iter()
            .filter(|row| row.balance_end.is_some_and(|v| v < Decimal::ZERO))
            .count();
        if negative == 0 {
            r.ok("No negative treasury balances");
        } else {
            r.fail(format!("{negative} periods have negative treasury balance"));
        }
    }

    r
}

// ── 6. Freshness ─────────────────────────────────────────────────

pub fn check_freshness(rows: &[PeriodRow]) -> ValidationResult {
    let mut r = ValidationResult::default();
    match rows.iter().filter_map(|row| row.end_time).max() {
        Some(latest) => r.ok(format!("Latest period end_time: {latest}")),
        None => r.ok("Latest period end_time: unknown"),
    }
    r
}

/// Whole-unit figure rounded and grouped by thousands: 1234567.8 -> "1,234,568".
fn group_thousands(value: Amount) -> String {
    let rounded = value.round();
    let digits = rounded.abs().trunc().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < Decimal::ZERO {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
