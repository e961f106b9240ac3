//! Year-rollup checks. The rollup is judged on its own terms and is never
//! recomputed from the period rows.

use crate::{
    config::{PeriodCountBand, ValidationPolicy},
    finding::ValidationResult,
    model::{YearField, YearRow, YearTable},
};

pub fn validate_years(table: &YearTable, policy: &ValidationPolicy) -> ValidationResult {
    let mut result = ValidationResult::new("Year dataset");

    let years = table.rows.iter().filter_map(|row| row.year);
    match (years.clone().min(), years.max()) {
        (Some(first), Some(last)) => {
            result.ok(format!("Loaded {} rows ({first}–{last})", table.len()))
        }
        _ => result.ok(format!("Loaded {} rows", table.len())),
    }

    if table.is_empty() {
        return result;
    }

    let missing = table.missing_columns();
    if missing.is_empty() {
        result.ok("All required columns present");
    } else {
        result.fail(format!("Missing columns: {missing:?}"));
    }

    if table.has(YearField::Year) {
        result.merge(check_year_order(&table.rows));
    }
    if table.has(YearField::PeriodCount) {
        result.merge(check_period_counts(&table.rows, &policy.year_band));
    }

    result
}

/// Defined years must be strictly increasing.
pub fn check_year_order(rows: &[YearRow]) -> ValidationResult {
    let mut r = ValidationResult::default();
    let years: Vec<_> = rows.iter().filter_map(|row| row.year).collect();
    if years.windows(2).all(|w| w[0] < w[1]) {
        r.ok("Years are strictly increasing");
    } else {
        r.fail("Years are NOT sorted");
    }
    r
}

/// Years outside the band are expected at the edges of the series, so up to
/// `max_partial_years` of them pass.
pub fn check_period_counts(rows: &[YearRow], band: &PeriodCountBand) -> ValidationResult {
    let mut r = ValidationResult::default();
    let counts: Vec<u32> = rows.iter().filter_map(|row| row.period_count).collect();
    let unusual = counts.iter().filter(|c| !band.contains(**c)).count();

    if unusual <= band.max_partial_years {
        match (counts.iter().min(), counts.iter().max()) {
            (Some(lo), Some(hi)) => {
                r.ok(format!("Period counts per year look reasonable (range: {lo}–{hi})"))
            }
            _ => r.ok("Period counts per year look reasonable (no counts reported)"),
        }
    } else {
        r.warn(format!(
            "{unusual} years have unusual period counts (expected {}–{})",
            band.min_periods, band.max_periods
        ));
    }
    r
}
