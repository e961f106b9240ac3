//! Year-rollup checks: ordering, period-count banding, schema.

mod common;

use common::{consistent_years, messages, year};
use treasury_recon_core::{
    config::PeriodCountBand,
    model::{Table, YearField, YearRow, YearTable},
    validate_years,
    year_checks::{check_period_counts, check_year_order},
    ValidationPolicy,
};

fn validate(rows: Vec<YearRow>) -> treasury_recon_core::ValidationResult {
    validate_years(&YearTable::from_rows(rows), &ValidationPolicy::default())
}

#[test]
fn consistent_rollup_passes() {
    let result = validate(consistent_years());

    assert_eq!(
        messages(&result),
        vec![
            "Loaded 8 rows (2017–2024)",
            "All required columns present",
            "Years are strictly increasing",
            "Period counts per year look reasonable (range: 19–73)",
        ]
    );
    assert_eq!(result.heading, "Year dataset");
}

#[test]
fn empty_rollup_reports_only_the_load() {
    let result = validate(Vec::new());
    assert_eq!(messages(&result), vec!["Loaded 0 rows"]);
}

#[test]
fn repeated_year_fails() {
    let result = check_year_order(&[year(2020, 73), year(2020, 73), year(2021, 73)]);
    assert_eq!(result.failed(), 1);
    assert_eq!(result.findings()[0].message(), "Years are NOT sorted");
}

#[test]
fn descending_years_fail() {
    let result = validate(vec![year(2022, 73), year(2021, 73)]);
    assert!(result.has_failures());
}

#[test]
fn null_years_are_skipped_in_ordering() {
    let mut middle = year(0, 73);
    middle.year = None;
    let result = check_year_order(&[year(2020, 73), middle, year(2021, 73)]);
    assert_eq!(result.passed(), 1);
}

#[test]
fn two_partial_years_are_tolerated() {
    let band = PeriodCountBand::default();
    let rows = [year(2017, 12), year(2018, 73), year(2019, 30)];

    let result = check_period_counts(&rows, &band);
    assert_eq!(result.passed(), 1);
    assert!(result.findings()[0].message().contains("range: 12–73"));
}

#[test]
fn three_unusual_years_warn() {
    let band = PeriodCountBand::default();
    let rows = [year(2017, 12), year(2018, 90), year(2019, 73), year(2020, 30)];

    let result = check_period_counts(&rows, &band);
    assert_eq!(result.failed(), 0);
    assert_eq!(result.warned(), 1);
    assert_eq!(
        result.findings()[0].message(),
        "3 years have unusual period counts (expected 50–80)"
    );
}

#[test]
fn band_edges_are_inclusive() {
    let band = PeriodCountBand::default();
    let rows: Vec<_> = [50, 80, 49, 81, 0]
        .iter()
        .enumerate()
        .map(|(i, c)| year(2000 + i as i32, *c))
        .collect();

    // 49, 81, 0 are outside
    let result = check_period_counts(&rows, &band);
    assert_eq!(result.warned(), 1);
    assert!(result.findings()[0].message().starts_with("3 years"));
}

#[test]
fn band_comes_from_policy() {
    let mut policy = ValidationPolicy::default();
    policy.year_band.max_partial_years = 0;

    let result = validate_years(&YearTable::from_rows(consistent_years()), &policy);
    assert_eq!(result.warned(), 1, "{:?}", messages(&result));
}

#[test]
fn missing_columns_fail_and_skip_dependent_checks() {
    let table: YearTable = Table::with_columns(
        [YearField::Year, YearField::FeesTotal],
        consistent_years(),
    );
    let result = validate_years(&table, &ValidationPolicy::default());
    let msgs = messages(&result);

    assert!(
        msgs.contains(
            &r#"Missing columns: ["epochs", "inflow_fees_plus_reserves_ada", "treasury_delta_ada"]"#
                .to_string()
        ),
        "{msgs:?}"
    );
    assert!(msgs.contains(&"Years are strictly increasing".to_string()));
    assert!(!msgs.iter().any(|m| m.starts_with("Period counts")), "{msgs:?}");
}

#[test]
fn rollup_without_any_year_still_loads() {
    let mut row = year(0, 73);
    row.year = None;
    let result = validate(vec![row]);
    assert_eq!(result.findings()[0].message(), "Loaded 1 rows");
}
