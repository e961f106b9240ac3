//! The reconciliation engine. One validation run over up to two datasets.
//!
//! RULES:
//!   - The engine never mutates its input and never returns Err for bad data.
//!     Every judgment is a finding inside a ValidationResult.
//!   - A dataset that is absent or unreadable is one fail finding, not a crash.
//!   - Periods are always reported before years.
//!   - The engine holds only its immutable policy, so runs are independent.

use crate::{
    config::ValidationPolicy,
    error::ReconResult,
    finding::{Finding, ValidationResult},
    model::{PeriodTable, YearTable},
    period_checks,
    report::{self, JsonReport, Summary},
    store::RunRecord,
    types::RunId,
    year_checks,
};
use chrono::{DateTime, Utc};

/// One dataset as handed over by the producing layer.
#[derive(Debug, Clone)]
pub enum DatasetInput<T> {
    Loaded { source: String, table: T },
    Missing { source: String },
    Failed { source: String, error: String },
}

impl<T> DatasetInput<T> {
    pub fn loaded(source: impl Into<String>, table: T) -> Self {
        Self::Loaded {
            source: source.into(),
            table,
        }
    }

    pub fn missing(source: impl Into<String>) -> Self {
        Self::Missing {
            source: source.into(),
        }
    }

    pub fn failed(source: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self::Failed {
            source: source.into(),
            error: error.to_string(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Self::Loaded { source, .. }
            | Self::Missing { source }
            | Self::Failed { source, .. } => source,
        }
    }
}

pub struct ReconEngine {
    policy: ValidationPolicy,
}

impl ReconEngine {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate_periods(&self, table: &PeriodTable) -> ValidationResult {
        period_checks::validate_periods(table, &self.policy)
    }

    pub fn validate_years(&self, table: &YearTable) -> ValidationResult {
        year_checks::validate_years(table, &self.policy)
    }

    /// Validate whichever datasets were supplied. Returns one result per
    /// supplied input, periods first.
    pub fn run(
        &self,
        periods: Option<&DatasetInput<PeriodTable>>,
        years: Option<&DatasetInput<YearTable>>,
    ) -> RunOutcome {
        let run_id: RunId = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now();
        log::info!("validation run {run_id} started");

        let mut results = Vec::new();
        if let Some(input) = periods {
            let heading = format!("Period dataset: {}", input.source());
            results.push(self.judge(input, heading, |t| self.validate_periods(t)));
        }
        if let Some(input) = years {
            let heading = format!("Year dataset: {}", input.source());
            results.push(self.judge(input, heading, |t| self.validate_years(t)));
        }

        let outcome = RunOutcome {
            run_id,
            started_at,
            results,
        };
        log::info!(
            "validation run {} finished: {}",
            outcome.run_id,
            outcome.summary().verdict
        );
        outcome
    }

    fn judge<T>(
        &self,
        input: &DatasetInput<T>,
        heading: String,
        validate: impl Fn(&T) -> ValidationResult,
    ) -> ValidationResult {
        log::info!("validating {}", input.source());
        let result = match input {
            DatasetInput::Loaded { table, .. } => validate(table).with_heading(heading),
            DatasetInput::Missing { source } => ValidationResult::missing_input(heading, source),
            DatasetInput::Failed { error, .. } => ValidationResult::load_failure(heading, error),
        };

        for finding in result.findings() {
            match finding {
                Finding::Ok(_) => {}
                Finding::Warn(msg) => log::warn!("{}: {msg}", input.source()),
                Finding::Fail(msg) => log::error!("{}: {msg}", input.source()),
            }
        }
        result
    }
}

/// Results of one run, in reporting order.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ValidationResult>,
}

impl RunOutcome {
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(ValidationResult::has_failures)
    }

    pub fn summary(&self) -> Summary {
        report::summarize(&self.results)
    }

    pub fn json_report(&self) -> JsonReport {
        JsonReport::from_results(&self.results)
    }

    /// Ledger entry for the run, carrying the full JSON report.
    pub fn to_run_record(&self) -> ReconResult<RunRecord> {
        let report = self.json_report();
        Ok(RunRecord {
            run_id: self.run_id.clone(),
            started_at: self.started_at,
            verdict: report.verdict,
            passed: report.passed,
            warned: report.warned,
            failed: report.failed,
            report_json: report.to_json_pretty()?,
        })
    }
}
