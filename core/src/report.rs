//! Report rendering. The sole formatter for validation results.
//!
//! Pure: no printing, no process exit. The caller decides what to do with
//! the text and the exit code.

use crate::{
    error::ReconResult,
    finding::{Severity, ValidationResult},
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process exit status when any dataset failed.
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    PassWithWarnings,
    Fail,
}

impl Verdict {
    pub fn from_counts(warned: usize, failed: usize) -> Self {
        if failed > 0 {
            Self::Fail
        } else if warned > 0 {
            Self::PassWithWarnings
        } else {
            Self::Pass
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass             => write!(f, "PASS"),
            Self::PassWithWarnings => write!(f, "PASS-WITH-WARNINGS"),
            Self::Fail             => write!(f, "FAIL"),
        }
    }
}

impl std::str::FromStr for Verdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PASS"               => Ok(Self::Pass),
            "PASS-WITH-WARNINGS" => Ok(Self::PassWithWarnings),
            "FAIL"               => Ok(Self::Fail),
            other => Err(format!("unknown verdict '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub text: String,
    pub verdict: Verdict,
    /// 0 unless at least one failure was found. Warnings never count.
    pub exit_code: i32,
}

/// Render every result under its own heading, then the overall tally.
pub fn summarize(results: &[ValidationResult]) -> Summary {
    let mut lines = Vec::new();
    let (mut passed, mut warned, mut failed) = (0, 0, 0);

    for result in results {
        lines.push(format!("== {}", result.heading));
        for finding in result.findings() {
            lines.push(format!(
                "  {}  {}",
                finding.severity().marker(),
                finding.message()
            ));
        }
        lines.push(format!("  {}", tally_line(result.passed(), result.warned(), result.failed())));
        lines.push(String::new());

        passed += result.passed();
        warned += result.warned();
        failed += result.failed();
    }

    lines.push(tally_line(passed, warned, failed));

    let verdict = Verdict::from_counts(warned, failed);
    Summary {
        text: lines.join("\n"),
        verdict,
        exit_code: if failed > 0 { EXIT_FAILURE } else { 0 },
    }
}

fn tally_line(passed: usize, warned: usize, failed: usize) -> String {
    let total = passed + warned + failed;
    format!(
        "[{}] {passed}/{total} passed, {warned} warnings, {failed} failures",
        Verdict::from_counts(warned, failed)
    )
}

// ── Machine-readable report ──────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetReport {
    pub heading: String,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub findings: Vec<crate::finding::Finding>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonReport {
    pub verdict: Verdict,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub datasets: Vec<DatasetReport>,
}

impl JsonReport {
    pub fn from_results(results: &[ValidationResult]) -> Self {
        let datasets: Vec<DatasetReport> = results
            .iter()
            .map(|r| DatasetReport {
                heading: r.heading.clone(),
                passed: r.passed(),
                warned: r.warned(),
                failed: r.failed(),
                findings: r.findings().to_vec(),
            })
            .collect();

        let sum = |s: Severity| results.iter().map(|r| r.count(s)).sum::<usize>();
        let (passed, warned, failed) = (sum(Severity::Ok), sum(Severity::Warn), sum(Severity::Fail));

        Self {
            verdict: Verdict::from_counts(warned, failed),
            passed,
            warned,
            failed,
            datasets,
        }
    }

    pub fn to_json_pretty(&self) -> ReconResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
