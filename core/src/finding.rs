//! Findings and the per-dataset result accumulator.
//!
//! RULE: Checks never share a mutable log. Each check builds and returns its
//! own `ValidationResult`; the dataset entry point merges them in order.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Check passed fully. Always recorded, never silent.
    Ok,
    /// Known, explainable deviation. Never escalated.
    Warn,
    /// Structural invariant violated. Flips the run verdict.
    Fail,
}

impl Severity {
    /// Fixed-width marker used in the text report.
    pub fn marker(self) -> &'static str {
        match self {
            Self::Ok   => "ok  ",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok   => write!(f, "ok"),
            Self::Warn => write!(f, "warn"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// One judgment, carrying its human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "severity", content = "message", rename_all = "snake_case")]
pub enum Finding {
    Ok(String),
    Warn(String),
    Fail(String),
}

impl Finding {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Ok(_)   => Severity::Ok,
            Self::Warn(_) => Severity::Warn,
            Self::Fail(_) => Severity::Fail,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Ok(m) | Self::Warn(m) | Self::Fail(m) => m,
        }
    }
}

/// Ordered findings for one dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub heading: String,
    findings: Vec<Finding>,
}

impl ValidationResult {
    pub fn new(heading: impl Into<String>) -> Self {
        Self {
            heading: heading.into(),
            findings: Vec::new(),
        }
    }

    pub fn with_heading(mut self, heading: impl Into<String>) -> Self {
        self.heading = heading.into();
        self
    }

    /// A dataset that was expected but is absent.
    pub fn missing_input(heading: impl Into<String>, source: &str) -> Self {
        let mut r = Self::new(heading);
        r.fail(format!("Input not found: {source}"));
        r
    }

    /// A dataset that exists but could not be deserialized into rows.
    pub fn load_failure(heading: impl Into<String>, error: impl fmt::Display) -> Self {
        let mut r = Self::new(heading);
        r.fail(format!("Cannot load dataset: {error}"));
        r
    }

    pub fn ok(&mut self, msg: impl Into<String>) {
        self.findings.push(Finding::Ok(msg.into()));
    }

    pub fn warn(&mut self, msg: impl Into<String>) {
        self.findings.push(Finding::Warn(msg.into()));
    }

    pub fn fail(&mut self, msg: impl Into<String>) {
        self.findings.push(Finding::Fail(msg.into()));
    }

    /// Append every finding of `other`, keeping this result's heading.
    pub fn merge(&mut self, other: ValidationResult) {
        self.findings.extend(other.findings);
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity() == severity)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(Severity::Ok)
    }

    pub fn warned(&self) -> usize {
        self.count(Severity::Warn)
    }

    pub fn failed(&self) -> usize {
        self.count(Severity::Fail)
    }

    pub fn total(&self) -> usize {
        self.findings.len()
    }

    pub fn has_failures(&self) -> bool {
        self.findings.iter().any(|f| f.severity() == Severity::Fail)
    }
}
