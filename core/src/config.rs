//! Validation policy: the tolerance and banding constants every check reads.
//!
//! RULE: No check embeds its own thresholds. The policy is loaded once by the
//! caller and handed to each entry point, so tests can vary it freely.

use crate::{
    error::{ReconError, ReconResult},
    types::Amount,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Reconciliation ───────────────────────────────────────────────

/// Tolerance for the per-period balance reconciliation.
///
/// The expected delta subtracts exactly two withdrawal mechanisms: MIR
/// treasury payments and governance-enacted withdrawals. If the ledger gains
/// a third withdrawal category, `period_checks::expected_delta` must be
/// extended; until then those outflows surface as reconciliation drift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationPolicy {
    /// Largest accepted |actual - expected| per period, in smallest units.
    pub tolerance: i64,
    /// Smallest units per whole unit (1 ADA = 1_000_000 lovelace).
    pub units_per_whole: i64,
    /// Label printed next to whole-unit figures.
    pub unit_label: String,
}

impl Default for ReconciliationPolicy {
    fn default() -> Self {
        Self {
            tolerance: 10_000_000,
            units_per_whole: 1_000_000,
            unit_label: "ADA".into(),
        }
    }
}

impl ReconciliationPolicy {
    pub fn tolerance_amount(&self) -> Amount {
        Decimal::from(self.tolerance)
    }

    /// Convert a smallest-unit figure to whole units for display.
    pub fn to_whole_units(&self, amount: Amount) -> Amount {
        amount
            .checked_div(Decimal::from(self.units_per_whole))
            .unwrap_or(amount)
    }
}

// ── Yearly rollup band ───────────────────────────────────────────

/// Expected number of periods in a full calendar year.
/// Cardano has ~73 five-day epochs per year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodCountBand {
    pub min_periods: u32,
    pub max_periods: u32,
    /// Out-of-band years tolerated before warning. The first and last year
    /// of a series are naturally partial.
    pub max_partial_years: usize,
}

impl Default for PeriodCountBand {
    fn default() -> Self {
        Self {
            min_periods: 50,
            max_periods: 80,
            max_partial_years: 2,
        }
    }
}

impl PeriodCountBand {
    pub fn contains(&self, count: u32) -> bool {
        (self.min_periods..=self.max_periods).contains(&count)
    }
}

// ── Top-level policy ─────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    pub reconciliation: ReconciliationPolicy,
    pub year_band: PeriodCountBand,
}

impl ValidationPolicy {
    /// Load from a JSON policy file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let policy = Self::from_json(&content)?;
        log::debug!("loaded validation policy from {}", path.display());
        Ok(policy)
    }

    pub fn from_json(input: &str) -> ReconResult<Self> {
        let policy: ValidationPolicy = serde_json::from_str(input)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> ReconResult<()> {
        let recon = &self.reconciliation;
        if recon.tolerance < 0 {
            return Err(ReconError::InvalidPolicy(format!(
                "reconciliation.tolerance must be >= 0, got {}",
                recon.tolerance
            )));
        }
        if recon.units_per_whole <= 0 {
            return Err(ReconError::InvalidPolicy(format!(
                "reconciliation.units_per_whole must be > 0, got {}",
                recon.units_per_whole
            )));
        }

        let band = &self.year_band;
        if band.min_periods > band.max_periods {
            return Err(ReconError::InvalidPolicy(format!(
                "year_band.min_periods ({}) exceeds year_band.max_periods ({})",
                band.min_periods, band.max_periods
            )));
        }
        Ok(())
    }
}
