//! Typed row model for the two input granularities.
//!
//! Rows are produced upstream and held read-only for one validation run.
//! Every cell is optional: a null cell is data the checks judge, never a
//! reason to refuse the row.

use crate::types::{Amount, PeriodIndex, Year};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A required input column. Implemented by the per-granularity field enums.
pub trait Field: Copy + Ord + fmt::Debug + 'static {
    /// Every required column, in canonical header order.
    const ALL: &'static [Self];

    /// Column name as written by the upstream exporter.
    fn column(self) -> &'static str;

    fn from_column(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.column() == name)
    }
}

// ── Period rows ──────────────────────────────────────────────────

/// One accounting period (epoch) of the treasury ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodRow {
    pub period_index: Option<PeriodIndex>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub fees_collected: Option<Amount>,
    /// Null for the first period of a series.
    pub balance_start: Option<Amount>,
    pub balance_end: Option<Amount>,
    /// Reported actual change of the balance over the period.
    pub balance_delta: Option<Amount>,
    pub reserves_start: Option<Amount>,
    /// Monetary expansion rate (rho).
    pub monetary_expansion_rate: Option<f64>,
    /// Treasury cut (tau).
    pub treasury_cut_rate: Option<f64>,
    /// tau * (fees + rho * reserves), estimated upstream.
    pub estimated_inflow: Option<Amount>,
    pub donations_inflow: Option<Amount>,
    pub pot_transfer_inflow: Option<Amount>,
    /// MIR treasury payments.
    pub withdrawal_amount_a: Option<Amount>,
    /// Governance-enacted treasury withdrawals.
    pub withdrawal_amount_b: Option<Amount>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodField {
    PeriodIndex,
    StartTime,
    EndTime,
    FeesCollected,
    BalanceStart,
    BalanceEnd,
    BalanceDelta,
    ReservesStart,
    MonetaryExpansionRate,
    TreasuryCutRate,
    EstimatedInflow,
    DonationsInflow,
    PotTransferInflow,
    WithdrawalAmountA,
    WithdrawalAmountB,
}

impl Field for PeriodField {
    const ALL: &'static [Self] = &[
        Self::PeriodIndex,
        Self::StartTime,
        Self::EndTime,
        Self::FeesCollected,
        Self::BalanceStart,
        Self::BalanceEnd,
        Self::BalanceDelta,
        Self::ReservesStart,
        Self::MonetaryExpansionRate,
        Self::TreasuryCutRate,
        Self::EstimatedInflow,
        Self::DonationsInflow,
        Self::PotTransferInflow,
        Self::WithdrawalAmountA,
        Self::WithdrawalAmountB,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::PeriodIndex           => "epoch_no",
            Self::StartTime             => "start_time",
            Self::EndTime               => "end_time",
            Self::FeesCollected         => "fees_epoch",
            Self::BalanceStart          => "treasury_start",
            Self::BalanceEnd            => "treasury_end",
            Self::BalanceDelta          => "treasury_delta",
            Self::ReservesStart         => "reserves_start",
            Self::MonetaryExpansionRate => "rho",
            Self::TreasuryCutRate       => "tau",
            Self::EstimatedInflow       => "inflow_fees_plus_reserves_est",
            Self::DonationsInflow       => "treasury_donations",
            Self::PotTransferInflow     => "pot_transfer_treasury",
            Self::WithdrawalAmountA     => "mir_treasury_payments",
            Self::WithdrawalAmountB     => "conway_enacted_withdrawals",
        }
    }
}

impl PeriodField {
    /// The flow columns the reconciliation formula reads.
    pub const FLOWS: &'static [Self] = &[
        Self::BalanceDelta,
        Self::EstimatedInflow,
        Self::DonationsInflow,
        Self::PotTransferInflow,
        Self::WithdrawalAmountA,
        Self::WithdrawalAmountB,
    ];

    pub fn is_null(self, row: &PeriodRow) -> bool {
        match self {
            Self::PeriodIndex           => row.period_index.is_none(),
            Self::StartTime             => row.start_time.is_none(),
            Self::EndTime               => row.end_time.is_none(),
            Self::FeesCollected         => row.fees_collected.is_none(),
            Self::BalanceStart          => row.balance_start.is_none(),
            Self::BalanceEnd            => row.balance_end.is_none(),
            Self::BalanceDelta          => row.balance_delta.is_none(),
            Self::ReservesStart         => row.reserves_start.is_none(),
            Self::MonetaryExpansionRate => row.monetary_expansion_rate.is_none(),
            Self::TreasuryCutRate       => row.treasury_cut_rate.is_none(),
            Self::EstimatedInflow       => row.estimated_inflow.is_none(),
            Self::DonationsInflow       => row.donations_inflow.is_none(),
            Self::PotTransferInflow     => row.pot_transfer_inflow.is_none(),
            Self::WithdrawalAmountA     => row.withdrawal_amount_a.is_none(),
            Self::WithdrawalAmountB     => row.withdrawal_amount_b.is_none(),
        }
    }
}

// ── Year rollups ─────────────────────────────────────────────────

/// One calendar-year rollup. Amounts are in whole units, as exported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearRow {
    pub year: Option<Year>,
    pub period_count: Option<u32>,
    pub fees_total: Option<f64>,
    pub estimated_inflow_total: Option<f64>,
    pub balance_delta_total: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YearField {
    Year,
    PeriodCount,
    FeesTotal,
    EstimatedInflowTotal,
    BalanceDeltaTotal,
}

impl Field for YearField {
    const ALL: &'static [Self] = &[
        Self::Year,
        Self::PeriodCount,
        Self::FeesTotal,
        Self::EstimatedInflowTotal,
        Self::BalanceDeltaTotal,
    ];

    fn column(self) -> &'static str {
        match self {
            Self::Year                 => "year",
            Self::PeriodCount          => "epochs",
            Self::FeesTotal            => "fees_ada",
            Self::EstimatedInflowTotal => "inflow_fees_plus_reserves_ada",
            Self::BalanceDeltaTotal    => "treasury_delta_ada",
        }
    }
}

// ── Tables ───────────────────────────────────────────────────────

/// Rows plus the set of required columns the source actually carried.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<F: Field, R> {
    pub present: BTreeSet<F>,
    pub rows: Vec<R>,
}

pub type PeriodTable = Table<PeriodField, PeriodRow>;
pub type YearTable = Table<YearField, YearRow>;

impl<F: Field, R> Table<F, R> {
    /// In-memory rows carry every column by construction.
    pub fn from_rows(rows: Vec<R>) -> Self {
        Self {
            present: F::ALL.iter().copied().collect(),
            rows,
        }
    }

    pub fn with_columns(present: impl IntoIterator<Item = F>, rows: Vec<R>) -> Self {
        Self {
            present: present.into_iter().collect(),
            rows,
        }
    }

    pub fn has(&self, field: F) -> bool {
        self.present.contains(&field)
    }

    pub fn has_all(&self, fields: &[F]) -> bool {
        fields.iter().all(|f| self.has(*f))
    }

    /// Required columns absent from the source, in canonical order.
    pub fn missing_columns(&self) -> Vec<&'static str> {
        F::ALL
            .iter()
            .filter(|f| !self.has(**f))
            .map(|f| f.column())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
