//! treasury-recon-core: validation engine for derived treasury ledger
//! time series.
//!
//! Consumes period rows and optional yearly rollups, judges them, and
//! reports ok / warn / fail findings. Never mutates its input.

pub mod config;
pub mod engine;
pub mod error;
pub mod finding;
pub mod loader;
pub mod model;
pub mod period_checks;
pub mod report;
pub mod store;
pub mod types;
pub mod year_checks;

pub use config::ValidationPolicy;
pub use engine::{DatasetInput, ReconEngine, RunOutcome};
pub use error::{ReconError, ReconResult};
pub use finding::{Finding, Severity, ValidationResult};
pub use model::{PeriodRow, PeriodTable, YearRow, YearTable};
pub use period_checks::validate_periods;
pub use report::{summarize, Summary, Verdict};
pub use year_checks::validate_years;
