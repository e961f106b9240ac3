//! Shared primitive types used across the engine.

/// An amount in the ledger's smallest indivisible unit (lovelace on Cardano).
/// Upstream estimates are products of fractional rates, so amounts may carry
/// a fractional part.
pub type Amount = rust_decimal::Decimal;

/// Ordering key of one accounting period. One period = one protocol epoch.
pub type PeriodIndex = i64;

/// Calendar year of a rollup row.
pub type Year = i32;

/// Identifier of one validation run, as recorded in the run ledger.
pub type RunId = String;
