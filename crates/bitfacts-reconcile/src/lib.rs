//! Reconciliation of the bitset store against its relational source
//!
//! The reporter never trusts either side: every check runs once against the
//! source database and once against the store, then reports both results and
//! their difference.
//!
//! - Row counts per row-profile table
//! - Order totals, exact arithmetic rounded half-up to cents
//! - Predicate comparison: exact SQL vs. bucketed bitset scan

pub mod error;
pub mod reconciler;
pub mod report;
pub mod totals;

pub use error::ReconcileError;
pub use reconciler::{
    default_probes, AuditRequest, Probe, Reconciler, DEFAULT_SAMPLE, DEFAULT_TOTALS_LIMIT,
    MAX_TOTALS_LIMIT,
};
pub use report::{
    AuditReport, BitsetFilter, CompareResults, Comparison, IdSample, OrderTotal, RowCount, SqlSide,
};
pub use totals::{order_total, DetailLine};
