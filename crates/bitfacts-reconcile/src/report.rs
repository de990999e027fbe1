//! The structured audit document.
//!
//! Monetary values serialize as decimal strings with exactly two fractional
//! digits; everything else is plain JSON.

use bitfacts_core::Decimal;
use bitfacts_store::ScanStats;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowCount {
    pub table: String,
    pub sql_count: u64,
    pub store_count: u64,
    #[serde(rename = "match")]
    pub matches: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTotal {
    pub order_id: String,
    pub sql_total: Decimal,
    pub store_total: Decimal,
    /// `store_total - sql_total`, rounded the same way.
    pub diff: Decimal,
    /// Number of detail lines each side summed.
    pub sql_lines: usize,
    pub store_lines: usize,
}

impl OrderTotal {
    pub fn matches(&self) -> bool {
        self.sql_total == self.store_total
    }
}

/// A count and a sorted, truncated sample of row ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IdSample {
    pub count: usize,
    pub ids: Vec<String>,
}

impl IdSample {
    /// `ids` must already be sorted.
    pub fn of(ids: &[String], sample: usize) -> Self {
        Self {
            count: ids.len(),
            ids: ids.iter().take(sample).cloned().collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SqlSide {
    pub query: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BitsetFilter {
    /// Condition labels, e.g. `UnitPrice>=20`.
    pub conditions: Vec<String>,
    pub bits: Vec<u32>,
    pub bit_names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompareResults {
    pub sql: IdSample,
    pub bitset: IdSample,
    pub intersection: IdSample,
    pub only_sql: IdSample,
    pub only_bitset: IdSample,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    pub table: String,
    pub sql: SqlSide,
    pub bitset_filter: BitsetFilter,
    pub results: CompareResults,
    pub scan: ScanStats,
    pub elapsed_ms: u64,
}

impl Comparison {
    /// Both sides returned the same id set.
    pub fn agrees(&self) -> bool {
        self.results.only_sql.count == 0 && self.results.only_bitset.count == 0
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditReport {
    /// RFC 3339 timestamp.
    pub generated_at: String,
    pub prefix: String,
    pub source: String,
    /// Always `2dp_half_up`.
    pub rounding: &'static str,
    pub row_counts: Vec<RowCount>,
    pub order_totals: Vec<OrderTotal>,
    pub comparisons: Vec<Comparison>,
}

impl AuditReport {
    /// Every row count, order total and comparison agrees.
    pub fn is_clean(&self) -> bool {
        self.row_counts.iter().all(|c| c.matches)
            && self.order_totals.iter().all(OrderTotal::matches)
            && self.comparisons.iter().all(Comparison::agrees)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
