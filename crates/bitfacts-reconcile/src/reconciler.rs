//! Runs each audit on both sides and diffs the results.

use std::collections::BTreeSet;
use std::time::Instant;

use anyhow::{Context, Result};
use bitfacts_core::predicate::quote_ident;
use bitfacts_core::row_profile::bit_name;
use bitfacts_core::{compile, sql_filter, CompareOp, Condition, RowTable};
use bitfacts_ingest_sql::{bind_value, resolve_row_table, row_id_query, SqliteSource};
use bitfacts_store::{scan_matching, Keyspace, KvStore, ScanOptions};
use rusqlite::types::Value;
use tracing::{info, warn};

use crate::error::ReconcileError;
use crate::report::{
    AuditReport, BitsetFilter, CompareResults, Comparison, IdSample, OrderTotal, RowCount, SqlSide,
};
use crate::totals::{diff, order_total, DetailLine};

pub const MAX_TOTALS_LIMIT: usize = 100;
pub const DEFAULT_TOTALS_LIMIT: usize = 20;
pub const DEFAULT_SAMPLE: usize = 20;

/// One predicate to compare.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    pub table: String,
    pub conditions: Vec<Condition>,
}

impl Probe {
    pub fn new(table: &str, conditions: Vec<Condition>) -> Self {
        Self {
            table: table.to_string(),
            conditions,
        }
    }
}

/// Predicates exercised by a full audit when none are given: one per
/// bucketed dimension family.
pub fn default_probes() -> Vec<Probe> {
    vec![
        Probe::new("Customers", vec![Condition::new("Country", CompareOp::Eq, "Germany")]),
        Probe::new("Products", vec![Condition::new("UnitPrice", CompareOp::Ge, "20")]),
        Probe::new("Orders", vec![Condition::new("OrderYear", CompareOp::Eq, "1997")]),
        Probe::new("OrderDetails", vec![Condition::new("Quantity", CompareOp::Ge, "11")]),
        Probe::new("OrderDetails", vec![Condition::new("Discount", CompareOp::Gt, "0")]),
    ]
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRequest {
    pub totals_limit: usize,
    pub sample: usize,
    pub probes: Vec<Probe>,
}

impl Default for AuditRequest {
    fn default() -> Self {
        Self {
            totals_limit: DEFAULT_TOTALS_LIMIT,
            sample: DEFAULT_SAMPLE,
            probes: default_probes(),
        }
    }
}

/// Audits the store written under `keys` against `source`.
pub struct Reconciler<'a, S: KvStore + ?Sized> {
    source: &'a SqliteSource,
    store: &'a S,
    keys: &'a Keyspace,
    scan: ScanOptions,
}

impl<'a, S: KvStore + ?Sized> Reconciler<'a, S> {
    pub fn new(source: &'a SqliteSource, store: &'a S, keys: &'a Keyspace) -> Self {
        Self {
            source,
            store,
            keys,
            scan: ScanOptions::default(),
        }
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    fn require_table(&self, table: RowTable) -> Result<String> {
        resolve_row_table(self.source, table)?.ok_or_else(|| {
            ReconcileError::MissingTable {
                table: table.as_str().to_string(),
            }
            .into()
        })
    }

    // ========================================================================
    // Row counts
    // ========================================================================

    /// Source row count vs. the store's per-table row set, for every
    /// row-profile table the source has.
    pub fn report_row_counts(&self) -> Result<Vec<RowCount>> {
        let mut out = Vec::new();
        for table in RowTable::ALL {
            let Some(sql_table) = resolve_row_table(self.source, table)? else {
                continue;
            };
            let sql_count = self.source.count(&sql_table)?;
            let store_count = self
                .store
                .scard(&self.keys.table_rows(table.as_str()))
                .context("reading table row set")?;
            out.push(RowCount {
                table: table.as_str().to_string(),
                sql_count,
                store_count,
                matches: sql_count == store_count,
            });
        }
        Ok(out)
    }

    // ========================================================================
    // Order totals
    // ========================================================================

    /// Totals of the first `limit` orders by id, each side rounded to cents
    /// half-up before comparing.
    pub fn report_order_totals(&self, limit: usize) -> Result<Vec<OrderTotal>> {
        if !(1..=MAX_TOTALS_LIMIT).contains(&limit) {
            return Err(ReconcileError::LimitOutOfRange { limit }.into());
        }
        let orders = self.require_table(RowTable::Orders)?;
        let details = self.require_table(RowTable::OrderDetails)?;

        let order_ids: Vec<String> = self
            .source
            .query_text(
                &format!(
                    "SELECT OrderID FROM {} ORDER BY OrderID LIMIT ?1",
                    quote_ident(&orders)
                ),
                &[Value::Integer(limit as i64)],
            )?
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect();

        let detail_sql = format!(
            "SELECT UnitPrice, Quantity, Discount FROM {} WHERE OrderID = ?1",
            quote_ident(&details)
        );

        let mut out = Vec::with_capacity(order_ids.len());
        for oid in order_ids {
            let sql_lines: Vec<DetailLine> = self
                .source
                .query_text(&detail_sql, &[bind_value(&oid)])?
                .into_iter()
                .map(|mut cells| {
                    cells.resize(3, None);
                    let mut it = cells.into_iter();
                    DetailLine {
                        unit_price: it.next().flatten(),
                        quantity: it.next().flatten(),
                        discount: it.next().flatten(),
                    }
                })
                .collect();
            let store_lines = self.store_detail_lines(&oid)?;

            let sql_total = order_total(&oid, &sql_lines)?;
            let store_total = order_total(&oid, &store_lines)?;
            out.push(OrderTotal {
                diff: diff(&oid, store_total, sql_total)?,
                sql_total,
                store_total,
                sql_lines: sql_lines.len(),
                store_lines: store_lines.len(),
                order_id: oid,
            });
        }

        let mismatched = out.iter().filter(|t| !t.matches()).count();
        if mismatched > 0 {
            warn!(orders = out.len(), mismatched, "order totals differ between source and store");
        }
        Ok(out)
    }

    /// Detail lines of one order via the store's per-order index.
    fn store_detail_lines(&self, order_id: &str) -> Result<Vec<DetailLine>> {
        let members = self
            .store
            .smembers(&self.keys.order_details_of(order_id))
            .context("reading order detail index")?;
        let table = RowTable::OrderDetails.as_str();
        let mut lines = Vec::with_capacity(members.len());
        for row_id in members {
            let mut cells = self
                .store
                .hmget(
                    &self.keys.obj(table, &row_id),
                    &["UnitPrice", "Quantity", "Discount"],
                )?
                .into_iter();
            lines.push(DetailLine {
                unit_price: cells.next().flatten(),
                quantity: cells.next().flatten(),
                discount: cells.next().flatten(),
            });
        }
        Ok(lines)
    }

    // ========================================================================
    // Predicate comparison
    // ========================================================================

    /// Run `conditions` as an exact relational query and as a bitset scan,
    /// then diff the id sets. Differences are reported, never hidden.
    pub fn compare_predicate(
        &self,
        table: &str,
        conditions: &[Condition],
        sample: usize,
    ) -> Result<Comparison> {
        let started = Instant::now();
        if conditions.is_empty() {
            return Err(ReconcileError::NoConditions.into());
        }
        let compiled = compile(table, conditions)?;
        let row_table = compiled.table;

        // Relational side
        let sql_table = self.require_table(row_table)?;
        let pk = self.source.primary_key(&sql_table)?;
        let filter = sql_filter(row_table, conditions);
        let query = row_id_query(&sql_table, &pk, &filter.where_sql)?;
        let sql_ids: BTreeSet<String> = self
            .source
            .select_row_ids(&sql_table, &pk, &filter.where_sql, &filter.params)
            .with_context(|| format!("running `{query}`"))?
            .into_iter()
            .collect();

        // Bitset side
        let scan = scan_matching(self.store, self.keys, &compiled, &self.scan)?;
        let bit_ids: BTreeSet<String> = scan.row_ids.iter().cloned().collect();

        let sorted = |s: &BTreeSet<String>| s.iter().cloned().collect::<Vec<_>>();
        let intersection: Vec<String> = sql_ids.intersection(&bit_ids).cloned().collect();
        let only_sql: Vec<String> = sql_ids.difference(&bit_ids).cloned().collect();
        let only_bitset: Vec<String> = bit_ids.difference(&sql_ids).cloned().collect();

        let comparison = Comparison {
            table: row_table.as_str().to_string(),
            sql: SqlSide {
                query,
                params: filter.params,
            },
            bitset_filter: BitsetFilter {
                conditions: compiled.conditions.iter().map(|c| c.label.clone()).collect(),
                bit_names: compiled
                    .referenced_bits
                    .iter()
                    .map(|&b| bit_name(b).unwrap_or_else(|| format!("bit_{b}")))
                    .collect(),
                bits: compiled.referenced_bits.clone(),
            },
            results: CompareResults {
                sql: IdSample::of(&sorted(&sql_ids), sample),
                bitset: IdSample::of(&sorted(&bit_ids), sample),
                intersection: IdSample::of(&intersection, sample),
                only_sql: IdSample::of(&only_sql, sample),
                only_bitset: IdSample::of(&only_bitset, sample),
            },
            scan: scan.stats,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            table = %comparison.table,
            conditions = ?comparison.bitset_filter.conditions,
            sql = comparison.results.sql.count,
            bitset = comparison.results.bitset.count,
            only_sql = comparison.results.only_sql.count,
            only_bitset = comparison.results.only_bitset.count,
            elapsed_ms = comparison.elapsed_ms,
            "predicate compared"
        );
        Ok(comparison)
    }

    // ========================================================================
    // Full audit
    // ========================================================================

    pub fn audit(&self, req: &AuditRequest) -> Result<AuditReport> {
        let mut report = AuditReport {
            generated_at: chrono::Utc::now().to_rfc3339(),
            prefix: self.keys.prefix().to_string(),
            source: self.source.path().display().to_string(),
            rounding: "2dp_half_up",
            row_counts: self.report_row_counts()?,
            order_totals: self.report_order_totals(req.totals_limit)?,
            comparisons: Vec::with_capacity(req.probes.len()),
        };
        for probe in &req.probes {
            let c = self
                .compare_predicate(&probe.table, &probe.conditions, req.sample)
                .with_context(|| format!("comparing {} {:?}", probe.table, probe.conditions))?;
            report.comparisons.push(c);
        }
        info!(clean = report.is_clean(), "audit finished");
        Ok(report)
    }
}
