//! Row facts: per-row vectors, object hashes and membership sets.

use std::collections::{BTreeMap, HashSet};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use bitfacts_core::normalize::norm;
use bitfacts_core::row_profile::encode_table_row;
use bitfacts_core::{RowAccessor, RowTable};
use bitfacts_store::writer::DEFAULT_BATCH_SIZE;
use bitfacts_store::{reset_registry, BatchWriter, Keyspace, KvStore, ResetOutcome, WriteOp};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::source::{row_id, SqliteSource};
use crate::tables::resolve_row_table;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Tables to ingest, in order.
    pub tables: Vec<RowTable>,
    /// Delete previously registered row keys first.
    pub reset: bool,
    /// Rows read per table; 0 reads all.
    pub max_rows_per_table: usize,
    /// Queued operations per flush.
    pub batch_size: usize,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            tables: RowTable::ALL.to_vec(),
            reset: false,
            max_rows_per_table: 0,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestSummary {
    pub source: String,
    pub registry_key: String,
    pub created_by_table: BTreeMap<String, usize>,
    pub processed_by_table: BTreeMap<String, usize>,
    /// Requested tables the source does not have.
    pub missing_tables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<ResetOutcome>,
    pub batches: usize,
    pub elapsed_ms: u64,
}

/// Ingest row facts for `opts.tables` from `source`.
///
/// Each row writes `{p}:data:{table}:{rowId}` (decimal row vector),
/// `{p}:obj:{table}:{rowId}` (column text), table membership and, for order
/// details, per-order membership. Every written key is registered in the
/// row registry. Rows with a NULL key part are counted as processed and
/// skipped.
pub fn ingest_rows<S: KvStore + ?Sized>(
    source: &SqliteSource,
    store: &S,
    keys: &Keyspace,
    opts: &IngestOptions,
) -> Result<IngestSummary> {
    let started = Instant::now();
    if opts.tables.is_empty() {
        bail!("no supported tables requested");
    }

    let mut summary = IngestSummary {
        source: source.path().display().to_string(),
        registry_key: keys.data_registry(),
        ..Default::default()
    };
    if opts.reset {
        summary.reset = Some(reset_rows(store, keys)?);
    }

    let mut w = BatchWriter::new(store, opts.batch_size).with_registry(keys.data_registry());
    // Membership sets need registering once, not once per member.
    let mut registered_sets: HashSet<String> = HashSet::new();

    for &table in &opts.tables {
        let name = table.as_str();
        let Some(sql_table) = resolve_row_table(source, table)? else {
            warn!(table = name, "table not found in relational source, skipping");
            summary.missing_tables.push(name.to_string());
            continue;
        };
        let pk = source.primary_key(&sql_table)?;
        if pk.is_empty() {
            bail!("table {sql_table} has no primary key");
        }

        let table_set = keys.table_rows(name);
        let mut created = 0usize;
        let processed = source
            .for_each_row(&sql_table, opts.max_rows_per_table, |row| {
                let Some(id) = row_id(row, &pk) else {
                    debug!(table = name, "row with NULL key part skipped");
                    return Ok(());
                };

                let bits = encode_table_row(table, row);
                w.set_registered(keys.data(name, &id)?, bits.to_decimal_string())?;

                let fields = row
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone().unwrap_or_default()))
                    .collect();
                w.hset_registered(keys.obj(name, &id), fields)?;

                add_member(&mut w, &mut registered_sets, &table_set, &id)?;
                if table == RowTable::OrderDetails {
                    let order_id = row
                        .text("OrderID")
                        .map(|v| norm(&v))
                        .filter(|v| !v.is_empty())
                        .unwrap_or_else(|| id.split(':').next().unwrap_or_default().to_string());
                    add_member(&mut w, &mut registered_sets, &keys.order_details_of(&order_id), &id)?;
                }
                created += 1;
                Ok(())
            })
            .with_context(|| format!("ingesting {name} from {sql_table}"))?;

        summary.created_by_table.insert(name.to_string(), created);
        summary.processed_by_table.insert(name.to_string(), processed);
    }

    let stats = w.finish().context("flushing row facts")?;
    summary.batches = stats.batches;
    summary.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        prefix = keys.prefix(),
        tables = summary.created_by_table.len(),
        rows = summary.created_by_table.values().sum::<usize>(),
        batches = summary.batches,
        elapsed_ms = summary.elapsed_ms,
        "row facts ingested"
    );
    Ok(summary)
}

fn add_member<S: KvStore + ?Sized>(
    w: &mut BatchWriter<'_, S>,
    registered: &mut HashSet<String>,
    set_key: &str,
    member: &str,
) -> Result<()> {
    if registered.insert(set_key.to_string()) {
        w.sadd_registered(set_key.to_string(), member)?;
    } else {
        w.push(WriteOp::sadd(set_key, member))?;
    }
    Ok(())
}

/// Delete exactly the keys listed in the row registry.
pub fn reset_rows<S: KvStore + ?Sized>(store: &S, keys: &Keyspace) -> Result<ResetOutcome> {
    let outcome = reset_registry(store, &keys.data_registry()).context("resetting row facts")?;
    info!(prefix = keys.prefix(), deleted = outcome.deleted_keys, "row facts reset");
    Ok(outcome)
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DataInfo {
    pub registry_key: String,
    pub registered_keys: u64,
    /// Cardinality of each table's row set.
    pub rows_by_table: BTreeMap<String, u64>,
}

pub fn data_info<S: KvStore + ?Sized>(store: &S, keys: &Keyspace) -> Result<DataInfo> {
    let mut info = DataInfo {
        registry_key: keys.data_registry(),
        registered_keys: store.scard(&keys.data_registry())?,
        ..Default::default()
    };
    for table in RowTable::ALL {
        let n = store.scard(&keys.table_rows(table.as_str()))?;
        if n > 0 {
            info.rows_by_table.insert(table.as_str().to_string(), n);
        }
    }
    Ok(info)
}
