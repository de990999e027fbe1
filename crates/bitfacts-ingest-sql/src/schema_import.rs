//! Schema facts: one 512-byte vector per table, column and FK constraint.

use std::time::Instant;

use anyhow::{Context, Result};
use bitfacts_core::{
    bits_for_column, bits_for_relation, bits_for_table, decode_column_meta, decode_relation_meta,
    BitVector, ColumnMeta, RelationMeta,
};
use bitfacts_store::writer::DEFAULT_BATCH_SIZE;
use bitfacts_store::{reset_registry, BatchWriter, Keyspace, KvStore, ResetOutcome};
use serde::Serialize;
use tracing::{info, warn};

use crate::model::SqlSchema;

/// Upper bound on element keys read back for one table.
pub const MAX_ELEMENT_KEYS: usize = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaImportOptions {
    pub reset: bool,
    pub batch_size: usize,
}

impl Default for SchemaImportOptions {
    fn default() -> Self {
        Self {
            reset: false,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaImportSummary {
    pub registry_key: String,
    pub tables: usize,
    pub columns: usize,
    pub relations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<ResetOutcome>,
    pub elapsed_ms: u64,
}

/// Write schema facts for every table of `schema`.
pub fn import_schema<S: KvStore + ?Sized>(
    schema: &SqlSchema,
    store: &S,
    keys: &Keyspace,
    opts: &SchemaImportOptions,
) -> Result<SchemaImportSummary> {
    let started = Instant::now();
    let mut summary = SchemaImportSummary {
        registry_key: keys.schema_registry(),
        ..Default::default()
    };
    if opts.reset {
        summary.reset = Some(reset_schema(store, keys)?);
    }

    let table_bits = bits_for_table().to_bytes().to_vec();
    let mut w = BatchWriter::new(store, opts.batch_size).with_registry(keys.schema_registry());
    for table in &schema.tables {
        w.set_registered(keys.element_table(&table.name), table_bits.clone())?;
        summary.tables += 1;

        for col in &table.columns {
            let v = bits_for_column(&table.column_traits(col));
            w.set_registered(keys.element_column(&table.name, &col.name), v.to_bytes().to_vec())?;
            summary.columns += 1;
        }
        for fk in &table.foreign_keys {
            let v = bits_for_relation(&table.relation_traits(fk));
            w.set_registered(
                keys.element_relation(&table.name, &fk.to_table, fk.id),
                v.to_bytes().to_vec(),
            )?;
            summary.relations += 1;
        }
    }
    w.finish().context("writing schema facts")?;

    summary.elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        prefix = keys.prefix(),
        tables = summary.tables,
        columns = summary.columns,
        relations = summary.relations,
        elapsed_ms = summary.elapsed_ms,
        "schema facts imported"
    );
    Ok(summary)
}

/// Delete exactly the schema keys listed in the schema registry.
pub fn reset_schema<S: KvStore + ?Sized>(store: &S, keys: &Keyspace) -> Result<ResetOutcome> {
    let outcome = reset_registry(store, &keys.schema_registry()).context("resetting schema facts")?;
    info!(prefix = keys.prefix(), deleted = outcome.deleted_keys, "schema facts reset");
    Ok(outcome)
}

// ============================================================================
// Read-back
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The described table holds the foreign key.
    From,
    /// The described table is referenced.
    To,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnEntry {
    pub name: String,
    pub key: String,
    #[serde(flatten)]
    pub meta: ColumnMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationEntry {
    pub from_table: String,
    pub to_table: String,
    pub fk: String,
    pub direction: Direction,
    pub key: String,
    #[serde(flatten)]
    pub meta: RelationMeta,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableDescription {
    pub table: String,
    pub columns: Vec<ColumnEntry>,
    pub relations: Vec<RelationEntry>,
    /// Element values that were not 512-byte vectors.
    pub skipped: usize,
}

fn scan_all<S: KvStore + ?Sized>(store: &S, prefix: &str, max_keys: usize) -> Result<Vec<String>> {
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    while out.len() < max_keys {
        let batch = store.scan_prefix(prefix, cursor.as_deref(), (max_keys - out.len()).min(1000))?;
        let Some(last) = batch.last().cloned() else {
            break;
        };
        out.extend(batch);
        cursor = Some(last);
    }
    Ok(out)
}

/// Read `(key, vector)` pairs, dropping values that are not exactly 512 bytes.
fn read_vectors<S: KvStore + ?Sized>(
    store: &S,
    keys: Vec<String>,
    skipped: &mut usize,
) -> Result<Vec<(String, BitVector)>> {
    let values = store.mget(&keys)?;
    let mut out = Vec::with_capacity(keys.len());
    for (key, raw) in keys.into_iter().zip(values) {
        match raw.as_deref().map(BitVector::from_bytes) {
            Some(Ok(v)) => out.push((key, v)),
            _ => {
                *skipped += 1;
                warn!(key = %key, "element value is not a 512-byte vector");
            }
        }
    }
    Ok(out)
}

/// Tables with a stored table fact.
pub fn list_tables<S: KvStore + ?Sized>(store: &S, keys: &Keyspace) -> Result<Vec<String>> {
    let prefix = keys.element_table("");
    Ok(scan_all(store, &prefix, MAX_ELEMENT_KEYS)?
        .into_iter()
        .map(|k| k[prefix.len()..].to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

/// Decode the stored column and relation facts of `table`. Relations are
/// listed when the table is on either side.
pub fn describe_table<S: KvStore + ?Sized>(
    store: &S,
    keys: &Keyspace,
    table: &str,
) -> Result<TableDescription> {
    let mut desc = TableDescription {
        table: table.to_string(),
        ..Default::default()
    };

    let col_prefix = keys.element_columns_prefix(table);
    let col_keys = scan_all(store, &col_prefix, MAX_ELEMENT_KEYS)?;
    for (key, v) in read_vectors(store, col_keys, &mut desc.skipped)? {
        desc.columns.push(ColumnEntry {
            name: key[col_prefix.len()..].to_string(),
            meta: decode_column_meta(&v),
            key,
        });
    }
    desc.columns.sort_by(|a, b| a.name.cmp(&b.name));

    let rel_prefix = keys.element_relations_prefix();
    let rel_keys: Vec<String> = scan_all(store, &rel_prefix, MAX_ELEMENT_KEYS)?
        .into_iter()
        .filter(|k| {
            parse_relation(&k[rel_prefix.len()..])
                .is_some_and(|(from, to, _)| from == table || to == table)
        })
        .collect();
    for (key, v) in read_vectors(store, rel_keys, &mut desc.skipped)? {
        let Some((from, to, fk)) = parse_relation(&key[rel_prefix.len()..]) else {
            continue;
        };
        desc.relations.push(RelationEntry {
            direction: if from == table {
                Direction::From
            } else {
                Direction::To
            },
            from_table: from.to_string(),
            to_table: to.to_string(),
            fk: fk.to_string(),
            meta: decode_relation_meta(&v),
            key: key.clone(),
        });
    }
    desc.relations.sort_by(|a, b| {
        (a.direction as u8, &a.from_table, &a.to_table, &a.fk)
            .cmp(&(b.direction as u8, &b.from_table, &b.to_table, &b.fk))
    });
    Ok(desc)
}

/// `{from}:{to}:fk{n}` split at the first two colons.
fn parse_relation(rest: &str) -> Option<(&str, &str, &str)> {
    let mut parts = rest.splitn(3, ':');
    let (from, to, fk) = (parts.next()?, parts.next()?, parts.next()?);
    fk.starts_with("fk").then_some((from, to, fk))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relation_keys_split_on_first_colons() {
        assert_eq!(
            parse_relation("Order Details:Orders:fk0"),
            Some(("Order Details", "Orders", "fk0"))
        );
        assert_eq!(parse_relation("Orders:Customers"), None);
        assert_eq!(parse_relation("a:b:c"), None);
    }
}
