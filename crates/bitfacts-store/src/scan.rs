//! Scan-and-filter evaluation of compiled predicates over stored row vectors.

use std::time::Instant;

use bitfacts_core::{BitVector, CompiledPredicate};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::keys::Keyspace;
use crate::kv::KvStore;

pub const DEFAULT_SCAN_BATCH: usize = 400;
pub const DEFAULT_MAX_SCAN_KEYS: usize = 200_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Keys enumerated and fetched per round trip.
    pub batch_size: usize,
    /// Ceiling on keys examined; hitting it marks the outcome truncated.
    pub max_keys: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCAN_BATCH,
            max_keys: DEFAULT_MAX_SCAN_KEYS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub keys_scanned: usize,
    pub max_keys: usize,
    pub truncated: bool,
    /// Missing, empty or non-decimal values, skipped as non-matching.
    pub malformed_skipped: usize,
    pub batches: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// Matching row ids in key order.
    pub row_ids: Vec<String>,
    pub stats: ScanStats,
}

fn parse_row_value(raw: Option<&[u8]>) -> Option<BitVector> {
    let text = std::str::from_utf8(raw?).ok()?;
    if text.trim().is_empty() {
        return None;
    }
    BitVector::parse_decimal(text).ok()
}

/// Enumerate `{p}:data:{table}:*` and keep rows satisfying every condition.
///
/// The scan has no isolation: rows written or deleted concurrently may or
/// may not be seen.
pub fn scan_matching<S: KvStore + ?Sized>(
    store: &S,
    keys: &Keyspace,
    predicate: &CompiledPredicate,
    opts: &ScanOptions,
) -> Result<ScanOutcome> {
    let started = Instant::now();
    let prefix = keys.data_prefix(predicate.table.as_str());
    let batch_size = opts.batch_size.max(1);

    let mut out = ScanOutcome::default();
    out.stats.max_keys = opts.max_keys;
    let mut cursor: Option<String> = None;

    loop {
        let remaining = opts.max_keys - out.stats.keys_scanned;
        if remaining == 0 {
            out.stats.truncated = !store
                .scan_prefix(&prefix, cursor.as_deref(), 1)?
                .is_empty();
            break;
        }
        let batch = store.scan_prefix(&prefix, cursor.as_deref(), batch_size.min(remaining))?;
        if batch.is_empty() {
            break;
        }
        let values = store.mget(&batch)?;
        out.stats.batches += 1;
        out.stats.keys_scanned += batch.len();

        for (key, raw) in batch.iter().zip(values.iter()) {
            let Some(value) = parse_row_value(raw.as_deref()) else {
                out.stats.malformed_skipped += 1;
                debug!(key = %key, "skipping malformed row value");
                continue;
            };
            if predicate.matches(&value) {
                out.row_ids.push(key[prefix.len()..].to_string());
            }
        }

        let exhausted = batch.len() < batch_size.min(remaining);
        cursor = batch.last().cloned();
        if exhausted {
            break;
        }
    }

    out.stats.elapsed_ms = started.elapsed().as_millis() as u64;
    if out.stats.malformed_skipped > 0 {
        warn!(
            table = predicate.table.as_str(),
            skipped = out.stats.malformed_skipped,
            "malformed stored row values skipped during scan"
        );
    }
    if out.stats.truncated {
        warn!(
            table = predicate.table.as_str(),
            max_keys = opts.max_keys,
            "scan stopped at key ceiling"
        );
    }
    Ok(out)
}
