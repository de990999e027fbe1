//! Pipelined writes with a bounded queue and a write-time key registry.

use std::time::Instant;

use tracing::debug;

use crate::error::Result;
use crate::kv::{KvStore, WriteOp};

/// Default number of queued operations per flush.
pub const DEFAULT_BATCH_SIZE: usize = 2000;

/// Deletes issued per round trip during reset.
pub const RESET_CHUNK: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub ops: usize,
    pub batches: usize,
}

/// Queues [`WriteOp`]s and flushes them once `batch_size` are pending.
///
/// Every key passed to [`BatchWriter::set_registered`] (and friends) is also
/// added to the writer's registry set in the same batch, so reset can find
/// exactly what was written. A failed flush leaves earlier batches in place;
/// recovery is reset-and-rerun.
pub struct BatchWriter<'a, S: KvStore + ?Sized> {
    store: &'a S,
    registry: Option<String>,
    pending: Vec<WriteOp>,
    registered: Vec<String>,
    batch_size: usize,
    stats: WriteStats,
}

impl<'a, S: KvStore + ?Sized> BatchWriter<'a, S> {
    pub fn new(store: &'a S, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            registry: None,
            pending: Vec::with_capacity(batch_size),
            registered: Vec::new(),
            batch_size,
            stats: WriteStats::default(),
        }
    }

    /// Record every registered key in the set at `registry_key`.
    pub fn with_registry(mut self, registry_key: impl Into<String>) -> Self {
        self.registry = Some(registry_key.into());
        self
    }

    pub fn push(&mut self, op: WriteOp) -> Result<()> {
        self.pending.push(op);
        if self.pending.len() + usize::from(!self.registered.is_empty()) >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn register(&mut self, key: &str) {
        if self.registry.is_some() {
            self.registered.push(key.to_string());
        }
    }

    pub fn set_registered(&mut self, key: String, value: impl Into<Vec<u8>>) -> Result<()> {
        self.register(&key);
        self.push(WriteOp::Set {
            key,
            value: value.into(),
        })
    }

    pub fn sadd_registered(&mut self, key: String, member: impl Into<String>) -> Result<()> {
        self.register(&key);
        self.push(WriteOp::SAdd {
            key,
            members: vec![member.into()],
        })
    }

    pub fn hset_registered(&mut self, key: String, fields: Vec<(String, String)>) -> Result<()> {
        self.register(&key);
        self.push(WriteOp::HSet { key, fields })
    }

    pub fn flush(&mut self) -> Result<()> {
        if let Some(registry) = &self.registry {
            if !self.registered.is_empty() {
                self.pending.push(WriteOp::SAdd {
                    key: registry.clone(),
                    members: std::mem::take(&mut self.registered),
                });
            }
        }
        if self.pending.is_empty() {
            return Ok(());
        }
        let started = Instant::now();
        let n = self.pending.len();
        self.store.apply(&self.pending)?;
        self.pending.clear();
        self.stats.ops += n;
        self.stats.batches += 1;
        debug!(
            ops = n,
            batch = self.stats.batches,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "flushed write batch"
        );
        Ok(())
    }

    /// Flush what is left and return totals.
    pub fn finish(mut self) -> Result<WriteStats> {
        self.flush()?;
        Ok(self.stats)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ResetOutcome {
    pub deleted_keys: usize,
    pub registry_existed: bool,
}

/// Delete exactly the keys listed in `registry_key`, then the registry.
///
/// Keys are never discovered by pattern: anything not in the registry,
/// including unrelated keys under the same prefix, is left alone.
pub fn reset_registry<S: KvStore + ?Sized>(store: &S, registry_key: &str) -> Result<ResetOutcome> {
    let registry_existed = store.exists(registry_key)?;
    let members = store.smembers(registry_key)?;
    for chunk in members.chunks(RESET_CHUNK) {
        store.apply(&[WriteOp::Del {
            keys: chunk.to_vec(),
        }])?;
    }
    store.apply(&[WriteOp::Del {
        keys: vec![registry_key.to_string()],
    }])?;
    debug!(registry = registry_key, deleted = members.len(), "registry reset");
    Ok(ResetOutcome {
        deleted_keys: members.len(),
        registry_existed,
    })
}
