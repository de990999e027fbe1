//! In-process store, used by tests and one-shot CLI runs.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use ahash::AHashMap;
use parking_lot::RwLock;

use crate::error::Result;
use crate::kv::{KvStore, WriteOp};

#[derive(Debug, Default)]
struct Inner {
    // Ordered so prefix scans are range reads.
    strings: BTreeMap<String, Vec<u8>>,
    sets: AHashMap<String, BTreeSet<String>>,
    hashes: AHashMap<String, BTreeMap<String, String>>,
}

impl Inner {
    fn apply(&mut self, op: &WriteOp) {
        match op {
            WriteOp::Set { key, value } => {
                self.strings.insert(key.clone(), value.clone());
            }
            WriteOp::SAdd { key, members } => {
                self.sets
                    .entry(key.clone())
                    .or_default()
                    .extend(members.iter().cloned());
            }
            WriteOp::SRem { key, members } => {
                if let Some(set) = self.sets.get_mut(key) {
                    for m in members {
                        set.remove(m);
                    }
                    if set.is_empty() {
                        self.sets.remove(key);
                    }
                }
            }
            WriteOp::HSet { key, fields } => {
                self.hashes
                    .entry(key.clone())
                    .or_default()
                    .extend(fields.iter().cloned());
            }
            WriteOp::Del { keys } => {
                for k in keys {
                    self.strings.remove(k);
                    self.sets.remove(k);
                    self.hashes.remove(k);
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of keys of any kind.
    pub fn len(&self) -> usize {
        let inner = self.inner.read();
        inner.strings.len() + inner.sets.len() + inner.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.inner.read().strings.get(key).cloned())
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let inner = self.inner.read();
        Ok(keys.iter().map(|k| inner.strings.get(k).cloned()).collect())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let inner = self.inner.read();
        Ok(inner.strings.contains_key(key)
            || inner.sets.contains_key(key)
            || inner.hashes.contains_key(key))
    }

    fn scan_prefix(&self, prefix: &str, after: Option<&str>, count: usize) -> Result<Vec<String>> {
        let inner = self.inner.read();
        let lower = match after {
            Some(a) if a >= prefix => Bound::Excluded(a.to_string()),
            _ => Bound::Included(prefix.to_string()),
        };
        Ok(inner
            .strings
            .range::<String, _>((lower, Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.starts_with(prefix))
            .take(count)
            .cloned()
            .collect())
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .inner
            .read()
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    fn scard(&self, key: &str) -> Result<u64> {
        Ok(self.inner.read().sets.get(key).map_or(0, |s| s.len() as u64))
    }

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        Ok(self
            .inner
            .read()
            .hashes
            .get(key)
            .cloned()
            .unwrap_or_default())
    }

    fn apply(&self, ops: &[WriteOp]) -> Result<()> {
        let mut inner = self.inner.write();
        for op in ops {
            inner.apply(op);
        }
        Ok(())
    }
}
