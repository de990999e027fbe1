//! The backing key-value store interface.

use std::collections::BTreeMap;

use crate::error::Result;

/// One write in a pipelined batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// String value (decimal row vector or 512-byte schema blob).
    Set { key: String, value: Vec<u8> },
    SAdd { key: String, members: Vec<String> },
    SRem { key: String, members: Vec<String> },
    HSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Remove keys of any kind.
    Del { keys: Vec<String> },
}

impl WriteOp {
    pub fn set(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        WriteOp::Set {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn sadd(key: impl Into<String>, member: impl Into<String>) -> Self {
        WriteOp::SAdd {
            key: key.into(),
            members: vec![member.into()],
        }
    }
}

/// Redis-shaped storage: string values, sets and hashes under string keys.
///
/// Each key is expected to hold a single kind of value. Implementations are
/// synchronous and never retry; errors surface to the caller.
///
/// # Contract
///
/// - `get` returns `None` for absent keys.
/// - `scan_prefix` enumerates *string* keys starting with `prefix` in
///   ascending byte order, strictly after `after` when given, at most
///   `count` per call. Passing the last returned key resumes the scan.
/// - `apply` executes the batch in order. A batch is atomic where the backend
///   allows it; there is no atomicity across batches.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|k| self.get(k)).collect()
    }

    fn exists(&self, key: &str) -> Result<bool>;

    fn scan_prefix(&self, prefix: &str, after: Option<&str>, count: usize) -> Result<Vec<String>>;

    /// Members in ascending order.
    fn smembers(&self, key: &str) -> Result<Vec<String>>;

    fn scard(&self, key: &str) -> Result<u64>;

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>>;

    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        let all = self.hgetall(key)?;
        Ok(fields.iter().map(|f| all.get(*f).cloned()).collect())
    }

    fn apply(&self, ops: &[WriteOp]) -> Result<()>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }
    fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        (**self).mget(keys)
    }
    fn exists(&self, key: &str) -> Result<bool> {
        (**self).exists(key)
    }
    fn scan_prefix(&self, prefix: &str, after: Option<&str>, count: usize) -> Result<Vec<String>> {
        (**self).scan_prefix(prefix, after, count)
    }
    fn smembers(&self, key: &str) -> Result<Vec<String>> {
        (**self).smembers(key)
    }
    fn scard(&self, key: &str) -> Result<u64> {
        (**self).scard(key)
    }
    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        (**self).hgetall(key)
    }
    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        (**self).hmget(key, fields)
    }
    fn apply(&self, ops: &[WriteOp]) -> Result<()> {
        (**self).apply(ops)
    }
}
