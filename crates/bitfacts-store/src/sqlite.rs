//! File-backed store on SQLite.
//!
//! Three tables mirror the three value kinds. Each `apply` batch runs in one
//! transaction, so a flush is all-or-nothing; earlier batches stay committed.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::error::Result;
use crate::kv::{KvStore, WriteOp};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_string (
    key   TEXT PRIMARY KEY,
    value BLOB NOT NULL
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS kv_set (
    key    TEXT NOT NULL,
    member TEXT NOT NULL,
    PRIMARY KEY (key, member)
) WITHOUT ROWID;

CREATE TABLE IF NOT EXISTS kv_hash (
    key   TEXT NOT NULL,
    field TEXT NOT NULL,
    value TEXT NOT NULL,
    PRIMARY KEY (key, field)
) WITHOUT ROWID;
"#;

/// Keys per `IN (...)` lookup, under SQLite's host-parameter limit.
const MGET_CHUNK: usize = 500;

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
        conn.execute_batch("PRAGMA synchronous=NORMAL;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Smallest string greater than every string starting with `prefix`, for
/// range scans over a TEXT primary key.
fn prefix_upper_bound(prefix: &str) -> String {
    let mut s = prefix.to_string();
    s.push(char::MAX);
    s
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT value FROM kv_string WHERE key = ?1")?;
        Ok(stmt.query_row(params![key], |r| r.get(0)).optional()?)
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>> {
        let conn = self.conn.lock();
        let mut found: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for chunk in keys.chunks(MGET_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!("SELECT key, value FROM kv_string WHERE key IN ({placeholders})");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, Vec<u8>>(1)?))
            })?;
            for row in rows {
                let (k, v) = row?;
                found.insert(k, v);
            }
        }
        Ok(keys.iter().map(|k| found.get(k).cloned()).collect())
    }

    fn exists(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT EXISTS(SELECT 1 FROM kv_string WHERE key = ?1)
                 OR EXISTS(SELECT 1 FROM kv_set WHERE key = ?1)
                 OR EXISTS(SELECT 1 FROM kv_hash WHERE key = ?1)",
        )?;
        Ok(stmt.query_row(params![key], |r| r.get(0))?)
    }

    fn scan_prefix(&self, prefix: &str, after: Option<&str>, count: usize) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let upper = prefix_upper_bound(prefix);
        let limit = i64::try_from(count).unwrap_or(i64::MAX);
        let keys: Vec<String> = match after {
            Some(a) if a >= prefix => {
                let mut stmt = conn.prepare_cached(
                    "SELECT key FROM kv_string WHERE key > ?1 AND key < ?2 ORDER BY key LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![a, upper, limit], |r| r.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            _ => {
                let mut stmt = conn.prepare_cached(
                    "SELECT key FROM kv_string WHERE key >= ?1 AND key < ?2 ORDER BY key LIMIT ?3",
                )?;
                let rows = stmt.query_map(params![prefix, upper, limit], |r| r.get::<_, String>(0))?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };
        Ok(keys.into_iter().filter(|k| k.starts_with(prefix)).collect())
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT member FROM kv_set WHERE key = ?1 ORDER BY member")?;
        let rows = stmt.query_map(params![key], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn scard(&self, key: &str) -> Result<u64> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT COUNT(*) FROM kv_set WHERE key = ?1")?;
        let n: i64 = stmt.query_row(params![key], |r| r.get(0))?;
        Ok(n.max(0) as u64)
    }

    fn hgetall(&self, key: &str) -> Result<BTreeMap<String, String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT field, value FROM kv_hash WHERE key = ?1")?;
        let rows = stmt.query_map(params![key], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    fn hmget(&self, key: &str, fields: &[&str]) -> Result<Vec<Option<String>>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare_cached("SELECT value FROM kv_hash WHERE key = ?1 AND field = ?2")?;
        fields
            .iter()
            .map(|f| -> Result<Option<String>> {
                Ok(stmt.query_row(params![key, f], |r| r.get(0)).optional()?)
            })
            .collect()
    }

    fn apply(&self, ops: &[WriteOp]) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        for op in ops {
            match op {
                WriteOp::Set { key, value } => {
                    tx.prepare_cached(
                        "INSERT INTO kv_string (key, value) VALUES (?1, ?2)
                         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                    )?
                    .execute(params![key, value])?;
                }
                WriteOp::SAdd { key, members } => {
                    let mut stmt = tx.prepare_cached(
                        "INSERT OR IGNORE INTO kv_set (key, member) VALUES (?1, ?2)",
                    )?;
                    for m in members {
                        stmt.execute(params![key, m])?;
                    }
                }
                WriteOp::SRem { key, members } => {
                    let mut stmt =
                        tx.prepare_cached("DELETE FROM kv_set WHERE key = ?1 AND member = ?2")?;
                    for m in members {
                        stmt.execute(params![key, m])?;
                    }
                }
                WriteOp::HSet { key, fields } => {
                    let mut stmt = tx.prepare_cached(
                        "INSERT INTO kv_hash (key, field, value) VALUES (?1, ?2, ?3)
                         ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
                    )?;
                    for (f, v) in fields {
                        stmt.execute(params![key, f, v])?;
                    }
                }
                WriteOp::Del { keys } => {
                    for table in ["kv_string", "kv_set", "kv_hash"] {
                        let mut stmt =
                            tx.prepare_cached(&format!("DELETE FROM {table} WHERE key = ?1"))?;
                        for k in keys {
                            stmt.execute(params![k])?;
                        }
                    }
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}
