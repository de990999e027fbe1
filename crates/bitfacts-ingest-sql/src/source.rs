//! Read-only access to the relational source (a SQLite file).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bitfacts_core::predicate::quote_ident;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OpenFlags};

use crate::model::{ColumnDef, ForeignKey, IndexDef, SqlSchema, TableDef};

/// One source row: column name -> text, `None` for SQL NULL.
pub type SourceRow = BTreeMap<String, Option<String>>;

pub struct SqliteSource {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for SqliteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Render a cell as text. Integers and reals print in their shortest exact
/// form, so `19.995` stays `"19.995"` for decimal parsing downstream.
pub fn value_text(v: ValueRef<'_>) -> Option<String> {
    match v {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

/// Bind a textual parameter with the narrowest SQL type it parses as.
pub fn bind_value(s: &str) -> Value {
    let t = s.trim();
    if let Ok(i) = t.parse::<i64>() {
        Value::Integer(i)
    } else if let Some(f) = t.parse::<f64>().ok().filter(|f| f.is_finite()) {
        Value::Real(f)
    } else {
        Value::Text(s.to_string())
    }
}

/// `SELECT <pk columns> FROM <table> WHERE <where_sql>`.
pub fn row_id_query(table: &str, pk: &[String], where_sql: &str) -> Result<String> {
    if pk.is_empty() {
        bail!("table {table} has no primary key");
    }
    let cols = pk.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
    Ok(format!("SELECT {cols} FROM {} WHERE {where_sql}", quote_ident(table)))
}

/// `":"`-joined primary-key values, `None` if any part is NULL.
///
/// Parts containing `:` make the id ambiguous; they are not escaped.
pub fn row_id(row: &SourceRow, pk: &[String]) -> Option<String> {
    if pk.is_empty() {
        return None;
    }
    let parts: Option<Vec<&str>> = pk
        .iter()
        .map(|c| row.get(c).and_then(|v| v.as_deref()))
        .collect();
    Some(parts?.join(":"))
}

impl SqliteSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("relational source not found: {}", path.display());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("opening {}", path.display()))?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Wrap an existing connection (fixtures, in-memory databases).
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            path: PathBuf::from(":memory:"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// First candidate naming an existing table, compared case-insensitively.
    /// Returns the table's actual name.
    pub fn find_table(&self, candidates: &[&str]) -> Result<Option<String>> {
        let names = self.table_names()?;
        Ok(candidates.iter().find_map(|c| {
            names
                .iter()
                .find(|n| n.to_lowercase() == c.to_lowercase())
                .cloned()
        }))
    }

    pub fn columns(&self, table: &str) -> Result<Vec<ColumnDef>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let rows = stmt.query_map(params![table], |r| {
            Ok(ColumnDef {
                name: r.get(0)?,
                declared_type: r.get::<_, Option<String>>(1)?.unwrap_or_default(),
                not_null: r.get::<_, i64>(2)? != 0,
                has_default: r.get_ref(3)? != ValueRef::Null,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Primary-key columns in key order; empty for rowid-only tables.
    pub fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM pragma_table_info(?1) WHERE pk > 0 ORDER BY pk",
        )?;
        let rows = stmt.query_map(params![table], |r| r.get::<_, String>(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    pub fn indexes(&self, table: &str) -> Result<Vec<IndexDef>> {
        let mut list = self
            .conn
            .prepare("SELECT name, \"unique\" FROM pragma_index_list(?1) ORDER BY seq")?;
        let heads: Vec<(String, bool)> = list
            .query_map(params![table], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)? != 0))
            })?
            .collect::<rusqlite::Result<_>>()?;

        let mut info = self
            .conn
            .prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
        let mut out = Vec::with_capacity(heads.len());
        for (name, unique) in heads {
            let columns: Vec<Option<String>> = info
                .query_map(params![name], |r| r.get::<_, Option<String>>(0))?
                .collect::<rusqlite::Result<_>>()?;
            out.push(IndexDef {
                name,
                unique,
                // Expression index parts have no column name.
                columns: columns.into_iter().flatten().collect(),
            });
        }
        Ok(out)
    }

    /// Foreign keys grouped by constraint id.
    pub fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, \"table\", \"from\", \"to\", on_update, on_delete
             FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
        )?;
        let rows = stmt.query_map(params![table], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, Option<String>>(3)?,
                r.get::<_, Option<String>>(4)?,
                r.get::<_, Option<String>>(5)?,
            ))
        })?;

        let mut out: Vec<ForeignKey> = Vec::new();
        for row in rows {
            let (id, to_table, from, to, on_update, on_delete) = row?;
            match out.last_mut() {
                Some(fk) if fk.id == id => {
                    fk.from_columns.push(from);
                    fk.to_columns.extend(to);
                }
                _ => out.push(ForeignKey {
                    id,
                    from_columns: vec![from],
                    to_table,
                    to_columns: to.into_iter().collect(),
                    on_delete: on_delete.unwrap_or_default(),
                    on_update: on_update.unwrap_or_default(),
                }),
            }
        }
        Ok(out)
    }

    pub fn describe(&self, table: &str) -> Result<TableDef> {
        Ok(TableDef {
            name: table.to_string(),
            columns: self.columns(table)?,
            primary_key: self.primary_key(table)?,
            indexes: self.indexes(table)?,
            foreign_keys: self.foreign_keys(table)?,
        })
    }

    /// Every user table.
    pub fn schema(&self) -> Result<SqlSchema> {
        let tables = self
            .table_names()?
            .iter()
            .map(|t| self.describe(t).with_context(|| format!("introspecting {t}")))
            .collect::<Result<_>>()?;
        Ok(SqlSchema { tables })
    }

    // ========================================================================
    // Rows
    // ========================================================================

    pub fn count(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let n: i64 = self.conn.query_row(&sql, [], |r| r.get(0))?;
        Ok(n.max(0) as u64)
    }

    /// Stream `SELECT *` rows of `table` into `f`; `limit == 0` reads all.
    /// Returns the number of rows visited.
    pub fn for_each_row<F>(&self, table: &str, limit: usize, mut f: F) -> Result<usize>
    where
        F: FnMut(&SourceRow) -> Result<()>,
    {
        let sql = format!("SELECT * FROM {}", quote_ident(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let mut rows = stmt.query([])?;

        let mut visited = 0usize;
        while let Some(r) = rows.next()? {
            if limit > 0 && visited >= limit {
                break;
            }
            let mut row = SourceRow::new();
            for (i, name) in names.iter().enumerate() {
                row.insert(name.clone(), value_text(r.get_ref(i)?));
            }
            f(&row)?;
            visited += 1;
        }
        Ok(visited)
    }

    /// Run a read query and return every cell as text.
    pub fn query_text(&self, sql: &str, params: &[Value]) -> Result<Vec<Vec<Option<String>>>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .with_context(|| format!("preparing `{sql}`"))?;
        let width = stmt.column_count();
        let rows = stmt.query_map(params_from_iter(params.iter()), |r| {
            (0..width)
                .map(|i| Ok(value_text(r.get_ref(i)?)))
                .collect::<rusqlite::Result<Vec<_>>>()
        })?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Row ids of `table` satisfying `where_sql`, whose `?` placeholders
    /// are bound from `params` via [`bind_value`]. Rows with a NULL key part
    /// are dropped.
    pub fn select_row_ids(
        &self,
        table: &str,
        pk: &[String],
        where_sql: &str,
        params: &[String],
    ) -> Result<Vec<String>> {
        let sql = row_id_query(table, pk, where_sql)?;
        let bound: Vec<Value> = params.iter().map(|p| bind_value(p)).collect();
        let rows = self.query_text(&sql, &bound)?;
        Ok(rows
            .into_iter()
            .filter_map(|cells| {
                let parts: Option<Vec<String>> = cells.into_iter().collect();
                parts.map(|p| p.join(":"))
            })
            .collect())
    }
}
