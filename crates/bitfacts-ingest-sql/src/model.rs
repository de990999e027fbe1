//! Relational structure shared by live introspection and offline DDL.

use std::collections::BTreeSet;

use bitfacts_core::{ColumnTraits, RelationTraits};
use serde::Serialize;

/// Discovered SQL schema
#[derive(Debug, Clone, Default, Serialize)]
pub struct SqlSchema {
    pub tables: Vec<TableDef>,
}

impl SqlSchema {
    pub fn table(&self, name: &str) -> Option<&TableDef> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// In key order.
    pub primary_key: Vec<String>,
    pub indexes: Vec<IndexDef>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub has_default: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexDef {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// One foreign-key constraint, possibly spanning several columns.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ForeignKey {
    /// Constraint id within the child table; names the `fk{n}` key.
    pub id: i64,
    pub from_columns: Vec<String>,
    pub to_table: String,
    pub to_columns: Vec<String>,
    pub on_delete: String,
    pub on_update: String,
}

fn same_columns(a: &[String], b: &[String]) -> bool {
    let lower = |cols: &[String]| -> BTreeSet<String> {
        cols.iter().map(|c| c.to_ascii_lowercase()).collect()
    };
    !a.is_empty() && lower(a) == lower(b)
}

fn mentions(cols: &[String], name: &str) -> bool {
    cols.iter().any(|c| c.eq_ignore_ascii_case(name))
}

impl TableDef {
    pub fn is_pk(&self, column: &str) -> bool {
        mentions(&self.primary_key, column)
    }

    pub fn is_fk(&self, column: &str) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| mentions(&fk.from_columns, column))
    }

    pub fn has_index(&self, column: &str) -> bool {
        self.indexes.iter().any(|ix| mentions(&ix.columns, column))
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_traits<'a>(&self, col: &'a ColumnDef) -> ColumnTraits<'a> {
        ColumnTraits {
            declared_type: &col.declared_type,
            not_null: col.not_null,
            has_default: col.has_default,
            is_pk: self.is_pk(&col.name),
            is_fk: self.is_fk(&col.name),
            has_index: self.has_index(&col.name),
        }
    }

    /// 1:1 when the FK columns are exactly the primary key or exactly a
    /// unique index; mandatory when every FK column is NOT NULL.
    pub fn relation_traits<'a>(&self, fk: &'a ForeignKey) -> RelationTraits<'a> {
        let is_unique_child = same_columns(&fk.from_columns, &self.primary_key)
            || self
                .indexes
                .iter()
                .filter(|ix| ix.unique)
                .any(|ix| same_columns(&fk.from_columns, &ix.columns));
        let child_mandatory = !fk.from_columns.is_empty()
            && fk
                .from_columns
                .iter()
                .all(|c| self.column(c).is_some_and(|cd| cd.not_null));
        RelationTraits {
            is_unique_child,
            child_mandatory,
            on_delete: &fk.on_delete,
            on_update: &fk.on_update,
        }
    }
}
