//! Relational ingestion for Bitfacts
//!
//! Reads a Northwind-shaped SQLite database (read-only) and writes:
//! - Schema facts: tables, columns, foreign keys -> 512-byte vectors
//! - Row facts: bucketed row vectors, object hashes, membership sets
//!
//! Schema structure can also be discovered offline from DDL text with
//! [`parse_sql_ddl`].

pub mod data_import;
pub mod ddl;
pub mod model;
pub mod schema_import;
pub mod source;
pub mod tables;

pub use data_import::{data_info, ingest_rows, reset_rows, DataInfo, IngestOptions, IngestSummary};
pub use ddl::parse_sql_ddl;
pub use model::{ColumnDef, ForeignKey, IndexDef, SqlSchema, TableDef};
pub use schema_import::{
    describe_table, import_schema, list_tables, reset_schema, SchemaImportOptions,
    SchemaImportSummary, TableDescription,
};
pub use source::{bind_value, row_id, row_id_query, SourceRow, SqliteSource};
pub use tables::{resolve_row_table, resolve_table, LOGICAL_TABLES};
