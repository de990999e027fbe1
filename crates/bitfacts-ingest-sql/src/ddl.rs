//! Offline schema discovery from SQL DDL text.
//!
//! Produces the same [`SqlSchema`] as live introspection so a DDL file can be
//! turned into schema facts without a database:
//! - `CREATE TABLE` columns -> columns (type, NOT NULL, DEFAULT)
//! - column / table `PRIMARY KEY` -> primary key
//! - column / table `UNIQUE` -> unique index
//! - column `REFERENCES` / table `FOREIGN KEY` -> foreign keys, numbered per
//!   table in declaration order
//!
//! Other statements are ignored.

use anyhow::{Context, Result};
use sqlparser::ast::*;
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::model::{ColumnDef, ForeignKey, IndexDef, SqlSchema, TableDef};

fn object_name(name: &ObjectName) -> String {
    name.0.last().map(|i| i.value.clone()).unwrap_or_default()
}

fn idents(cols: &[Ident]) -> Vec<String> {
    cols.iter().map(|c| c.value.clone()).collect()
}

fn action(a: &Option<ReferentialAction>) -> String {
    a.as_ref()
        .map(|a| a.to_string())
        .unwrap_or_else(|| "NO ACTION".to_string())
}

/// Parse SQL DDL and extract schema
pub fn parse_sql_ddl(sql: &str) -> Result<SqlSchema> {
    let dialect = GenericDialect {};
    let statements = Parser::parse_sql(&dialect, sql).context("parsing DDL")?;

    let mut schema = SqlSchema::default();

    for stmt in statements {
        let Statement::CreateTable {
            name,
            columns: sql_columns,
            constraints: sql_constraints,
            ..
        } = stmt
        else {
            continue;
        };

        let mut table = TableDef {
            name: object_name(&name),
            ..Default::default()
        };
        let mut next_fk = 0i64;

        for col in &sql_columns {
            let col_name = col.name.value.clone();
            let mut def = ColumnDef {
                name: col_name.clone(),
                declared_type: col.data_type.to_string(),
                ..Default::default()
            };
            for opt in &col.options {
                match &opt.option {
                    ColumnOption::NotNull => def.not_null = true,
                    ColumnOption::Default(_) => def.has_default = true,
                    ColumnOption::Unique { is_primary, .. } => {
                        if *is_primary {
                            table.primary_key = vec![col_name.clone()];
                        } else {
                            table.indexes.push(IndexDef {
                                name: format!("{}_{}_unique", table.name, col_name),
                                unique: true,
                                columns: vec![col_name.clone()],
                            });
                        }
                    }
                    ColumnOption::ForeignKey {
                        foreign_table,
                        referred_columns,
                        on_delete,
                        on_update,
                        ..
                    } => {
                        table.foreign_keys.push(ForeignKey {
                            id: next_fk,
                            from_columns: vec![col_name.clone()],
                            to_table: object_name(foreign_table),
                            to_columns: idents(referred_columns),
                            on_delete: action(on_delete),
                            on_update: action(on_update),
                        });
                        next_fk += 1;
                    }
                    _ => {}
                }
            }
            table.columns.push(def);
        }

        for constraint in &sql_constraints {
            match constraint {
                TableConstraint::ForeignKey {
                    columns: fk_cols,
                    foreign_table,
                    referred_columns,
                    on_delete,
                    on_update,
                    ..
                } => {
                    table.foreign_keys.push(ForeignKey {
                        id: next_fk,
                        from_columns: idents(fk_cols),
                        to_table: object_name(foreign_table),
                        to_columns: idents(referred_columns),
                        on_delete: action(on_delete),
                        on_update: action(on_update),
                    });
                    next_fk += 1;
                }
                TableConstraint::Unique {
                    name: uq_name,
                    columns: uq_cols,
                    is_primary,
                    ..
                } => {
                    if *is_primary {
                        table.primary_key = idents(uq_cols);
                    } else {
                        let n = table.indexes.len();
                        table.indexes.push(IndexDef {
                            name: uq_name
                                .as_ref()
                                .map(|i| i.value.clone())
                                .unwrap_or_else(|| format!("{}_unique_{n}", table.name)),
                            unique: true,
                            columns: idents(uq_cols),
                        });
                    }
                }
                _ => {}
            }
        }

        schema.tables.push(table);
    }

    Ok(schema)
}
