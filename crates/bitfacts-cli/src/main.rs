//! Bitfacts CLI
//!
//! Command-line interface for:
//! - Importing schema facts from a SQLite database or a DDL file
//! - Ingesting row facts (bucketed row vectors, object hashes, indexes)
//! - Comparing bucketed predicates against exact SQL
//! - Reconciliation reports (row counts, order totals, full audit)

use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use bitfacts_core::{CompareOp, Condition, RowTable};
use bitfacts_ingest_sql::{
    data_info, describe_table, import_schema, ingest_rows, parse_sql_ddl, reset_rows, reset_schema,
    IngestOptions, SchemaImportOptions,
};
use bitfacts_reconcile::{AuditRequest, Reconciler, DEFAULT_SAMPLE, DEFAULT_TOTALS_LIMIT};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;

mod config;
mod render;

use config::{GlobalArgs, Settings};

#[derive(Parser)]
#[command(name = "bitfacts")]
#[command(author, version, about = "Bitfacts: bucketed bitset facts over relational data")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schema facts: one vector per table, column and foreign key.
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },

    /// Row facts: per-row vectors, object hashes and membership sets.
    Data {
        #[command(subcommand)]
        command: DataCommands,
    },

    /// Run a predicate as exact SQL and as a bitset scan, then diff the ids.
    ///
    /// Example: `bitfacts compare Products --where UnitPrice '>=' 20`
    Compare {
        /// Logical table (Customers, Orders, OrderDetails, Products, Categories)
        table: String,
        /// Condition as three tokens: COLUMN OP VALUE (repeatable, ANDed)
        #[arg(
            long = "where",
            num_args = 3,
            value_names = ["COLUMN", "OP", "VALUE"],
            action = ArgAction::Append,
            required = true
        )]
        conditions: Vec<String>,
        /// Row ids listed per result set
        #[arg(long, default_value_t = DEFAULT_SAMPLE)]
        sample: usize,
    },

    /// Reconciliation reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// Import schema facts from the relational source.
    Import {
        /// Delete previously imported schema facts first
        #[arg(long)]
        reset: bool,
    },
    /// Delete every registered schema fact.
    Reset,
    /// Decode the stored facts of one table.
    Show { table: String },
    /// Import schema facts from `CREATE TABLE` statements, without a database.
    Ddl {
        file: PathBuf,
        #[arg(long)]
        reset: bool,
    },
}

#[derive(Subcommand)]
enum DataCommands {
    /// Ingest row facts from the relational source.
    Ingest {
        /// Tables to ingest (default: all row-profile tables)
        #[arg(long, value_delimiter = ',')]
        tables: Vec<String>,
        /// Rows read per table (0 = all)
        #[arg(long, default_value_t = 0)]
        limit: usize,
        /// Delete previously ingested row facts first
        #[arg(long)]
        reset: bool,
    },
    /// Delete every registered row fact.
    Reset,
    /// Registry size and per-table row counts.
    Info,
}

#[derive(Subcommand)]
enum ReportCommands {
    /// Row counts, source vs. store.
    Counts,
    /// Order totals of the first N orders, source vs. store.
    Totals {
        #[arg(long, default_value_t = DEFAULT_TOTALS_LIMIT)]
        limit: usize,
    },
    /// Row counts, order totals and the default predicate comparisons.
    Audit {
        #[arg(long, default_value_t = DEFAULT_TOTALS_LIMIT)]
        limit: usize,
        #[arg(long, default_value_t = DEFAULT_SAMPLE)]
        sample: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::resolve(&cli.global)?;

    tracing_subscriber::fmt()
        .with_max_level(settings.log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .ok();

    match cli.command {
        Commands::Schema { command } => cmd_schema(&settings, command),
        Commands::Data { command } => cmd_data(&settings, command),
        Commands::Compare {
            table,
            conditions,
            sample,
        } => cmd_compare(&settings, &table, &conditions, sample),
        Commands::Report { command } => cmd_report(&settings, command),
    }
}

fn emit<T: Serialize>(settings: &Settings, value: &T, summary: impl FnOnce(&T)) -> Result<()> {
    if settings.json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        summary(value);
    }
    Ok(())
}

// ============================================================================
// Schema
// ============================================================================

fn cmd_schema(settings: &Settings, command: SchemaCommands) -> Result<()> {
    let store = settings.open_store()?;
    let keys = settings.keyspace()?;
    let opts = |reset| SchemaImportOptions {
        reset,
        batch_size: settings.batch_size,
    };

    match command {
        SchemaCommands::Import { reset } => {
            let source = settings.open_source()?;
            let schema = source.schema()?;
            let summary = import_schema(&schema, store.as_ref(), &keys, &opts(reset))?;
            emit(settings, &summary, render::schema_import)
        }
        SchemaCommands::Ddl { file, reset } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let schema = parse_sql_ddl(&text)?;
            let summary = import_schema(&schema, store.as_ref(), &keys, &opts(reset))?;
            emit(settings, &summary, render::schema_import)
        }
        SchemaCommands::Reset => {
            let outcome = reset_schema(store.as_ref(), &keys)?;
            emit(settings, &outcome, render::reset)
        }
        SchemaCommands::Show { table } => {
            let desc = describe_table(store.as_ref(), &keys, &table)?;
            emit(settings, &desc, render::table_description)
        }
    }
}

// ============================================================================
// Data
// ============================================================================

fn cmd_data(settings: &Settings, command: DataCommands) -> Result<()> {
    let store = settings.open_store()?;
    let keys = settings.keyspace()?;

    match command {
        DataCommands::Ingest {
            tables,
            limit,
            reset,
        } => {
            let source = settings.open_source()?;
            let mut opts = IngestOptions {
                reset,
                max_rows_per_table: limit,
                batch_size: settings.batch_size,
                ..Default::default()
            };
            if !tables.is_empty() {
                opts.tables = tables
                    .iter()
                    .map(|t| RowTable::from_str(t))
                    .collect::<Result<_, _>>()?;
            }
            let summary = ingest_rows(&source, store.as_ref(), &keys, &opts)?;
            emit(settings, &summary, render::ingest)
        }
        DataCommands::Reset => {
            let outcome = reset_rows(store.as_ref(), &keys)?;
            emit(settings, &outcome, render::reset)
        }
        DataCommands::Info => {
            let info = data_info(store.as_ref(), &keys)?;
            emit(settings, &info, render::data_info)
        }
    }
}

// ============================================================================
// Compare / report
// ============================================================================

/// Group `COLUMN OP VALUE` triples into conditions.
fn parse_conditions(tokens: &[String]) -> Result<Vec<Condition>> {
    if tokens.is_empty() || tokens.len() % 3 != 0 {
        bail!("--where takes COLUMN OP VALUE triples");
    }
    tokens
        .chunks(3)
        .map(|t| -> Result<Condition> {
            let op = CompareOp::from_str(&t[1])?;
            Ok(Condition::new(t[0].as_str(), op, t[2].as_str()))
        })
        .collect()
}

fn cmd_compare(settings: &Settings, table: &str, tokens: &[String], sample: usize) -> Result<()> {
    let conditions = parse_conditions(tokens)?;
    let source = settings.open_source()?;
    let store = settings.open_store()?;
    let keys = settings.keyspace()?;
    let reconciler = Reconciler::new(&source, store.as_ref(), &keys)
        .with_scan_options(settings.scan_options());
    let comparison = reconciler.compare_predicate(table, &conditions, sample)?;
    emit(settings, &comparison, render::comparison)
}

fn cmd_report(settings: &Settings, command: ReportCommands) -> Result<()> {
    let source = settings.open_source()?;
    let store = settings.open_store()?;
    let keys = settings.keyspace()?;
    let reconciler = Reconciler::new(&source, store.as_ref(), &keys)
        .with_scan_options(settings.scan_options());

    match command {
        ReportCommands::Counts => {
            let counts = reconciler.report_row_counts()?;
            emit(settings, &counts, |c| render::row_counts(c))
        }
        ReportCommands::Totals { limit } => {
            let totals = reconciler.report_order_totals(limit)?;
            emit(settings, &totals, |t| render::order_totals(t))
        }
        ReportCommands::Audit { limit, sample } => {
            let req = AuditRequest {
                totals_limit: limit,
                sample,
                ..Default::default()
            };
            let report = reconciler.audit(&req)?;
            emit(settings, &report, render::audit)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn where_triples_become_conditions() {
        let cli = Cli::try_parse_from([
            "bitfacts", "compare", "Products", "--where", "UnitPrice", ">=", "20", "--where",
            "CategoryID", "=", "1", "--json",
        ])
        .unwrap();
        assert!(cli.global.json);
        let Commands::Compare { table, conditions, .. } = cli.command else {
            panic!("expected compare");
        };
        assert_eq!(table, "Products");
        let parsed = parse_conditions(&conditions).unwrap();
        assert_eq!(
            parsed,
            vec![
                Condition::new("UnitPrice", CompareOp::Ge, "20"),
                Condition::new("CategoryID", CompareOp::Eq, "1"),
            ]
        );
    }

    #[test]
    fn bad_operator_is_rejected() {
        let tokens: Vec<String> = ["Country", "~", "UK"].iter().map(|s| s.to_string()).collect();
        assert!(parse_conditions(&tokens).is_err());
        assert!(parse_conditions(&tokens[..2]).is_err());
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "bitfacts", "data", "ingest", "--tables", "Customers,Orders", "--prefix", "nw",
            "--store", ":memory:",
        ])
        .unwrap();
        assert_eq!(cli.global.prefix.as_deref(), Some("nw"));
        let Commands::Data {
            command: DataCommands::Ingest { tables, .. },
        } = cli.command
        else {
            panic!("expected data ingest");
        };
        assert_eq!(tables, vec!["Customers", "Orders"]);
    }
}
