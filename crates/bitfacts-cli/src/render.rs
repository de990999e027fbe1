//! Coloured terminal summaries. `--json` bypasses all of this.

use bitfacts_ingest_sql::{DataInfo, IngestSummary, SchemaImportSummary, TableDescription};
use bitfacts_reconcile::{AuditReport, Comparison, IdSample, OrderTotal, RowCount};
use bitfacts_store::ResetOutcome;
use colored::Colorize;

fn verdict(ok: bool) -> colored::ColoredString {
    if ok {
        "ok".green().bold()
    } else {
        "MISMATCH".red().bold()
    }
}

fn opt<T: std::fmt::Debug>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "-".to_string(), |v| format!("{v:?}"))
}

pub fn schema_import(s: &SchemaImportSummary) {
    if let Some(r) = &s.reset {
        reset(r);
    }
    println!(
        "{} {} tables, {} columns, {} relations ({} ms)",
        "Imported".green().bold(),
        s.tables,
        s.columns,
        s.relations,
        s.elapsed_ms
    );
    println!("  {} {}", "→".cyan(), s.registry_key);
}

pub fn reset(r: &ResetOutcome) {
    if r.registry_existed {
        println!("{} {} keys", "Deleted".yellow().bold(), r.deleted_keys);
    } else {
        println!("{} nothing registered", "info:".yellow().bold());
    }
}

pub fn table_description(d: &TableDescription) {
    println!("{} {}", "Table".bold(), d.table.cyan());
    for c in &d.columns {
        let mut flags = Vec::new();
        for (on, name) in [
            (c.meta.is_pk, "pk"),
            (c.meta.is_fk, "fk"),
            (c.meta.has_index, "indexed"),
            (c.meta.has_default, "default"),
        ] {
            if on {
                flags.push(name);
            }
        }
        println!(
            "  {:<24} {:<10} not_null={:<6} length={:<8} {}",
            c.name,
            opt(&c.meta.type_family),
            opt(&c.meta.not_null),
            opt(&c.meta.length_bucket),
            flags.join(",").dimmed()
        );
    }
    for r in &d.relations {
        println!(
            "  {} {} → {} ({}) {} child_required={} on_delete={} on_update={}",
            "rel".cyan(),
            r.from_table,
            r.to_table,
            r.fk,
            opt(&r.meta.cardinality),
            opt(&r.meta.child_required),
            opt(&r.meta.on_delete),
            opt(&r.meta.on_update)
        );
    }
    if d.skipped > 0 {
        println!("  {} {} values were not schema vectors", "warn:".yellow().bold(), d.skipped);
    }
}

pub fn ingest(s: &IngestSummary) {
    if let Some(r) = &s.reset {
        reset(r);
    }
    println!(
        "{} {} ({} batches, {} ms)",
        "Ingested".green().bold(),
        s.source,
        s.batches,
        s.elapsed_ms
    );
    for (table, created) in &s.created_by_table {
        let processed = s.processed_by_table.get(table).copied().unwrap_or(0);
        println!("  {} {:<14} {created}/{processed}", "→".cyan(), table);
    }
    for table in &s.missing_tables {
        println!("  {} {} not in source", "→".yellow(), table);
    }
}

pub fn data_info(i: &DataInfo) {
    println!("{} {} ({} keys)", "Registry".bold(), i.registry_key, i.registered_keys);
    for (table, n) in &i.rows_by_table {
        println!("  {} {:<14} {n}", "→".cyan(), table);
    }
}

pub fn row_counts(counts: &[RowCount]) {
    println!("{}", "Row counts".bold());
    for c in counts {
        println!(
            "  {:<14} sql={:<8} store={:<8} {}",
            c.table,
            c.sql_count,
            c.store_count,
            verdict(c.matches)
        );
    }
}

pub fn order_totals(totals: &[OrderTotal]) {
    println!("{}", "Order totals (2dp half-up)".bold());
    for t in totals {
        println!(
            "  {:<10} sql={:>12} store={:>12} diff={:>10} {}",
            t.order_id,
            t.sql_total.to_string(),
            t.store_total.to_string(),
            t.diff.to_string(),
            verdict(t.matches())
        );
    }
}

fn ids(label: &str, s: &IdSample) {
    let more = if s.count > s.ids.len() { " …" } else { "" };
    println!("  {:<13} {:>6}  {}{more}", label, s.count, s.ids.join(" ").dimmed());
}

pub fn comparison(c: &Comparison) {
    println!(
        "{} {} where {} {}",
        "Compare".bold(),
        c.table.cyan(),
        c.bitset_filter.conditions.join(" AND "),
        verdict(c.agrees())
    );
    println!("  {} {} {:?}", "sql".cyan(), c.sql.query, c.sql.params);
    println!("  {} {}", "bits".cyan(), c.bitset_filter.bit_names.join(", "));
    ids("sql", &c.results.sql);
    ids("bitset", &c.results.bitset);
    ids("intersection", &c.results.intersection);
    ids("only_sql", &c.results.only_sql);
    ids("only_bitset", &c.results.only_bitset);
    println!(
        "  scanned {} keys in {} batches, {} malformed skipped ({} ms)",
        c.scan.keys_scanned, c.scan.batches, c.scan.malformed_skipped, c.elapsed_ms
    );
    if c.scan.truncated {
        println!(
            "  {} scan stopped at the {}-key ceiling",
            "warn:".yellow().bold(),
            c.scan.max_keys
        );
    }
}

pub fn audit(r: &AuditReport) {
    println!("{} prefix={} source={} at {}", "Audit".bold(), r.prefix, r.source, r.generated_at);
    row_counts(&r.row_counts);
    order_totals(&r.order_totals);
    for c in &r.comparisons {
        comparison(c);
    }
    println!("{}", verdict(r.is_clean()));
}
