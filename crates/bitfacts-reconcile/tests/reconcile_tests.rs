//! End-to-end audits over a small Northwind database.

use bitfacts_core::row_profile::bits;
use bitfacts_core::{BitVector, CompareOp, Condition};
use bitfacts_ingest_sql::{ingest_rows, IngestOptions, SqliteSource};
use bitfacts_reconcile::*;
use bitfacts_store::{Keyspace, KvStore, MemoryStore, ScanOptions, WriteOp};
use tempfile::TempDir;

const NORTHWIND: &str = include_str!("../../bitfacts-ingest-sql/tests/fixtures/northwind_mini.sql");

struct Fixture {
    _dir: TempDir,
    source: SqliteSource,
    store: MemoryStore,
    keys: Keyspace,
}

fn ingested() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("northwind.sqlite");
    let conn = rusqlite::Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA foreign_keys=OFF;").unwrap();
    conn.execute_batch(NORTHWIND).unwrap();
    drop(conn);
    let source = SqliteSource::open(&path).unwrap();
    let store = MemoryStore::new();
    let keys = Keyspace::new("er").unwrap();
    ingest_rows(&source, &store, &keys, &IngestOptions::default()).unwrap();
    Fixture {
        _dir: dir,
        source,
        store,
        keys,
    }
}

fn germany() -> Vec<Condition> {
    vec![Condition::new("Country", CompareOp::Eq, "Germany")]
}

// ============================================================================
// Row counts and totals
// ============================================================================

#[test]
fn test_row_counts_match_after_ingest() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let counts = r.report_row_counts().unwrap();
    assert_eq!(counts.len(), 5);
    assert!(counts.iter().all(|c| c.matches), "{counts:?}");
    let customers = counts.iter().find(|c| c.table == "Customers").unwrap();
    assert_eq!((customers.sql_count, customers.store_count), (7, 7));
}

#[test]
fn test_row_count_mismatch_is_reported() {
    let fx = ingested();
    fx.store
        .apply(&[WriteOp::SRem {
            key: fx.keys.table_rows("Orders"),
            members: vec!["10253".into()],
        }])
        .unwrap();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let orders = r
        .report_row_counts()
        .unwrap()
        .into_iter()
        .find(|c| c.table == "Orders")
        .unwrap();
    assert!(!orders.matches);
    assert_eq!((orders.sql_count, orders.store_count), (6, 5));
}

#[test]
fn test_order_totals_round_half_up_on_both_sides() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let totals = r.report_order_totals(20).unwrap();
    let ids: Vec<_> = totals.iter().map(|t| t.order_id.as_str()).collect();
    assert_eq!(ids, vec!["10248", "10249", "10250", "10251", "10252", "10253"]);

    let by_id = |id: &str| totals.iter().find(|t| t.order_id == id).unwrap();
    assert_eq!(by_id("10249").sql_total.to_string(), "59.99");
    assert_eq!(by_id("10249").store_total.to_string(), "59.99");
    assert_eq!(by_id("10248").sql_total.to_string(), "266.00");
    assert_eq!(by_id("10250").store_total.to_string(), "6400.93");
    assert_eq!(by_id("10252").sql_lines, 0);
    assert_eq!(by_id("10252").store_total.to_string(), "0.00");
    assert!(totals.iter().all(|t| t.matches() && t.diff.to_string() == "0.00"));

    let first_two = r.report_order_totals(2).unwrap();
    assert_eq!(first_two.len(), 2);
}

#[test]
fn test_order_total_drift_is_surfaced() {
    let fx = ingested();
    fx.store
        .apply(&[WriteOp::HSet {
            key: fx.keys.obj("OrderDetails", "10251:77"),
            fields: vec![("Quantity".into(), "3".into())],
        }])
        .unwrap();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let totals = r.report_order_totals(10).unwrap();
    let drifted = totals.iter().find(|t| t.order_id == "10251").unwrap();
    assert!(!drifted.matches());
    assert_eq!(drifted.sql_total.to_string(), "26.00");
    assert_eq!(drifted.store_total.to_string(), "39.00");
    assert_eq!(drifted.diff.to_string(), "13.00");
}

#[test]
fn test_totals_limit_is_validated() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    for limit in [0, 101] {
        let err = r.report_order_totals(limit).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ReconcileError>(),
            Some(&ReconcileError::LimitOutOfRange { limit })
        );
    }
    assert!(r.report_order_totals(100).is_ok());
}

// ============================================================================
// Predicate comparison
// ============================================================================

#[test]
fn test_compare_country_agrees() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let c = r.compare_predicate("Customers", &germany(), 20).unwrap();
    assert!(c.agrees());
    assert_eq!(c.results.sql.ids, vec!["ALFKI", "BLAUS", "QUICK"]);
    assert_eq!(c.results.bitset.ids, c.results.sql.ids);
    assert_eq!(c.results.intersection.count, 3);
    assert_eq!(c.sql.params, vec!["Germany"]);
    assert!(c.sql.query.contains("\"Country\" = ?"));
    assert_eq!(c.bitset_filter.bits, vec![bits::CUST_COUNTRY_GERMANY]);
    assert_eq!(c.bitset_filter.bit_names, vec!["country_germany"]);
    assert_eq!(c.scan.keys_scanned, 7);
    assert!(!c.scan.truncated);
}

#[test]
fn test_compare_samples_are_truncated_but_counted() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let c = r.compare_predicate("Customers", &germany(), 1).unwrap();
    assert_eq!(c.results.sql.count, 3);
    assert_eq!(c.results.sql.ids, vec!["ALFKI"]);
}

#[test]
fn test_default_probes_agree_on_clean_ingest() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    for probe in default_probes() {
        let c = r.compare_predicate(&probe.table, &probe.conditions, 20).unwrap();
        assert!(c.agrees(), "{} {:?}: {:?}", probe.table, probe.conditions, c.results);
    }
    let qty = r
        .compare_predicate("OrderDetails", &[Condition::new("Quantity", CompareOp::Ge, "11")], 20)
        .unwrap();
    assert_eq!(qty.results.sql.ids, vec!["10248:11", "10250:1", "10250:38"]);
    let year = r
        .compare_predicate("Orders", &[Condition::new("OrderYear", CompareOp::Eq, "1997")], 20)
        .unwrap();
    assert_eq!(year.results.bitset.ids, vec!["10250"]);
}

#[test]
fn test_store_only_and_sql_only_rows_are_reported() {
    let fx = ingested();
    let planted = BitVector::from_bits([bits::CUST_COUNTRY_GERMANY]).unwrap();
    fx.store
        .apply(&[
            WriteOp::set(
                fx.keys.data("Customers", "GHOST").unwrap(),
                planted.to_decimal_string(),
            ),
            WriteOp::Del {
                keys: vec![fx.keys.data("Customers", "BLAUS").unwrap()],
            },
        ])
        .unwrap();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let c = r.compare_predicate("Customers", &germany(), 20).unwrap();
    assert!(!c.agrees());
    assert_eq!(c.results.only_bitset.ids, vec!["GHOST"]);
    assert_eq!(c.results.only_sql.ids, vec!["BLAUS"]);
    assert_eq!(c.results.intersection.ids, vec!["ALFKI", "QUICK"]);
}

#[test]
fn test_compare_rejects_bad_input() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let err = r.compare_predicate("Customers", &[], 20).unwrap_err();
    assert_eq!(err.downcast_ref::<ReconcileError>(), Some(&ReconcileError::NoConditions));

    let cond = [Condition::new("Fax", CompareOp::Eq, "x")];
    assert!(r.compare_predicate("Customers", &cond, 20).is_err());
    let cond = [Condition::new("UnitPrice", CompareOp::Ge, "15")];
    assert!(r.compare_predicate("Products", &cond, 20).is_err());
    assert!(r.compare_predicate("Employees", &germany(), 20).is_err());
}

#[test]
fn test_truncated_scan_is_flagged() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys).with_scan_options(ScanOptions {
        batch_size: 2,
        max_keys: 2,
    });
    let c = r.compare_predicate("Customers", &germany(), 20).unwrap();
    assert!(c.scan.truncated);
    assert_eq!(c.results.bitset.ids, vec!["ALFKI"]);
    assert_eq!(c.results.only_sql.count, 2);
}

// ============================================================================
// Audit document
// ============================================================================

#[test]
fn test_audit_report_shape() {
    let fx = ingested();
    let r = Reconciler::new(&fx.source, &fx.store, &fx.keys);
    let report = r.audit(&AuditRequest::default()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.comparisons.len(), default_probes().len());

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["prefix"], "er");
    assert_eq!(json["rounding"], "2dp_half_up");
    assert!(json["generated_at"].as_str().unwrap().contains('T'));
    assert_eq!(json["row_counts"][0]["match"], true);
    let t = json["order_totals"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["order_id"] == "10249")
        .unwrap();
    assert_eq!(t["sql_total"], "59.99");
    assert_eq!(t["diff"], "0.00");
    let first = &json["comparisons"][0];
    assert_eq!(first["table"], "Customers");
    assert_eq!(first["results"]["sql"]["count"], 3);
    assert!(first["scan"]["keys_scanned"].is_number());
}
