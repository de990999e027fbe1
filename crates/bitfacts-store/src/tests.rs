//! Behaviour shared by both backends, plus writer / reset / scan tests.

use super::*;
use bitfacts_core::{compile, BitVector, CompareOp, Condition};

fn backends() -> Vec<(&'static str, Box<dyn KvStore>)> {
    vec![
        ("memory", Box::new(MemoryStore::new())),
        ("sqlite", Box::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

fn row_value(bits: &[u32]) -> String {
    BitVector::from_bits(bits.iter().copied())
        .unwrap()
        .to_decimal_string()
}

#[test]
fn test_string_set_hash_semantics() {
    for (name, store) in backends() {
        store
            .apply(&[
                WriteOp::set("k:a", "1"),
                WriteOp::set("k:a", "2"),
                WriteOp::sadd("s", "x"),
                WriteOp::sadd("s", "x"),
                WriteOp::sadd("s", "y"),
                WriteOp::HSet {
                    key: "h".into(),
                    fields: vec![("f".into(), "1".into()), ("g".into(), "2".into())],
                },
            ])
            .unwrap();

        assert_eq!(store.get("k:a").unwrap(), Some(b"2".to_vec()), "{name}");
        assert_eq!(store.get("missing").unwrap(), None, "{name}");
        assert_eq!(store.smembers("s").unwrap(), vec!["x", "y"], "{name}");
        assert_eq!(store.scard("s").unwrap(), 2, "{name}");
        assert_eq!(store.scard("nope").unwrap(), 0, "{name}");
        assert_eq!(
            store.hmget("h", &["g", "zz", "f"]).unwrap(),
            vec![Some("2".to_string()), None, Some("1".to_string())],
            "{name}"
        );
        assert!(store.exists("h").unwrap() && store.exists("s").unwrap(), "{name}");

        store
            .apply(&[
                WriteOp::SRem {
                    key: "s".into(),
                    members: vec!["x".into()],
                },
                WriteOp::Del {
                    keys: vec!["k:a".into(), "h".into()],
                },
            ])
            .unwrap();
        assert_eq!(store.smembers("s").unwrap(), vec!["y"], "{name}");
        assert!(!store.exists("k:a").unwrap(), "{name}");
        assert!(store.hgetall("h").unwrap().is_empty(), "{name}");
    }
}

#[test]
fn test_scan_prefix_pages_in_order() {
    for (name, store) in backends() {
        let mut ops: Vec<WriteOp> = (0..25)
            .map(|i| WriteOp::set(format!("er:data:Orders:{:03}", i), "0"))
            .collect();
        ops.push(WriteOp::set("er:data:OrdersArchive:1", "0"));
        ops.push(WriteOp::set("er:data:Customers:ALFKI", "0"));
        store.apply(&ops).unwrap();

        let mut seen = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = store
                .scan_prefix("er:data:Orders:", cursor.as_deref(), 7)
                .unwrap();
            if page.is_empty() {
                break;
            }
            assert!(page.len() <= 7, "{name}");
            cursor = page.last().cloned();
            seen.extend(page);
        }
        let expected: Vec<String> = (0..25).map(|i| format!("er:data:Orders:{:03}", i)).collect();
        assert_eq!(seen, expected, "{name}");
    }
}

#[test]
fn test_mget_preserves_order_and_gaps() {
    for (name, store) in backends() {
        store
            .apply(&[WriteOp::set("a", "1"), WriteOp::set("c", "3")])
            .unwrap();
        let got = store
            .mget(&["c".to_string(), "b".to_string(), "a".to_string()])
            .unwrap();
        assert_eq!(got, vec![Some(b"3".to_vec()), None, Some(b"1".to_vec())], "{name}");
    }
}

#[test]
fn test_batch_writer_flushes_at_threshold_and_registers_keys() {
    let store = MemoryStore::new();
    let mut w = BatchWriter::new(&store, 3).with_registry("reg");
    w.set_registered("k1".into(), "1").unwrap();
    assert_eq!(store.get("k1").unwrap(), None);
    w.set_registered("k2".into(), "2").unwrap();
    // two sets + the pending registry add reach the threshold
    assert_eq!(store.get("k1").unwrap(), Some(b"1".to_vec()));
    w.sadd_registered("s1".into(), "m").unwrap();
    let stats = w.finish().unwrap();

    assert_eq!(stats.batches, 2);
    assert_eq!(store.smembers("reg").unwrap(), vec!["k1", "k2", "s1"]);
    assert_eq!(store.smembers("s1").unwrap(), vec!["m"]);
}

#[test]
fn test_reset_deletes_only_registered_keys() {
    for (name, store) in backends() {
        let keys = Keyspace::new("er").unwrap();
        let mut w = BatchWriter::new(store.as_ref(), 2).with_registry(keys.data_registry());
        for i in 0..1200 {
            w.set_registered(keys.data("Orders", &i.to_string()).unwrap(), "0")
                .unwrap();
        }
        w.finish().unwrap();

        // Same prefix, never registered.
        let bystander = keys.data("Orders", "manual").unwrap();
        store.apply(&[WriteOp::set(bystander.clone(), "7")]).unwrap();

        let outcome = reset_registry(store.as_ref(), &keys.data_registry()).unwrap();
        assert_eq!(outcome.deleted_keys, 1200, "{name}");
        assert!(outcome.registry_existed, "{name}");
        assert_eq!(store.get(&bystander).unwrap(), Some(b"7".to_vec()), "{name}");
        assert!(!store.exists(&keys.data_registry()).unwrap(), "{name}");
        assert_eq!(
            store.scan_prefix(&keys.data_prefix("Orders"), None, 10).unwrap(),
            vec![bystander],
            "{name}"
        );

        let again = reset_registry(store.as_ref(), &keys.data_registry()).unwrap();
        assert_eq!((again.deleted_keys, again.registry_existed), (0, false), "{name}");
    }
}

fn seed_customers(store: &dyn KvStore, keys: &Keyspace) {
    use bitfacts_core::row_profile::bits;
    let rows: &[(&str, String)] = &[
        ("ALFKI", row_value(&[bits::CUST_COUNTRY_GERMANY, bits::CUST_CITY_BERLIN])),
        ("BLAUS", row_value(&[bits::CUST_COUNTRY_GERMANY])),
        ("BONAP", row_value(&[bits::CUST_COUNTRY_FRANCE])),
        ("EMPTY", String::new()),
        ("JUNK1", "not-a-number".to_string()),
        ("ZZZZZ", row_value(&[bits::CUST_COUNTRY_GERMANY])),
    ];
    let ops: Vec<WriteOp> = rows
        .iter()
        .map(|(id, v)| WriteOp::set(keys.data("Customers", id).unwrap(), v.as_str()))
        .collect();
    store.apply(&ops).unwrap();
}

#[test]
fn test_scan_filters_and_skips_malformed_values() {
    for (name, store) in backends() {
        let keys = Keyspace::new("er").unwrap();
        seed_customers(store.as_ref(), &keys);
        let pred = compile(
            "Customers",
            &[Condition::new("Country", CompareOp::Eq, "Germany")],
        )
        .unwrap();

        let out = scan_matching(
            store.as_ref(),
            &keys,
            &pred,
            &ScanOptions {
                batch_size: 2,
                max_keys: 100,
            },
        )
        .unwrap();
        assert_eq!(out.row_ids, vec!["ALFKI", "BLAUS", "ZZZZZ"], "{name}");
        assert_eq!(out.stats.keys_scanned, 6, "{name}");
        assert_eq!(out.stats.malformed_skipped, 2, "{name}");
        assert_eq!(out.stats.batches, 3, "{name}");
        assert!(!out.stats.truncated, "{name}");
    }
}

#[test]
fn test_scan_reports_truncation_at_ceiling() {
    let store = MemoryStore::new();
    let keys = Keyspace::new("er").unwrap();
    seed_customers(&store, &keys);
    let pred = compile("Customers", &[Condition::new("Country", CompareOp::Eq, "Germany")]).unwrap();

    let out = scan_matching(&store, &keys, &pred, &ScanOptions { batch_size: 4, max_keys: 3 }).unwrap();
    assert!(out.stats.truncated);
    assert_eq!(out.stats.keys_scanned, 3);
    assert_eq!(out.row_ids, vec!["ALFKI", "BLAUS"]);

    // Exactly at the ceiling with nothing left is not truncation.
    let out = scan_matching(&store, &keys, &pred, &ScanOptions { batch_size: 4, max_keys: 6 }).unwrap();
    assert!(!out.stats.truncated);
}

#[test]
fn test_open_store_by_location() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("s.sqlite");
    let store = open_store(path.to_str().unwrap()).unwrap();
    store.apply(&[WriteOp::set("x", "1")]).unwrap();
    assert!(path.exists());
    assert!(open_store(":memory:").unwrap().get("x").unwrap().is_none());
}
