//! Schema bit-profile `northwind_meta_v0`: structural facts about tables,
//! columns and foreign-key relations.
//!
//! Layout:
//! - 0–255: identification bits
//! - 256–1023: descriptive (column) bits
//! - 1024–1791: relational bits
//! - 1792–4095: reserved
//!
//! Bit positions are permanent for this profile id. New facts take a fresh,
//! unused position; existing ones are never moved.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bitvec::BitVector;
use crate::normalize::norm_upper;

pub const PROFILE_ID: &str = "northwind_meta_v0";

pub mod bits {
    pub const IS_TABLE: u32 = 0;
    pub const IS_COLUMN: u32 = 1;
    pub const IS_FK_REL: u32 = 5;

    pub const TABLE_META: u32 = 17;
    pub const COLUMN_META: u32 = 18;
    pub const REL_META: u32 = 19;

    pub const TYPE_TEXT: u32 = 256;
    pub const TYPE_INTEGER: u32 = 257;
    pub const TYPE_REAL: u32 = 258;
    pub const TYPE_NUMERIC: u32 = 259;
    pub const TYPE_DATETIME: u32 = 260;
    pub const TYPE_BLOB: u32 = 261;

    pub const NOT_NULL: u32 = 272;
    pub const NULL_ALLOWED: u32 = 273;
    pub const HAS_DEFAULT: u32 = 274;
    pub const PART_OF_PK: u32 = 275;
    pub const PART_OF_FK: u32 = 276;
    pub const HAS_INDEX: u32 = 278;

    pub const LEN_SMALL: u32 = 288;
    pub const LEN_MEDIUM: u32 = 289;
    pub const LEN_LARGE: u32 = 290;
    pub const LEN_HUGE: u32 = 291;

    pub const RELATION: u32 = 1024;
    pub const CARD_1_1: u32 = 1030;
    pub const CARD_1_N: u32 = 1031;
    pub const CHILD_MANDATORY: u32 = 1040;
    pub const CHILD_OPTIONAL: u32 = 1041;

    pub const DEL_CASCADE: u32 = 1050;
    pub const DEL_SET_NULL: u32 = 1051;
    pub const DEL_RESTRICT: u32 = 1052;
    pub const UPD_CASCADE: u32 = 1053;
    pub const UPD_SET_NULL: u32 = 1054;
    pub const UPD_RESTRICT: u32 = 1055;
}

/// Every named position of this profile.
pub const ASSIGNMENTS: &[(u32, &str)] = &[
    (bits::IS_TABLE, "is_table"),
    (bits::IS_COLUMN, "is_column"),
    (bits::IS_FK_REL, "is_fk_rel"),
    (bits::TABLE_META, "table_meta"),
    (bits::COLUMN_META, "column_meta"),
    (bits::REL_META, "rel_meta"),
    (bits::TYPE_TEXT, "type_text"),
    (bits::TYPE_INTEGER, "type_integer"),
    (bits::TYPE_REAL, "type_real"),
    (bits::TYPE_NUMERIC, "type_numeric"),
    (bits::TYPE_DATETIME, "type_datetime"),
    (bits::TYPE_BLOB, "type_blob"),
    (bits::NOT_NULL, "not_null"),
    (bits::NULL_ALLOWED, "null_allowed"),
    (bits::HAS_DEFAULT, "has_default"),
    (bits::PART_OF_PK, "part_of_pk"),
    (bits::PART_OF_FK, "part_of_fk"),
    (bits::HAS_INDEX, "has_index"),
    (bits::LEN_SMALL, "len_small"),
    (bits::LEN_MEDIUM, "len_medium"),
    (bits::LEN_LARGE, "len_large"),
    (bits::LEN_HUGE, "len_huge"),
    (bits::RELATION, "relation"),
    (bits::CARD_1_1, "card_1_1"),
    (bits::CARD_1_N, "card_1_n"),
    (bits::CHILD_MANDATORY, "child_mandatory"),
    (bits::CHILD_OPTIONAL, "child_optional"),
    (bits::DEL_CASCADE, "on_delete_cascade"),
    (bits::DEL_SET_NULL, "on_delete_set_null"),
    (bits::DEL_RESTRICT, "on_delete_restrict"),
    (bits::UPD_CASCADE, "on_update_cascade"),
    (bits::UPD_SET_NULL, "on_update_set_null"),
    (bits::UPD_RESTRICT, "on_update_restrict"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TypeFamily {
    Text,
    Integer,
    Real,
    Numeric,
    Datetime,
    Blob,
}

impl TypeFamily {
    /// Decode priority order.
    pub const ALL: [TypeFamily; 6] = [
        TypeFamily::Text,
        TypeFamily::Integer,
        TypeFamily::Real,
        TypeFamily::Numeric,
        TypeFamily::Datetime,
        TypeFamily::Blob,
    ];

    pub fn bit(self) -> u32 {
        match self {
            TypeFamily::Text => bits::TYPE_TEXT,
            TypeFamily::Integer => bits::TYPE_INTEGER,
            TypeFamily::Real => bits::TYPE_REAL,
            TypeFamily::Numeric => bits::TYPE_NUMERIC,
            TypeFamily::Datetime => bits::TYPE_DATETIME,
            TypeFamily::Blob => bits::TYPE_BLOB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthBucket {
    Small,
    Medium,
    Large,
    Huge,
}

impl LengthBucket {
    pub const ALL: [LengthBucket; 4] = [
        LengthBucket::Small,
        LengthBucket::Medium,
        LengthBucket::Large,
        LengthBucket::Huge,
    ];

    pub fn for_length(len: u64) -> Self {
        match len {
            0..=64 => LengthBucket::Small,
            65..=255 => LengthBucket::Medium,
            256..=4000 => LengthBucket::Large,
            _ => LengthBucket::Huge,
        }
    }

    pub fn bit(self) -> u32 {
        match self {
            LengthBucket::Small => bits::LEN_SMALL,
            LengthBucket::Medium => bits::LEN_MEDIUM,
            LengthBucket::Large => bits::LEN_LARGE,
            LengthBucket::Huge => bits::LEN_HUGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cardinality {
    #[serde(rename = "1:1")]
    OneToOne,
    #[serde(rename = "1:N")]
    OneToMany,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FkAction {
    #[serde(rename = "CASCADE")]
    Cascade,
    #[serde(rename = "SET NULL")]
    SetNull,
    #[serde(rename = "RESTRICT")]
    Restrict,
}

impl FkAction {
    /// Bucket a driver-reported action. `NO ACTION`, `SET DEFAULT`, empty and
    /// anything unrecognized land on `Restrict`.
    pub fn classify(action: &str) -> Self {
        match norm_upper(action).as_str() {
            "CASCADE" => FkAction::Cascade,
            "SET NULL" => FkAction::SetNull,
            _ => FkAction::Restrict,
        }
    }

    fn on_delete_bit(self) -> u32 {
        match self {
            FkAction::Cascade => bits::DEL_CASCADE,
            FkAction::SetNull => bits::DEL_SET_NULL,
            FkAction::Restrict => bits::DEL_RESTRICT,
        }
    }

    fn on_update_bit(self) -> u32 {
        match self {
            FkAction::Cascade => bits::UPD_CASCADE,
            FkAction::SetNull => bits::UPD_SET_NULL,
            FkAction::Restrict => bits::UPD_RESTRICT,
        }
    }
}

/// Structural inputs for one column.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnTraits<'a> {
    pub declared_type: &'a str,
    pub not_null: bool,
    pub has_default: bool,
    pub is_pk: bool,
    pub is_fk: bool,
    pub has_index: bool,
}

/// Structural inputs for one foreign-key constraint.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationTraits<'a> {
    pub is_unique_child: bool,
    pub child_mandatory: bool,
    pub on_delete: &'a str,
    pub on_update: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub type_family: Option<TypeFamily>,
    pub not_null: Option<bool>,
    pub has_default: bool,
    pub is_pk: bool,
    pub is_fk: bool,
    pub has_index: bool,
    pub length_bucket: Option<LengthBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RelationMeta {
    pub cardinality: Option<Cardinality>,
    pub child_required: Option<bool>,
    pub on_delete: Option<FkAction>,
    pub on_update: Option<FkAction>,
}

fn length_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\s*\d+\s*)\)").expect("static regex"))
}

/// Classify a declared SQL type into a family plus, when the declaration
/// carries a single `(N)`, that length.
pub fn classify_declared_type(declared_type: &str) -> (Option<TypeFamily>, Option<u64>) {
    let t = norm_upper(declared_type);
    let length = length_re()
        .captures(&t)
        .and_then(|c| c[1].trim().parse::<u64>().ok());

    let has_any = |needles: &[&str]| needles.iter().any(|n| t.contains(n));
    let family = if t.contains("INT") {
        Some(TypeFamily::Integer)
    } else if has_any(&["CHAR", "CLOB", "TEXT", "VARCHAR"]) {
        Some(TypeFamily::Text)
    } else if has_any(&["REAL", "FLOA", "DOUB"]) {
        Some(TypeFamily::Real)
    } else if has_any(&["DATE", "TIME"]) {
        Some(TypeFamily::Datetime)
    } else if t.contains("BLOB") {
        Some(TypeFamily::Blob)
    } else if has_any(&["NUMERIC", "DECIMAL", "BOOLEAN"]) {
        Some(TypeFamily::Numeric)
    } else {
        None
    };
    (family, length)
}

/// Length bucket for a classified type.
///
/// Unsized TEXT is `Huge`; other unsized families carry no bucket. A sized
/// declaration without one parsable length (`DECIMAL(10,2)`) is `Huge`.
pub fn length_bucket(
    declared_type: &str,
    family: Option<TypeFamily>,
    length: Option<u64>,
) -> Option<LengthBucket> {
    let family = family?;
    if let Some(len) = length {
        return Some(LengthBucket::for_length(len));
    }
    let sized = declared_type.contains('(') && declared_type.contains(')');
    if sized || family == TypeFamily::Text {
        Some(LengthBucket::Huge)
    } else {
        None
    }
}

pub fn bits_for_table() -> BitVector {
    BitVector::from_static(&[bits::IS_TABLE, bits::TABLE_META])
}

pub fn bits_for_column(col: &ColumnTraits<'_>) -> BitVector {
    let mut v = BitVector::from_static(&[bits::IS_COLUMN, bits::COLUMN_META]);
    let (family, length) = classify_declared_type(col.declared_type);
    if let Some(f) = family {
        v.set(f.bit());
    }
    if let Some(b) = length_bucket(col.declared_type, family, length) {
        v.set(b.bit());
    }
    v.set(if col.not_null {
        bits::NOT_NULL
    } else {
        bits::NULL_ALLOWED
    });
    for (flag, bit) in [
        (col.has_default, bits::HAS_DEFAULT),
        (col.is_pk, bits::PART_OF_PK),
        (col.is_fk, bits::PART_OF_FK),
        (col.has_index, bits::HAS_INDEX),
    ] {
        if flag {
            v.set(bit);
        }
    }
    v
}

pub fn bits_for_relation(rel: &RelationTraits<'_>) -> BitVector {
    let mut v = BitVector::from_static(&[bits::IS_FK_REL, bits::REL_META, bits::RELATION]);
    v.set(if rel.is_unique_child {
        bits::CARD_1_1
    } else {
        bits::CARD_1_N
    });
    v.set(if rel.child_mandatory {
        bits::CHILD_MANDATORY
    } else {
        bits::CHILD_OPTIONAL
    });
    v.set(FkAction::classify(rel.on_delete).on_delete_bit());
    v.set(FkAction::classify(rel.on_update).on_update_bit());
    v
}

fn first_of<T: Copy>(v: &BitVector, candidates: &[(u32, T)]) -> Option<T> {
    candidates
        .iter()
        .find(|(bit, _)| v.contains(*bit))
        .map(|(_, t)| *t)
}

fn tri(v: &BitVector, yes: u32, no: u32) -> Option<bool> {
    if v.contains(yes) {
        Some(true)
    } else if v.contains(no) {
        Some(false)
    } else {
        None
    }
}

/// Read column facts back. Total: foreign or partial vectors yield unset
/// fields, never an error.
pub fn decode_column_meta(v: &BitVector) -> ColumnMeta {
    let families = TypeFamily::ALL.map(|f| (f.bit(), f));
    let lengths = LengthBucket::ALL.map(|b| (b.bit(), b));
    ColumnMeta {
        type_family: first_of(v, &families),
        not_null: tri(v, bits::NOT_NULL, bits::NULL_ALLOWED),
        has_default: v.contains(bits::HAS_DEFAULT),
        is_pk: v.contains(bits::PART_OF_PK),
        is_fk: v.contains(bits::PART_OF_FK),
        has_index: v.contains(bits::HAS_INDEX),
        length_bucket: first_of(v, &lengths),
    }
}

pub fn decode_relation_meta(v: &BitVector) -> RelationMeta {
    use FkAction::*;
    RelationMeta {
        cardinality: first_of(
            v,
            &[
                (bits::CARD_1_1, Cardinality::OneToOne),
                (bits::CARD_1_N, Cardinality::OneToMany),
            ],
        ),
        child_required: tri(v, bits::CHILD_MANDATORY, bits::CHILD_OPTIONAL),
        on_delete: first_of(
            v,
            &[
                (bits::DEL_CASCADE, Cascade),
                (bits::DEL_SET_NULL, SetNull),
                (bits::DEL_RESTRICT, Restrict),
            ],
        ),
        on_update: first_of(
            v,
            &[
                (bits::UPD_CASCADE, Cascade),
                (bits::UPD_SET_NULL, SetNull),
                (bits::UPD_RESTRICT, Restrict),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn col(declared_type: &str) -> ColumnTraits<'_> {
        ColumnTraits {
            declared_type,
            ..Default::default()
        }
    }

    #[test]
    fn classification_priority() {
        let cases = [
            ("INTEGER", Some(TypeFamily::Integer)),
            ("nvarchar(40)", Some(TypeFamily::Text)),
            // "INT" wins over "POINT"-style substrings regardless of family words
            ("BIGINT", Some(TypeFamily::Integer)),
            ("DOUBLE PRECISION", Some(TypeFamily::Real)),
            ("datetime", Some(TypeFamily::Datetime)),
            ("TIMESTAMP", Some(TypeFamily::Datetime)),
            ("blob", Some(TypeFamily::Blob)),
            ("DECIMAL(10,2)", Some(TypeFamily::Numeric)),
            ("boolean", Some(TypeFamily::Numeric)),
            ("money", None),
            ("", None),
        ];
        for (t, want) in cases {
            assert_eq!(classify_declared_type(t).0, want, "{t}");
        }
    }

    #[test]
    fn length_buckets() {
        let bucket = |t: &str| decode_column_meta(&bits_for_column(&col(t))).length_bucket;
        assert_eq!(bucket("VARCHAR(64)"), Some(LengthBucket::Small));
        assert_eq!(bucket("VARCHAR(65)"), Some(LengthBucket::Medium));
        assert_eq!(bucket("nvarchar( 255 )"), Some(LengthBucket::Medium));
        assert_eq!(bucket("VARCHAR(4000)"), Some(LengthBucket::Large));
        assert_eq!(bucket("VARCHAR(4001)"), Some(LengthBucket::Huge));
        assert_eq!(bucket("TEXT"), Some(LengthBucket::Huge));
        assert_eq!(bucket("INTEGER"), None);
        assert_eq!(bucket("DECIMAL(10,2)"), Some(LengthBucket::Huge));
        assert_eq!(bucket("money(10)"), None);
    }

    #[test]
    fn column_bits_round_trip() {
        let v = bits_for_column(&ColumnTraits {
            declared_type: "nvarchar(5)",
            not_null: true,
            has_default: false,
            is_pk: true,
            is_fk: false,
            has_index: true,
        });
        assert!(v.contains(bits::IS_COLUMN) && v.contains(bits::COLUMN_META));
        assert_eq!(
            decode_column_meta(&v),
            ColumnMeta {
                type_family: Some(TypeFamily::Text),
                not_null: Some(true),
                has_default: false,
                is_pk: true,
                is_fk: false,
                has_index: true,
                length_bucket: Some(LengthBucket::Small),
            }
        );

        let nullable = bits_for_column(&col("INTEGER"));
        assert!(nullable.contains(bits::NULL_ALLOWED));
        assert!(!nullable.contains(bits::NOT_NULL));
    }

    #[test]
    fn relation_actions_default_to_restrict() {
        let v = bits_for_relation(&RelationTraits {
            is_unique_child: false,
            child_mandatory: true,
            on_delete: " cascade ",
            on_update: "NO ACTION",
        });
        let meta = decode_relation_meta(&v);
        assert_eq!(meta.cardinality, Some(Cardinality::OneToMany));
        assert_eq!(meta.child_required, Some(true));
        assert_eq!(meta.on_delete, Some(FkAction::Cascade));
        assert_eq!(meta.on_update, Some(FkAction::Restrict));

        for action in ["", "SET DEFAULT", "whatever", "restrict"] {
            assert_eq!(FkAction::classify(action), FkAction::Restrict, "{action}");
        }
        assert_eq!(FkAction::classify("set  null"), FkAction::SetNull);
    }

    #[test]
    fn decoders_are_total() {
        assert_eq!(decode_column_meta(&BitVector::new()), ColumnMeta::default());
        assert_eq!(decode_relation_meta(&BitVector::new()), RelationMeta::default());

        // A table vector decoded as a column: nothing but defaults.
        assert_eq!(decode_column_meta(&bits_for_table()), ColumnMeta::default());

        // Conflicting bits resolve by priority instead of failing.
        let mut v = BitVector::new();
        v.set(bits::TYPE_BLOB);
        v.set(bits::TYPE_TEXT);
        v.set(bits::CARD_1_N);
        v.set(bits::CARD_1_1);
        assert_eq!(decode_column_meta(&v).type_family, Some(TypeFamily::Text));
        assert_eq!(decode_relation_meta(&v).cardinality, Some(Cardinality::OneToOne));
    }

    #[test]
    fn serde_labels() {
        let meta = decode_relation_meta(&bits_for_relation(&RelationTraits {
            is_unique_child: true,
            child_mandatory: false,
            on_delete: "SET NULL",
            on_update: "",
        }));
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["cardinality"], "1:1");
        assert_eq!(json["on_delete"], "SET NULL");
        assert_eq!(json["on_update"], "RESTRICT");
        assert_eq!(json["child_required"], false);
    }
}
