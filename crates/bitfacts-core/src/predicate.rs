//! Compile column/operator/value conditions into bitmask tests over the row
//! profile, plus the equivalent relational `WHERE` clause.
//!
//! Buckets are lossy, so an inequality is only accepted when every bucket is
//! either entirely inside or entirely outside the predicate. A threshold
//! inside a bucket's interior is refused with
//! [`BitsError::PredicateNotBucketable`] rather than approximated.
//!
//! Conditions compose with AND only.

use std::fmt;
use std::str::FromStr;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::bitvec::BitVector;
use crate::decimal::Decimal;
use crate::error::{preview, BitsError, Result};
use crate::normalize::{norm, norm_upper, parse_decimal, parse_int};
use crate::row_profile::{self, bits, RowTable, CITY_BITS, COUNTRY_BITS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompareOp {
    type Err = BitsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "=" | "==" => Ok(CompareOp::Eq),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            other => Err(BitsError::InvalidValue {
                column: "op".to_string(),
                value: preview(other),
                expected: "one of =, <, <=, >, >=",
            }),
        }
    }
}

/// One `column op value` condition as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub op: CompareOp,
    pub value: String,
}

impl Condition {
    pub fn new(column: impl Into<String>, op: CompareOp, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionKind {
    /// `(value & mask) == mask`
    All,
    /// `(value & mask) != 0`
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitCondition {
    pub kind: ConditionKind,
    pub mask: BitVector,
    pub bits: Vec<u32>,
    pub label: String,
}

impl BitCondition {
    fn over(bits: Vec<u32>, label: String) -> Self {
        let kind = if bits.len() == 1 {
            ConditionKind::All
        } else {
            ConditionKind::Any
        };
        Self {
            kind,
            mask: BitVector::from_static(&bits),
            bits,
            label,
        }
    }

    pub fn matches(&self, value: &BitVector) -> bool {
        match self.kind {
            ConditionKind::All => value.contains_all(&self.mask),
            ConditionKind::Any => value.intersects(&self.mask),
        }
    }
}

/// Result of [`compile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompiledPredicate {
    pub table: RowTable,
    pub conditions: Vec<BitCondition>,
    /// Every bit any condition mentions, ascending.
    pub referenced_bits: Vec<u32>,
}

impl CompiledPredicate {
    /// AND over all conditions. An empty predicate matches everything.
    pub fn matches(&self, value: &BitVector) -> bool {
        self.conditions.iter().all(|c| c.matches(value))
    }
}

// ---------------------------------------------------------------------------
// Bucket selection
// ---------------------------------------------------------------------------

/// Half-open interval `[lo, hi)`; `None` is unbounded on that side.
struct Bucket<T> {
    bit: u32,
    lo: Option<T>,
    hi: Option<T>,
}

const fn bucket<T>(bit: u32, lo: Option<T>, hi: Option<T>) -> Bucket<T> {
    Bucket { bit, lo, hi }
}

enum Placement {
    Inside,
    Outside,
    Straddles,
}

impl<T: Ord + Copy> Bucket<T> {
    fn contains(&self, t: T) -> bool {
        self.lo.map_or(true, |lo| lo <= t) && self.hi.map_or(true, |hi| t < hi)
    }

    /// Where this bucket sits relative to `value op t` over a continuous
    /// domain. Discrete domains rewrite `>` and `<=` before calling.
    fn place(&self, op: CompareOp, t: T) -> Placement {
        let lo_ge = self.lo.is_some_and(|lo| lo >= t);
        let lo_gt = self.lo.is_some_and(|lo| lo > t);
        let hi_le = self.hi.is_some_and(|hi| hi <= t);
        let (inside, outside) = match op {
            CompareOp::Ge => (lo_ge, hi_le),
            CompareOp::Gt => (lo_gt, hi_le),
            CompareOp::Lt => (hi_le, lo_ge),
            CompareOp::Le => (hi_le, lo_gt),
            CompareOp::Eq => unreachable!("equality is a lookup, not a placement"),
        };
        match (inside, outside) {
            (true, _) => Placement::Inside,
            (false, true) => Placement::Outside,
            (false, false) => Placement::Straddles,
        }
    }
}

const PRICE_BUCKETS: [Bucket<Decimal>; 4] = [
    bucket(bits::PROD_PRICE_LT_10, None, Some(Decimal::new(10, 0))),
    bucket(
        bits::PROD_PRICE_10_20,
        Some(Decimal::new(10, 0)),
        Some(Decimal::new(20, 0)),
    ),
    bucket(
        bits::PROD_PRICE_20_50,
        Some(Decimal::new(20, 0)),
        Some(Decimal::new(50, 0)),
    ),
    bucket(bits::PROD_PRICE_GE_50, Some(Decimal::new(50, 0)), None),
];

const QUANTITY_BUCKETS: [Bucket<i64>; 4] = [
    bucket(bits::OD_QTY_LT_5, None, Some(5)),
    bucket(bits::OD_QTY_5_10, Some(5), Some(11)),
    bucket(bits::OD_QTY_11_20, Some(11), Some(21)),
    bucket(bits::OD_QTY_GT_20, Some(21), None),
];

struct Dimension<'a> {
    table: RowTable,
    column: &'a str,
    op: CompareOp,
    raw: &'a str,
}

impl Dimension<'_> {
    fn not_bucketable(&self, reason: impl Into<String>) -> BitsError {
        BitsError::PredicateNotBucketable {
            column: self.column.to_string(),
            op: self.op.as_str().to_string(),
            value: preview(self.raw),
            reason: reason.into(),
        }
    }

    fn unsupported(&self) -> BitsError {
        BitsError::UnsupportedColumnOrOperator {
            table: self.table.as_str().to_string(),
            column: self.column.to_string(),
            op: self.op.as_str().to_string(),
        }
    }

    fn invalid(&self, expected: &'static str) -> BitsError {
        BitsError::InvalidValue {
            column: self.column.to_string(),
            value: preview(self.raw),
            expected,
        }
    }

    fn label(&self, shown: impl fmt::Display) -> String {
        format!("{}{}{}", self.column, self.op, shown)
    }

    /// Buckets wholly inside `value op t`; refuses straddled buckets.
    fn select<T: Ord + Copy>(&self, buckets: &[Bucket<T>], op: CompareOp, t: T) -> Result<Vec<u32>> {
        if op == CompareOp::Eq {
            return buckets
                .iter()
                .find(|b| b.contains(t))
                .map(|b| vec![b.bit])
                .ok_or_else(|| self.not_bucketable("no bucket contains the value"));
        }
        let mut selected = Vec::new();
        for b in buckets {
            match b.place(op, t) {
                Placement::Inside => selected.push(b.bit),
                Placement::Outside => {}
                Placement::Straddles => {
                    let name = row_profile::bit_name(b.bit).unwrap_or_default();
                    return Err(self.not_bucketable(format!(
                        "threshold falls inside bucket {name}"
                    )));
                }
            }
        }
        if selected.is_empty() {
            return Err(self.not_bucketable("no bucket lies entirely within the predicate"));
        }
        Ok(selected)
    }
}

// ---------------------------------------------------------------------------
// Per-column compilation
// ---------------------------------------------------------------------------

fn compile_country(d: &Dimension<'_>) -> Result<BitCondition> {
    compile_enumerated(d, COUNTRY_BITS, "a country name")
}

fn compile_city(d: &Dimension<'_>) -> Result<BitCondition> {
    compile_enumerated(d, CITY_BITS, "a city name")
}

fn compile_enumerated(
    d: &Dimension<'_>,
    table: &[(&str, u32)],
    expected: &'static str,
) -> Result<BitCondition> {
    if d.op != CompareOp::Eq {
        return Err(d.unsupported());
    }
    let key = norm_upper(d.raw);
    if key.is_empty() {
        return Err(d.invalid(expected));
    }
    let bit = row_profile::lookup(table, &key).ok_or_else(|| {
        let known: Vec<&str> = table.iter().map(|(k, _)| *k).collect();
        d.not_bucketable(format!("only {} have a bucket", known.join(", ")))
    })?;
    Ok(BitCondition::over(vec![bit], d.label(&key)))
}

fn compile_category(d: &Dimension<'_>) -> Result<BitCondition> {
    if d.op != CompareOp::Eq {
        return Err(d.unsupported());
    }
    let id = parse_int(d.raw).ok_or_else(|| d.invalid("an integer"))?;
    let bit = row_profile::category_bit(id)
        .ok_or_else(|| d.not_bucketable("category ids outside 1..=32 are not encoded"))?;
    Ok(BitCondition::over(vec![bit], d.label(id)))
}

fn compile_price(d: &Dimension<'_>) -> Result<BitCondition> {
    let price = parse_decimal(d.raw).ok_or_else(|| d.invalid("a decimal number"))?;
    let selected = d.select(&PRICE_BUCKETS, d.op, price)?;
    Ok(BitCondition::over(selected, d.label(price)))
}

fn compile_quantity(d: &Dimension<'_>) -> Result<BitCondition> {
    let qty = parse_int(d.raw).ok_or_else(|| d.invalid("an integer"))?;
    // Integers: `> t` is `>= t+1`, `<= t` is `< t+1`.
    let (op, t) = match d.op {
        CompareOp::Gt => (CompareOp::Ge, qty.checked_add(1)),
        CompareOp::Le => (CompareOp::Lt, qty.checked_add(1)),
        op => (op, Some(qty)),
    };
    let t = t.ok_or_else(|| d.not_bucketable("threshold out of range"))?;
    let selected = d.select(&QUANTITY_BUCKETS, op, t)?;
    Ok(BitCondition::over(selected, d.label(qty)))
}

fn compile_discount(d: &Dimension<'_>) -> Result<BitCondition> {
    if !matches!(d.op, CompareOp::Gt | CompareOp::Ge) {
        return Err(d.unsupported());
    }
    let disc = parse_decimal(d.raw).ok_or_else(|| d.invalid("a decimal number"))?;
    if d.op != CompareOp::Gt || !disc.is_zero() {
        return Err(d.not_bucketable("only Discount > 0 has a bucket"));
    }
    Ok(BitCondition::over(vec![bits::OD_DISCOUNT_GT_0], d.label(0)))
}

fn compile_order_year(d: &Dimension<'_>) -> Result<BitCondition> {
    if d.op != CompareOp::Eq {
        return Err(d.unsupported());
    }
    let year = parse_int(d.raw).ok_or_else(|| d.invalid("an integer year"))?;
    let bit = row_profile::order_year_bit(year);
    if bit == bits::ORD_YEAR_OTHER {
        return Err(d.not_bucketable("only 1996, 1997 and 1998 have their own bucket"));
    }
    Ok(BitCondition::over(vec![bit], d.label(year)))
}

type ColumnCompiler = fn(&Dimension<'_>) -> Result<BitCondition>;

const CUSTOMER_COLUMNS: &[(&str, ColumnCompiler)] =
    &[("Country", compile_country), ("City", compile_city)];
const PRODUCT_COLUMNS: &[(&str, ColumnCompiler)] =
    &[("CategoryID", compile_category), ("UnitPrice", compile_price)];
const CATEGORY_COLUMNS: &[(&str, ColumnCompiler)] = &[("CategoryID", compile_category)];
const ORDER_COLUMNS: &[(&str, ColumnCompiler)] = &[("OrderYear", compile_order_year)];
const ORDER_DETAIL_COLUMNS: &[(&str, ColumnCompiler)] =
    &[("Quantity", compile_quantity), ("Discount", compile_discount)];

/// Columns each table exposes to the compiler.
fn columns_of(table: RowTable) -> &'static [(&'static str, ColumnCompiler)] {
    match table {
        RowTable::Customers => CUSTOMER_COLUMNS,
        RowTable::Products => PRODUCT_COLUMNS,
        RowTable::Categories => CATEGORY_COLUMNS,
        RowTable::Orders => ORDER_COLUMNS,
        RowTable::OrderDetails => ORDER_DETAIL_COLUMNS,
    }
}

/// Canonical spelling of a compilable column (matched case-insensitively).
pub fn canonical_column(table: RowTable, column: &str) -> Option<&'static str> {
    let column = column.trim();
    columns_of(table)
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(column))
        .map(|(name, _)| *name)
}

/// Compile an AND of conditions against `table`.
pub fn compile(table: &str, conditions: &[Condition]) -> Result<CompiledPredicate> {
    let table: RowTable = table.parse()?;
    let mut out = Vec::with_capacity(conditions.len());
    let mut referenced = RoaringBitmap::new();

    for cond in conditions {
        let column = norm(&cond.column);
        let &(name, compiler) = columns_of(table)
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&column))
            .ok_or_else(|| BitsError::UnsupportedColumnOrOperator {
                table: table.as_str().to_string(),
                column: preview(&column),
                op: cond.op.as_str().to_string(),
            })?;
        let dim = Dimension {
            table,
            column: name,
            op: cond.op,
            raw: &cond.value,
        };
        let compiled = compiler(&dim)?;
        referenced.extend(compiled.bits.iter().copied());
        out.push(compiled);
    }

    Ok(CompiledPredicate {
        table,
        conditions: out,
        referenced_bits: referenced.iter().collect(),
    })
}

// ---------------------------------------------------------------------------
// Relational side
// ---------------------------------------------------------------------------

/// Quote an identifier for SQLite.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL expression that yields `column`'s value for `table`.
pub fn sql_expr_for(table: RowTable, column: &str) -> String {
    let column = column.trim();
    if table == RowTable::Orders && column.eq_ignore_ascii_case("OrderYear") {
        return "CAST(strftime('%Y', \"OrderDate\") AS INTEGER)".to_string();
    }
    quote_ident(column)
}

/// `WHERE` body and positional parameters equivalent to `conditions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlFilter {
    pub where_sql: String,
    pub params: Vec<String>,
}

/// Build the relational filter. Columns are validated by [`compile`]; this
/// only renders. Numeric literals are normalized so SQLite compares them with
/// numeric affinity.
pub fn sql_filter(table: RowTable, conditions: &[Condition]) -> SqlFilter {
    let mut clauses = Vec::with_capacity(conditions.len());
    let mut params = Vec::with_capacity(conditions.len());
    for cond in conditions {
        let column = canonical_column(table, &cond.column).unwrap_or(cond.column.trim());
        clauses.push(format!("{} {} ?", sql_expr_for(table, column), cond.op));
        let value = norm(&cond.value);
        let param = match column {
            "CategoryID" | "Quantity" | "OrderYear" => {
                parse_int(&value).map(|v| v.to_string()).unwrap_or(value)
            }
            "UnitPrice" | "Discount" => {
                parse_decimal(&value).map(|v| v.to_string()).unwrap_or(value)
            }
            _ => value,
        };
        params.push(param);
    }
    let where_sql = if clauses.is_empty() {
        "1 = 1".to_string()
    } else {
        clauses.join(" AND ")
    };
    SqlFilter { where_sql, params }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one(table: &str, column: &str, op: CompareOp, value: &str) -> Result<BitCondition> {
        let mut compiled = compile(table, &[Condition::new(column, op, value)])?;
        Ok(compiled.conditions.remove(0))
    }

    #[test]
    fn equality_emits_all_over_one_bit() {
        let c = one("Customers", "Country", CompareOp::Eq, " germany ").unwrap();
        assert_eq!(c.kind, ConditionKind::All);
        assert_eq!(c.bits, vec![bits::CUST_COUNTRY_GERMANY]);
        assert_eq!(c.label, "Country=GERMANY");

        let c = one("Products", "categoryid", CompareOp::Eq, "3").unwrap();
        assert_eq!(c.bits, vec![1026]);
        assert_eq!(c.label, "CategoryID=3");
    }

    #[test]
    fn unlisted_enumerations_are_refused() {
        for (col, val) in [("Country", "Mexico"), ("City", "Cowes")] {
            assert!(matches!(
                one("Customers", col, CompareOp::Eq, val),
                Err(BitsError::PredicateNotBucketable { .. })
            ));
        }
        assert!(matches!(
            one("Products", "CategoryID", CompareOp::Eq, "33"),
            Err(BitsError::PredicateNotBucketable { .. })
        ));
        assert!(matches!(
            one("Orders", "OrderYear", CompareOp::Eq, "2001"),
            Err(BitsError::PredicateNotBucketable { .. })
        ));
    }

    #[test]
    fn price_ge_twenty_is_any_over_upper_buckets() {
        let c = one("Products", "UnitPrice", CompareOp::Ge, "20").unwrap();
        assert_eq!(c.kind, ConditionKind::Any);
        assert_eq!(c.bits, vec![bits::PROD_PRICE_20_50, bits::PROD_PRICE_GE_50]);
        assert_eq!(
            c.mask,
            BitVector::from_bits([bits::PROD_PRICE_20_50, bits::PROD_PRICE_GE_50]).unwrap()
        );
        assert_eq!(c.label, "UnitPrice>=20");
    }

    #[test]
    fn price_threshold_inside_a_bucket_is_refused() {
        let err = one("Products", "UnitPrice", CompareOp::Ge, "15").unwrap_err();
        match err {
            BitsError::PredicateNotBucketable { column, op, value, reason } => {
                assert_eq!((column.as_str(), op.as_str(), value.as_str()), ("UnitPrice", ">=", "15"));
                assert!(reason.contains("price_10_20"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
        // `> 20` would need part of [20,50).
        assert!(one("Products", "UnitPrice", CompareOp::Gt, "20").is_err());
        // `<= 20` likewise.
        assert!(one("Products", "UnitPrice", CompareOp::Le, "20").is_err());
    }

    #[test]
    fn price_boundaries() {
        let c = one("Products", "UnitPrice", CompareOp::Lt, "10").unwrap();
        assert_eq!((c.kind, c.bits), (ConditionKind::All, vec![bits::PROD_PRICE_LT_10]));

        let c = one("Products", "UnitPrice", CompareOp::Lt, "50.00").unwrap();
        assert_eq!(c.bits, vec![bits::PROD_PRICE_LT_10, bits::PROD_PRICE_10_20, bits::PROD_PRICE_20_50]);

        let c = one("Products", "UnitPrice", CompareOp::Ge, "50").unwrap();
        assert_eq!((c.kind, c.bits), (ConditionKind::All, vec![bits::PROD_PRICE_GE_50]));

        let c = one("Products", "UnitPrice", CompareOp::Eq, "18").unwrap();
        assert_eq!(c.bits, vec![bits::PROD_PRICE_10_20]);
    }

    #[test]
    fn quantity_uses_integer_boundaries() {
        fn q(op: CompareOp, v: &str) -> Result<Vec<u32>> {
            one("OrderDetails", "Quantity", op, v).map(|c| c.bits)
        }
        assert_eq!(q(CompareOp::Gt, "20").unwrap(), vec![bits::OD_QTY_GT_20]);
        assert_eq!(q(CompareOp::Ge, "21").unwrap(), vec![bits::OD_QTY_GT_20]);
        assert_eq!(q(CompareOp::Gt, "10").unwrap(), vec![bits::OD_QTY_11_20, bits::OD_QTY_GT_20]);
        assert_eq!(q(CompareOp::Le, "10").unwrap(), vec![bits::OD_QTY_LT_5, bits::OD_QTY_5_10]);
        assert_eq!(q(CompareOp::Lt, "5").unwrap(), vec![bits::OD_QTY_LT_5]);
        assert_eq!(q(CompareOp::Eq, "7").unwrap(), vec![bits::OD_QTY_5_10]);
        assert!(q(CompareOp::Gt, "15").is_err());
        assert!(q(CompareOp::Le, "3").is_err());
        assert!(q(CompareOp::Gt, &i64::MAX.to_string()).is_err());
    }

    #[test]
    fn discount_only_strictly_positive() {
        let c = one("OrderDetails", "Discount", CompareOp::Gt, "0.0").unwrap();
        assert_eq!(c.bits, vec![bits::OD_DISCOUNT_GT_0]);
        assert_eq!(c.label, "Discount>0");
        assert!(matches!(
            one("OrderDetails", "Discount", CompareOp::Gt, "0.1"),
            Err(BitsError::PredicateNotBucketable { .. })
        ));
        assert!(matches!(
            one("OrderDetails", "Discount", CompareOp::Ge, "0"),
            Err(BitsError::PredicateNotBucketable { .. })
        ));
        assert!(matches!(
            one("OrderDetails", "Discount", CompareOp::Eq, "0"),
            Err(BitsError::UnsupportedColumnOrOperator { .. })
        ));
    }

    #[test]
    fn input_errors_name_the_rejected_combination() {
        assert_eq!(
            one("Customers", "Country", CompareOp::Lt, "Germany").unwrap_err(),
            BitsError::UnsupportedColumnOrOperator {
                table: "Customers".into(),
                column: "Country".into(),
                op: "<".into(),
            }
        );
        assert!(matches!(
            one("Customers", "Fax", CompareOp::Eq, "x"),
            Err(BitsError::UnsupportedColumnOrOperator { column, .. }) if column == "Fax"
        ));
        assert!(matches!(
            one("Shippers", "ShipperID", CompareOp::Eq, "1"),
            Err(BitsError::UnsupportedTable { .. })
        ));
        assert!(matches!(
            one("Products", "UnitPrice", CompareOp::Ge, "cheap"),
            Err(BitsError::InvalidValue { .. })
        ));
    }

    #[test]
    fn conditions_compose_with_and() {
        let compiled = compile(
            "Products",
            &[
                Condition::new("CategoryID", CompareOp::Eq, "1"),
                Condition::new("UnitPrice", CompareOp::Ge, "20"),
            ],
        )
        .unwrap();
        assert_eq!(compiled.referenced_bits, vec![1024, bits::PROD_PRICE_20_50, bits::PROD_PRICE_GE_50]);

        let row = |bits: &[u32]| BitVector::from_bits(bits.iter().copied()).unwrap();
        assert!(compiled.matches(&row(&[1024, bits::PROD_PRICE_GE_50])));
        assert!(!compiled.matches(&row(&[1024, bits::PROD_PRICE_10_20])));
        assert!(!compiled.matches(&row(&[1025, bits::PROD_PRICE_20_50])));
    }

    #[test]
    fn sql_rendering() {
        assert_eq!(
            sql_expr_for(RowTable::Orders, "OrderYear"),
            "CAST(strftime('%Y', \"OrderDate\") AS INTEGER)"
        );
        assert_eq!(sql_expr_for(RowTable::Customers, "Country"), "\"Country\"");

        let filter = sql_filter(
            RowTable::Products,
            &[
                Condition::new("unitprice", CompareOp::Ge, " 20.0 "),
                Condition::new("CategoryID", CompareOp::Eq, "1"),
            ],
        );
        assert_eq!(filter.where_sql, "\"UnitPrice\" >= ? AND \"CategoryID\" = ?");
        assert_eq!(filter.params, vec!["20".to_string(), "1".to_string()]);
    }

    #[test]
    fn op_parsing() {
        assert_eq!(">=".parse::<CompareOp>().unwrap(), CompareOp::Ge);
        assert_eq!("==".parse::<CompareOp>().unwrap(), CompareOp::Eq);
        assert!("!=".parse::<CompareOp>().is_err());
    }
}
