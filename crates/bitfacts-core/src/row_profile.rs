//! Row bit-profile `northwind_data_v1`: bucketed attribute values per row.
//!
//! Layout:
//! - 0–63: reserved row/type flags
//! - 256–1023: Customers
//! - 1024–1791: Products / Categories
//! - 1792–2047: Orders / OrderDetails
//! - 2048–4095: reserved
//!
//! Buckets are lossy by construction. The predicate compiler only accepts
//! conditions that land exactly on bucket boundaries.

use std::fmt;
use std::str::FromStr;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::bitvec::BitVector;
use crate::decimal::Decimal;
use crate::error::{BitsError, Result};
use crate::normalize::{norm, norm_upper, parse_date, parse_decimal, parse_int};
use crate::row::RowAccessor;

pub const PROFILE_ID: &str = "northwind_data_v1";

pub mod bits {
    pub const CUST_COUNTRY_USA: u32 = 256;
    pub const CUST_COUNTRY_UK: u32 = 257;
    pub const CUST_COUNTRY_GERMANY: u32 = 258;
    pub const CUST_COUNTRY_FRANCE: u32 = 259;
    pub const CUST_COUNTRY_OTHER: u32 = 260;

    pub const CUST_CITY_LONDON: u32 = 264;
    pub const CUST_CITY_PARIS: u32 = 265;
    pub const CUST_CITY_BERLIN: u32 = 266;
    pub const CUST_CITY_SEATTLE: u32 = 267;
    pub const CUST_CITY_MEXICO_DF: u32 = 268;

    /// Category ids 1..=32 map to 1024..=1055.
    pub const PROD_CATEGORY_BASE: u32 = 1024;
    pub const PROD_CATEGORY_MAX_ID: i64 = 32;
    pub const PROD_PRICE_LT_10: u32 = 1060;
    pub const PROD_PRICE_10_20: u32 = 1061;
    pub const PROD_PRICE_20_50: u32 = 1062;
    pub const PROD_PRICE_GE_50: u32 = 1063;

    pub const ORD_YEAR_1996: u32 = 1792;
    pub const ORD_YEAR_1997: u32 = 1793;
    pub const ORD_YEAR_1998: u32 = 1794;
    pub const ORD_YEAR_OTHER: u32 = 1795;

    pub const OD_QTY_LT_5: u32 = 1856;
    pub const OD_QTY_5_10: u32 = 1857;
    pub const OD_QTY_11_20: u32 = 1858;
    pub const OD_QTY_GT_20: u32 = 1859;
    pub const OD_DISCOUNT_GT_0: u32 = 1864;
}

/// Normalized, uppercased country spelling → bucket.
pub const COUNTRY_BITS: &[(&str, u32)] = &[
    ("USA", bits::CUST_COUNTRY_USA),
    ("U.S.A.", bits::CUST_COUNTRY_USA),
    ("UK", bits::CUST_COUNTRY_UK),
    ("U.K.", bits::CUST_COUNTRY_UK),
    ("UNITED KINGDOM", bits::CUST_COUNTRY_UK),
    ("GERMANY", bits::CUST_COUNTRY_GERMANY),
    ("FRANCE", bits::CUST_COUNTRY_FRANCE),
];

pub const CITY_BITS: &[(&str, u32)] = &[
    ("LONDON", bits::CUST_CITY_LONDON),
    ("PARIS", bits::CUST_CITY_PARIS),
    ("BERLIN", bits::CUST_CITY_BERLIN),
    ("SEATTLE", bits::CUST_CITY_SEATTLE),
    ("MÉXICO D.F.", bits::CUST_CITY_MEXICO_DF),
    ("MEXICO D.F.", bits::CUST_CITY_MEXICO_DF),
];

/// Every named position of this profile except the category range, which
/// [`bit_name`] renders as `category_<id>`.
pub const ASSIGNMENTS: &[(u32, &str)] = &[
    (bits::CUST_COUNTRY_USA, "country_usa"),
    (bits::CUST_COUNTRY_UK, "country_uk"),
    (bits::CUST_COUNTRY_GERMANY, "country_germany"),
    (bits::CUST_COUNTRY_FRANCE, "country_france"),
    (bits::CUST_COUNTRY_OTHER, "country_other"),
    (bits::CUST_CITY_LONDON, "city_london"),
    (bits::CUST_CITY_PARIS, "city_paris"),
    (bits::CUST_CITY_BERLIN, "city_berlin"),
    (bits::CUST_CITY_SEATTLE, "city_seattle"),
    (bits::CUST_CITY_MEXICO_DF, "city_mexico_df"),
    (bits::PROD_PRICE_LT_10, "price_lt_10"),
    (bits::PROD_PRICE_10_20, "price_10_20"),
    (bits::PROD_PRICE_20_50, "price_20_50"),
    (bits::PROD_PRICE_GE_50, "price_ge_50"),
    (bits::ORD_YEAR_1996, "order_year_1996"),
    (bits::ORD_YEAR_1997, "order_year_1997"),
    (bits::ORD_YEAR_1998, "order_year_1998"),
    (bits::ORD_YEAR_OTHER, "order_year_other"),
    (bits::OD_QTY_LT_5, "quantity_lt_5"),
    (bits::OD_QTY_5_10, "quantity_5_10"),
    (bits::OD_QTY_11_20, "quantity_11_20"),
    (bits::OD_QTY_GT_20, "quantity_gt_20"),
    (bits::OD_DISCOUNT_GT_0, "discount_gt_0"),
];

/// Stable label for a row-profile bit, `None` for unassigned positions.
pub fn bit_name(bit: u32) -> Option<String> {
    if let Some(id) = category_of_bit(bit) {
        return Some(format!("category_{id}"));
    }
    ASSIGNMENTS
        .iter()
        .find(|(b, _)| *b == bit)
        .map(|(_, name)| (*name).to_string())
}

/// Tables with a row encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RowTable {
    Customers,
    Orders,
    OrderDetails,
    Products,
    Categories,
}

impl RowTable {
    pub const ALL: [RowTable; 5] = [
        RowTable::Customers,
        RowTable::Orders,
        RowTable::OrderDetails,
        RowTable::Products,
        RowTable::Categories,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RowTable::Customers => "Customers",
            RowTable::Orders => "Orders",
            RowTable::OrderDetails => "OrderDetails",
            RowTable::Products => "Products",
            RowTable::Categories => "Categories",
        }
    }
}

impl fmt::Display for RowTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RowTable {
    type Err = BitsError;

    fn from_str(s: &str) -> Result<Self> {
        let t = s.trim();
        RowTable::ALL
            .into_iter()
            .find(|rt| rt.as_str() == t)
            .ok_or_else(|| BitsError::UnsupportedTable {
                table: crate::error::preview(t),
            })
    }
}

// ---------------------------------------------------------------------------
// Bucket functions (shared with the predicate compiler)
// ---------------------------------------------------------------------------

pub fn country_bit(value: &str) -> Option<u32> {
    let key = norm_upper(value);
    if key.is_empty() {
        return None;
    }
    Some(lookup(COUNTRY_BITS, &key).unwrap_or(bits::CUST_COUNTRY_OTHER))
}

pub fn city_bit(value: &str) -> Option<u32> {
    lookup(CITY_BITS, &norm_upper(value))
}

pub(crate) fn lookup(table: &[(&str, u32)], key: &str) -> Option<u32> {
    table.iter().find(|(k, _)| *k == key).map(|(_, b)| *b)
}

pub fn category_bit(id: i64) -> Option<u32> {
    if (1..=bits::PROD_CATEGORY_MAX_ID).contains(&id) {
        Some(bits::PROD_CATEGORY_BASE + (id - 1) as u32)
    } else {
        None
    }
}

pub fn category_of_bit(bit: u32) -> Option<i64> {
    let last = bits::PROD_CATEGORY_BASE + bits::PROD_CATEGORY_MAX_ID as u32 - 1;
    (bits::PROD_CATEGORY_BASE..=last)
        .contains(&bit)
        .then(|| i64::from(bit - bits::PROD_CATEGORY_BASE) + 1)
}

pub fn price_bit(price: Decimal) -> u32 {
    if price < Decimal::from_int(10) {
        bits::PROD_PRICE_LT_10
    } else if price < Decimal::from_int(20) {
        bits::PROD_PRICE_10_20
    } else if price < Decimal::from_int(50) {
        bits::PROD_PRICE_20_50
    } else {
        bits::PROD_PRICE_GE_50
    }
}

pub fn order_year_bit(year: i64) -> u32 {
    match year {
        1996 => bits::ORD_YEAR_1996,
        1997 => bits::ORD_YEAR_1997,
        1998 => bits::ORD_YEAR_1998,
        _ => bits::ORD_YEAR_OTHER,
    }
}

pub fn quantity_bit(qty: i64) -> u32 {
    match qty {
        i64::MIN..=4 => bits::OD_QTY_LT_5,
        5..=10 => bits::OD_QTY_5_10,
        11..=20 => bits::OD_QTY_11_20,
        _ => bits::OD_QTY_GT_20,
    }
}

// ---------------------------------------------------------------------------
// Row encoders
// ---------------------------------------------------------------------------

fn text<R: RowAccessor + ?Sized>(row: &R, column: &str) -> String {
    row.text(column).map(|v| norm(&v)).unwrap_or_default()
}

pub fn encode_customer<R: RowAccessor + ?Sized>(row: &R) -> BitVector {
    let mut v = BitVector::new();
    if let Some(b) = country_bit(&text(row, "Country")) {
        v.set(b);
    }
    if let Some(b) = city_bit(&text(row, "City")) {
        v.set(b);
    }
    v
}

pub fn encode_product<R: RowAccessor + ?Sized>(row: &R) -> BitVector {
    let mut v = encode_category(row);
    if let Some(price) = parse_decimal(&text(row, "UnitPrice")) {
        v.set(price_bit(price));
    }
    v
}

pub fn encode_category<R: RowAccessor + ?Sized>(row: &R) -> BitVector {
    let mut v = BitVector::new();
    if let Some(b) = parse_int(&text(row, "CategoryID")).and_then(category_bit) {
        v.set(b);
    }
    v
}

pub fn encode_order<R: RowAccessor + ?Sized>(row: &R) -> BitVector {
    let mut v = BitVector::new();
    if let Some(date) = parse_date(&text(row, "OrderDate")) {
        v.set(order_year_bit(i64::from(date.year())));
    }
    v
}

pub fn encode_order_detail<R: RowAccessor + ?Sized>(row: &R) -> BitVector {
    let mut v = BitVector::new();
    if let Some(qty) = parse_int(&text(row, "Quantity")) {
        v.set(quantity_bit(qty));
    }
    if parse_decimal(&text(row, "Discount")).is_some_and(|d| d.is_positive()) {
        v.set(bits::OD_DISCOUNT_GT_0);
    }
    v
}

/// Encode one row of `table`. Unknown tables are an input error; within a
/// supported table every row encodes, missing or unparsable cells simply
/// contribute no bit.
pub fn encode_row<R: RowAccessor + ?Sized>(table: &str, row: &R) -> Result<BitVector> {
    Ok(encode_table_row(table.parse()?, row))
}

pub fn encode_table_row<R: RowAccessor + ?Sized>(table: RowTable, row: &R) -> BitVector {
    match table {
        RowTable::Customers => encode_customer(row),
        RowTable::Products => encode_product(row),
        RowTable::Categories => encode_category(row),
        RowTable::Orders => encode_order(row),
        RowTable::OrderDetails => encode_order_detail(row),
    }
}
