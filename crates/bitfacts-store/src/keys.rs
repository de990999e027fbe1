//! Key layout.
//!
//! ```text
//! {p}:element:tbl:{table}                         512-byte schema vector
//! {p}:element:col:{table}:{column}                512-byte schema vector
//! {p}:element:rel:{from}:{to}:fk{n}               512-byte schema vector
//! {p}:import:schema_meta:elements                 set: schema keys written
//!
//! {p}:data:{table}:{rowId}                        decimal-string row vector
//! {p}:obj:{table}:{rowId}                         hash: column -> text
//! {p}:import:northwind_compare:table:{table}      set: rowIds
//! {p}:import:northwind_compare:order_details:{id} set: OrderDetails rowIds
//! {p}:import:northwind_compare:data_bits          set: row keys written
//! ```
//!
//! The registries are the only thing reset reads; nothing is ever deleted by
//! key pattern.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Result, StoreError};

pub const ROW_IMPORTER: &str = "northwind_compare";
pub const SCHEMA_IMPORTER: &str = "schema_meta";

fn prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9:_-]*$").expect("static regex"))
}

/// A validated key namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyspace {
    prefix: String,
}

impl Keyspace {
    /// Leading and trailing `:` are stripped before validation.
    pub fn new(prefix: &str) -> Result<Self> {
        let p = prefix.trim().trim_matches(':');
        if !prefix_re().is_match(p) {
            return Err(StoreError::InvalidPrefix {
                prefix: prefix.to_string(),
            });
        }
        Ok(Self {
            prefix: p.to_string(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // ------------------------------------------------------------------
    // Schema facts
    // ------------------------------------------------------------------

    pub fn element_table(&self, table: &str) -> String {
        format!("{}:element:tbl:{table}", self.prefix)
    }

    pub fn element_column(&self, table: &str, column: &str) -> String {
        format!("{}:element:col:{table}:{column}", self.prefix)
    }

    pub fn element_columns_prefix(&self, table: &str) -> String {
        format!("{}:element:col:{table}:", self.prefix)
    }

    pub fn element_relation(&self, from: &str, to: &str, fk_id: i64) -> String {
        format!("{}:element:rel:{from}:{to}:fk{fk_id}", self.prefix)
    }

    pub fn element_relations_prefix(&self) -> String {
        format!("{}:element:rel:", self.prefix)
    }

    pub fn schema_registry(&self) -> String {
        format!("{}:import:{SCHEMA_IMPORTER}:elements", self.prefix)
    }

    // ------------------------------------------------------------------
    // Row facts
    // ------------------------------------------------------------------

    pub fn data(&self, table: &str, row_id: &str) -> Result<String> {
        let (table, row_id) = (table.trim(), row_id.trim());
        if table.is_empty() {
            return Err(StoreError::InvalidKeyPart {
                what: "table",
                value: table.to_string(),
            });
        }
        if row_id.is_empty() {
            return Err(StoreError::InvalidKeyPart {
                what: "row id",
                value: row_id.to_string(),
            });
        }
        Ok(format!("{}:data:{table}:{row_id}", self.prefix))
    }

    pub fn data_prefix(&self, table: &str) -> String {
        format!("{}:data:{table}:", self.prefix)
    }

    pub fn obj(&self, table: &str, row_id: &str) -> String {
        format!("{}:obj:{table}:{row_id}", self.prefix)
    }

    pub fn data_registry(&self) -> String {
        format!("{}:import:{ROW_IMPORTER}:data_bits", self.prefix)
    }

    pub fn table_rows(&self, table: &str) -> String {
        format!("{}:import:{ROW_IMPORTER}:table:{table}", self.prefix)
    }

    pub fn order_details_of(&self, order_id: &str) -> String {
        format!("{}:import:{ROW_IMPORTER}:order_details:{order_id}", self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_trimmed_and_validated() {
        assert_eq!(Keyspace::new(":er:").unwrap().prefix(), "er");
        assert_eq!(Keyspace::new("demo:nw_1").unwrap().prefix(), "demo:nw_1");
        for bad in ["", ":::", "-er", "er space", "er*"] {
            assert!(Keyspace::new(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn layout() {
        let k = Keyspace::new("er").unwrap();
        assert_eq!(k.element_table("Orders"), "er:element:tbl:Orders");
        assert_eq!(k.element_column("Orders", "OrderID"), "er:element:col:Orders:OrderID");
        assert_eq!(
            k.element_relation("Order Details", "Orders", 1),
            "er:element:rel:Order Details:Orders:fk1"
        );
        assert_eq!(k.data("Customers", "ALFKI").unwrap(), "er:data:Customers:ALFKI");
        assert_eq!(k.obj("OrderDetails", "10248:11"), "er:obj:OrderDetails:10248:11");
        assert_eq!(k.data_registry(), "er:import:northwind_compare:data_bits");
        assert_eq!(k.table_rows("Orders"), "er:import:northwind_compare:table:Orders");
        assert_eq!(
            k.order_details_of("10248"),
            "er:import:northwind_compare:order_details:10248"
        );
        assert_eq!(k.schema_registry(), "er:import:schema_meta:elements");
        assert!(k.data("Customers", " ").is_err());
    }
}
