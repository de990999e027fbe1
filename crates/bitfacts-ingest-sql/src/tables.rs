//! Logical Northwind table names and the physical spellings they may have.

use anyhow::Result;
use bitfacts_core::RowTable;

use crate::source::SqliteSource;

/// Logical name -> physical candidates, tried in order.
pub const LOGICAL_TABLES: &[(&str, &[&str])] = &[
    ("Customers", &["Customers"]),
    ("Orders", &["Orders"]),
    ("OrderDetails", &["Order Details", "OrderDetails"]),
    ("Products", &["Products"]),
    ("Employees", &["Employees"]),
    ("Suppliers", &["Suppliers"]),
    ("Categories", &["Categories"]),
    ("Shippers", &["Shippers"]),
    ("Regions", &["Region", "Regions"]),
    ("Territories", &["Territories"]),
    ("EmployeeTerritories", &["EmployeeTerritories"]),
    ("CustomerDemographics", &["CustomerDemographics"]),
    ("CustomerCustomerDemo", &["CustomerCustomerDemo", "CustomerCustomerDemo "]),
];

/// Physical candidates for a logical table; unknown names stand for
/// themselves.
pub fn candidates(logical: &str) -> Vec<&str> {
    LOGICAL_TABLES
        .iter()
        .find(|(name, _)| *name == logical)
        .map(|(_, c)| c.to_vec())
        .unwrap_or_else(|| vec![logical])
}

pub fn resolve_table(source: &SqliteSource, logical: &str) -> Result<Option<String>> {
    source.find_table(&candidates(logical))
}

pub fn resolve_row_table(source: &SqliteSource, table: RowTable) -> Result<Option<String>> {
    resolve_table(source, table.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_cover_known_spellings() {
        assert_eq!(candidates("OrderDetails"), vec!["Order Details", "OrderDetails"]);
        assert_eq!(candidates("Regions"), vec!["Region", "Regions"]);
        assert_eq!(candidates("Widgets"), vec!["Widgets"]);
        assert_eq!(LOGICAL_TABLES.len(), 13);
        for rt in RowTable::ALL {
            assert!(LOGICAL_TABLES.iter().any(|(n, _)| *n == rt.as_str()));
        }
    }

    #[test]
    fn resolution_is_case_insensitive() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"CREATE TABLE "order details" (OrderID INTEGER, ProductID INTEGER);
               CREATE TABLE REGION (RegionID INTEGER PRIMARY KEY);"#,
        )
        .unwrap();
        let src = SqliteSource::from_connection(conn);
        assert_eq!(
            resolve_table(&src, "OrderDetails").unwrap().as_deref(),
            Some("order details")
        );
        assert_eq!(resolve_table(&src, "Regions").unwrap().as_deref(), Some("REGION"));
        assert_eq!(resolve_table(&src, "Customers").unwrap(), None);
    }
}
