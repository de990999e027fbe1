/// Caller-input errors of the reporter. Source and store failures travel as
/// their own types inside `anyhow::Error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    #[error("limit {limit} out of range (expected 1..=100)")]
    LimitOutOfRange { limit: usize },

    #[error("at least one condition is required")]
    NoConditions,

    #[error("table {table} not found in relational source")]
    MissingTable { table: String },

    #[error("invalid amount in {column} for order {order_id}: `{value}`")]
    InvalidAmount {
        order_id: String,
        column: &'static str,
        value: String,
    },

    #[error("order total overflow for order {order_id}")]
    Overflow { order_id: String },
}
