//! Error type shared by the codec, the bit-profiles and the predicate compiler.

/// Errors raised by `bitfacts-core`.
///
/// Caller-input variants carry the rejected value(s) so the message is
/// actionable without re-running the request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BitsError {
    #[error("bit {bit} out of range (expected 0..=4095)")]
    InvalidBit { bit: u32 },

    #[error("flags buffer must be 512 bytes, got {len}")]
    InvalidFlags { len: usize },

    #[error("invalid decimal bit-vector `{value}`")]
    InvalidDecimal { value: String },

    #[error("unsupported table `{table}`")]
    UnsupportedTable { table: String },

    #[error("predicate not supported by bitset encoding: table={table} column={column} op={op}")]
    UnsupportedColumnOrOperator {
        table: String,
        column: String,
        op: String,
    },

    #[error("predicate `{column} {op} {value}` cannot be expressed with buckets: {reason}")]
    PredicateNotBucketable {
        column: String,
        op: String,
        value: String,
        reason: String,
    },

    #[error("invalid value for {column}: `{value}` (expected {expected})")]
    InvalidValue {
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("decimal arithmetic overflow")]
    DecimalOverflow,
}

pub type Result<T, E = BitsError> = std::result::Result<T, E>;

/// Shorten user-supplied text before it lands in an error message.
pub(crate) fn preview(value: &str) -> String {
    const MAX: usize = 48;
    if value.chars().count() <= MAX {
        return value.to_string();
    }
    let mut out: String = value.chars().take(MAX).collect();
    out.push('…');
    out
}
