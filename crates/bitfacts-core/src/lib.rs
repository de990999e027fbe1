//! Bitfacts core: relational facts as 4096-bit vectors
//!
//! - **Codec** (`bitvec`): bit sets ↔ 512-byte big-endian blobs ↔ decimal strings
//! - **Schema profile** (`schema_profile`, `northwind_meta_v0`): table / column / FK facts
//! - **Row profile** (`row_profile`, `northwind_data_v1`): bucketed row attributes
//! - **Predicate compiler** (`predicate`): `column op value` → ALL/ANY mask tests
//!
//! Everything here is pure: no I/O, no logging. Storage, ingestion and
//! reconciliation live in the sibling crates.

pub mod bitvec;
pub mod decimal;
pub mod error;
pub mod normalize;
pub mod predicate;
pub mod row;
pub mod row_profile;
pub mod schema_profile;

pub use bitvec::{decode, encode, BitVector, ENCODED_LEN, WIDTH_BITS};
pub use decimal::Decimal;
pub use error::{BitsError, Result};
pub use predicate::{
    compile, sql_expr_for, sql_filter, BitCondition, CompareOp, CompiledPredicate, Condition,
    ConditionKind, SqlFilter,
};
pub use row::RowAccessor;
pub use row_profile::{encode_row, RowTable};
pub use schema_profile::{
    bits_for_column, bits_for_relation, bits_for_table, decode_column_meta, decode_relation_meta,
    ColumnMeta, ColumnTraits, RelationMeta, RelationTraits,
};
