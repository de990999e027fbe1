use bitfacts_core::BitsError;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid key prefix `{prefix}` (expected [A-Za-z0-9][A-Za-z0-9:_-]*)")]
    InvalidPrefix { prefix: String },

    #[error("invalid key component for {what}: `{value}`")]
    InvalidKeyPart { what: &'static str, value: String },

    #[error(transparent)]
    Bits(#[from] BitsError),
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
