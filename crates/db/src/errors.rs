use rockbound::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("missing {0} entry {1}")]
    MissingEntry(&'static str, String),

    #[error("checkbook already tracked for deposit ({0}, {1})")]
    DuplicateDepositKey(u32, u64),

    #[error("duplicate nullifier {0}")]
    DuplicateNullifier(String),

    #[error("duplicate id {0}")]
    DuplicateId(String),

    #[error("rocksdb: {0}")]
    Rocksdb(#[from] rockbound::rocksdb::Error),

    #[error("transaction: {0}")]
    Transaction(String),

    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for DbError {
    fn from(value: anyhow::Error) -> Self {
        Self::Other(value.to_string())
    }
}

impl From<CodecError> for DbError {
    fn from(value: CodecError) -> Self {
        Self::Other(value.to_string())
    }
}

impl DbError {
    /// Whether this error is a unique-constraint conflict, which handlers
    /// treat as event replay rather than failure.
    pub fn is_constraint(&self) -> bool {
        matches!(
            self,
            DbError::DuplicateDepositKey(..) | DbError::DuplicateNullifier(_) | DbError::DuplicateId(_)
        )
    }
}
