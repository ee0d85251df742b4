use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PrimitivesError {
    #[error("invalid hex buffer {0}")]
    InvalidHexBuf(String),

    #[error("invalid decimal amount {0}")]
    InvalidAmount(String),

    #[error("amount overflow")]
    AmountOverflow,

    #[error("unknown chain alias {0}")]
    UnknownChainAlias(String),
}
