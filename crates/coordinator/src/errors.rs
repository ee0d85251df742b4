use thiserror::Error;
use zkpay_chain_events::EventDecodeError;
use zkpay_db::DbError;

/// What the dispatcher should do with the message after a handler error.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// Consume the message; retrying cannot help.
    Ack,
    /// Return the message to the bus for redelivery.
    Nack,
}

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("decode: {0}")]
    Decode(#[from] EventDecodeError),

    #[error("missing {what} for {key}")]
    LookupMiss { what: &'static str, key: String },

    #[error("unresolved token key hash {0}")]
    UnknownTokenKey(String),

    #[error("amount mismatch: event carries {event}, tracked {tracked}")]
    VerifyMismatch { event: String, tracked: String },

    #[error("db: {0}")]
    Db(#[from] DbError),
}

impl HandlerError {
    pub fn lookup_miss(what: &'static str, key: impl Into<String>) -> Self {
        HandlerError::LookupMiss {
            what,
            key: key.into(),
        }
    }

    /// Classification tag used for the failure metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::Decode(_) => "parse_error",
            HandlerError::LookupMiss { .. } => "lookup_miss",
            HandlerError::UnknownTokenKey(_) => "lookup_miss",
            HandlerError::VerifyMismatch { .. } => "verify_mismatch",
            HandlerError::Db(e) if e.is_constraint() => "db_constraint",
            HandlerError::Db(_) => "db_transient",
        }
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            // The bus retries malformed messages; a poisoned payload ages
            // out at the redelivery cap.
            HandlerError::Decode(_) => Disposition::Nack,
            // The aggregate may simply not exist yet (events reorder);
            // redelivery resolves it.
            HandlerError::LookupMiss { .. } => Disposition::Nack,
            HandlerError::UnknownTokenKey(_) => Disposition::Nack,
            // A mismatch is a logic fault: alarm, never retry.
            HandlerError::VerifyMismatch { .. } => Disposition::Ack,
            HandlerError::Db(e) if e.is_constraint() => Disposition::Ack,
            HandlerError::Db(_) => Disposition::Nack,
        }
    }
}

pub type HandlerResult<T> = Result<T, HandlerError>;
