use thiserror::Error;

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("expected event {expected}, envelope carries {got}")]
    WrongEvent {
        expected: &'static str,
        got: String,
    },

    #[error("expected contract {expected}, envelope carries {got}")]
    WrongContract {
        expected: &'static str,
        got: String,
    },

    #[error("invalid subject {0}")]
    InvalidSubject(String),

    #[error("envelope missing event_data")]
    MissingEventData,
}
