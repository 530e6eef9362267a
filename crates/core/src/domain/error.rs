// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Invalid deposit: {0}")]
    InvalidDeposit(String),

    #[error("Invalid deposit id '{value}': {source}")]
    InvalidDepositId {
        value: String,
        #[source]
        source: uuid::Error,
    },

    #[error("Bag-info element '{key}' should contain exactly 1 value; {found} found")]
    Cardinality { key: String, found: usize },

    #[error("Invalid timestamp '{value}' (an explicit UTC offset is required): {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("No target found for deposit {0}: neither an update token nor a persistent identifier is present")]
    MissingTarget(String),

    #[error("Target must not be blank")]
    BlankTarget,

    #[error("Unknown deposit state label: {0}")]
    UnknownStateLabel(String),

    #[error("Invalid deposit state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
