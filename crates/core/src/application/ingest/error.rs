// Ingest Error Taxonomy
// Every per-deposit failure ends the task in one of these terminal outcomes

use crate::domain::{DepositKind, DepositState};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// Structurally malformed package; never retried
    #[error("Invalid deposit: {0}")]
    InvalidDeposit(String),

    /// Failed domain validation
    #[error("Rejected: {message}")]
    Rejected {
        message: String,
        /// The update names a predecessor that does not exist remotely
        unresolved_predecessor: bool,
    },

    /// Depositor lacks the role required for the operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// I/O failure talking to the repository or the validator
    #[error("Remote unavailable: {message}")]
    RemoteUnavailable {
        message: String,
        /// A mutating call was already issued when the failure occurred
        after_mutation: bool,
    },

    /// Backend never released its lock within the polling budget
    #[error("Dataset {dataset} still locked after {attempts} polls")]
    UnlockTimeout { dataset: String, attempts: u32 },

    /// Fail-fast short-circuit on a blocked target
    #[error("Target {0} is blocked by an earlier deposit; unblock it to continue")]
    TargetBlocked(String),

    /// A new deposit submits a persistent identifier that already exists
    #[error("Persistent identifier {0} is already assigned to an existing dataset")]
    IdentifierCollision(String),

    /// Local audit store or deposit store failure
    #[error("Storage error: {0}")]
    Storage(String),
}

impl IngestError {
    pub fn rejected(message: impl Into<String>) -> Self {
        IngestError::Rejected {
            message: message.into(),
            unresolved_predecessor: false,
        }
    }

    pub fn remote(message: impl std::fmt::Display, after_mutation: bool) -> Self {
        IngestError::RemoteUnavailable {
            message: message.to_string(),
            after_mutation,
        }
    }

    /// Terminal state written into the deposit's properties
    pub fn state(&self) -> DepositState {
        match self {
            IngestError::Rejected { .. } => DepositState::Rejected,
            _ => DepositState::Failed,
        }
    }

    /// Whether the outcome must bar later deposits for the same target.
    ///
    /// Updates block on rejection when the predecessor exists, and on remote
    /// failures that may have left the dataset half-modified. Identifier
    /// collisions always block. Authorization failures and blocked-target
    /// short-circuits never do.
    pub fn blocks_target(&self, kind: &DepositKind) -> bool {
        match self {
            IngestError::Rejected {
                unresolved_predecessor,
                ..
            } => kind.is_update() && !unresolved_predecessor,
            IngestError::RemoteUnavailable { after_mutation, .. } => {
                kind.is_update() && *after_mutation
            }
            IngestError::UnlockTimeout { .. } => kind.is_update(),
            IngestError::IdentifierCollision(_) => true,
            IngestError::InvalidDeposit(_)
            | IngestError::Unauthorized(_)
            | IngestError::TargetBlocked(_)
            | IngestError::Storage(_) => false,
        }
    }
}
