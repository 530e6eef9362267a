// Blocked Target Domain Model

use super::deposit::DepositState;
use serde::{Deserialize, Serialize};

/// A target barred from further processing until an operator unblocks it.
///
/// Records are never deleted: unblocking sets `unblocked_at`, and a target
/// is blocked iff at least one record without `unblocked_at` exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedTarget {
    pub deposit_id: String,
    pub target: String,
    /// Terminal state of the deposit that caused the block
    pub state: DepositState,
    pub message: Option<String>,
    /// epoch ms
    pub created_at: i64,
    pub unblocked_at: Option<i64>,
}

impl BlockedTarget {
    pub fn new(
        deposit_id: impl Into<String>,
        target: impl Into<String>,
        state: DepositState,
        message: Option<String>,
        created_at: i64,
    ) -> Self {
        Self {
            deposit_id: deposit_id.into(),
            target: target.into(),
            state,
            message,
            created_at,
            unblocked_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.unblocked_at.is_none()
    }
}
