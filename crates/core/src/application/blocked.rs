// Blocked Target Service
// Gate for targets with an unresolved failed or rejected deposit

use crate::domain::{BlockedTarget, DepositState};
use crate::error::{AppError, Result};
use crate::port::{BlockedTargetRepository, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

pub struct BlockedTargetService {
    repo: Arc<dyn BlockedTargetRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl BlockedTargetService {
    pub fn new(
        repo: Arc<dyn BlockedTargetRepository>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            repo,
            time_provider,
        }
    }

    pub async fn is_blocked(&self, target: &str) -> Result<bool> {
        self.repo.is_blocked(target).await
    }

    /// Record a block caused by `deposit_id` ending in `state`
    pub async fn block(
        &self,
        deposit_id: &str,
        target: &str,
        state: DepositState,
        message: Option<String>,
    ) -> Result<()> {
        if target.trim().is_empty() {
            return Err(AppError::Validation("Cannot block a blank target".to_string()));
        }
        let record = BlockedTarget::new(
            deposit_id,
            target,
            state,
            message,
            self.time_provider.now_millis(),
        );
        self.repo.block(&record).await?;
        warn!(deposit_id, target, state = %state, "Target blocked");
        Ok(())
    }

    /// Resolve every active block of `target`.
    ///
    /// Returns the number of resolved records; `NotFound` when the target
    /// was not blocked.
    pub async fn unblock(&self, target: &str) -> Result<u64> {
        let resolved = self
            .repo
            .unblock(target, self.time_provider.now_millis())
            .await?;
        if resolved == 0 {
            return Err(AppError::NotFound(format!("Target '{}' is not blocked", target)));
        }
        info!(target, resolved, "Target unblocked");
        Ok(resolved)
    }

    /// Active blocks, or the full history of one target
    pub async fn list(&self, target: Option<&str>) -> Result<Vec<BlockedTarget>> {
        match target {
            Some(target) => self.repo.find_by_target(target).await,
            None => self.repo.find_active().await,
        }
    }
}
