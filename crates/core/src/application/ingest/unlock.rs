// Unlock poller: waits for the backend to release a dataset lock

use super::error::IngestError;
use crate::port::{DatasetRef, LockState, RemoteRepository};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct UnlockPoller {
    interval: Duration,
    max_retries: u32,
}

impl UnlockPoller {
    pub fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries: max_retries.max(1),
        }
    }

    /// Poll the lock state at a fixed interval until it is released.
    ///
    /// Returns `UnlockTimeout` once `max_retries` polls all saw a lock.
    /// `after_mutation` tells whether a mutating call preceded this poll, so a
    /// failed lock lookup is classified accordingly.
    pub async fn await_unlock(
        &self,
        remote: &dyn RemoteRepository,
        dataset: &DatasetRef,
        after_mutation: bool,
    ) -> Result<(), IngestError> {
        for attempt in 1..=self.max_retries {
            let state = remote
                .get_lock_state(dataset)
                .await
                .map_err(|e| IngestError::remote(e, after_mutation))?;
            if state == LockState::Unlocked {
                return Ok(());
            }
            debug!(
                dataset = %dataset.persistent_id,
                attempt,
                max_retries = self.max_retries,
                "Dataset locked, waiting"
            );
            if attempt < self.max_retries {
                tokio::time::sleep(self.interval).await;
            }
        }
        Err(IngestError::UnlockTimeout {
            dataset: dataset.persistent_id.clone(),
            attempts: self.max_retries,
        })
    }
}
