// Task Event Service
// Append-only audit trail of deposit lifecycle events

use crate::domain::{EventResult, EventType, TaskEvent};
use crate::error::Result;
use crate::port::{TaskEventRepository, TimeProvider};
use std::sync::Arc;
use tracing::{debug, error};

/// Upper bound for `recent` queries
pub const MAX_RECENT_EVENTS: i64 = 1000;

pub struct TaskEventService {
    repo: Arc<dyn TaskEventRepository>,
    time_provider: Arc<dyn TimeProvider>,
}

impl TaskEventService {
    pub fn new(repo: Arc<dyn TaskEventRepository>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            repo,
            time_provider,
        }
    }

    /// Append an event stamped with the current time
    pub async fn record(
        &self,
        deposit_id: &str,
        event_type: EventType,
        result: EventResult,
        message: Option<String>,
    ) -> Result<()> {
        let event = TaskEvent::new(
            deposit_id,
            event_type,
            result,
            message,
            self.time_provider.now_millis(),
        );
        self.repo.insert(&event).await?;
        debug!(deposit_id, event_type = %event_type, result = %result, "Task event recorded");
        Ok(())
    }

    /// Append an event; a storage failure is logged, never propagated.
    ///
    /// Used on the task path, where losing an audit row must not change the
    /// outcome of the deposit itself.
    pub async fn record_logged(
        &self,
        deposit_id: &str,
        event_type: EventType,
        result: EventResult,
        message: Option<String>,
    ) {
        if let Err(e) = self.record(deposit_id, event_type, result, message).await {
            error!(deposit_id, event_type = %event_type, error = %e, "Failed to record task event");
        }
    }

    pub async fn for_deposit(&self, deposit_id: &str) -> Result<Vec<TaskEvent>> {
        self.repo.find_by_deposit_id(deposit_id).await
    }

    /// Most recent events first, capped at `MAX_RECENT_EVENTS`
    pub async fn recent(&self, limit: i64) -> Result<Vec<TaskEvent>> {
        self.repo
            .find_recent(limit.clamp(1, MAX_RECENT_EVENTS))
            .await
    }
}
