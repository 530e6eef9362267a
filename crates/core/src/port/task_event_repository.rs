// Task Event Repository Port (Interface)

use crate::domain::TaskEvent;
use crate::error::Result;
use async_trait::async_trait;

/// Insert-only store for task lifecycle events
#[async_trait]
pub trait TaskEventRepository: Send + Sync {
    /// Append an event
    async fn insert(&self, event: &TaskEvent) -> Result<()>;

    /// All events of a deposit, oldest first
    async fn find_by_deposit_id(&self, deposit_id: &str) -> Result<Vec<TaskEvent>>;

    /// Most recent events across all deposits, newest first
    async fn find_recent(&self, limit: i64) -> Result<Vec<TaskEvent>>;
}

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct InMemoryTaskEventRepository {
        events: Arc<Mutex<Vec<TaskEvent>>>,
    }

    impl InMemoryTaskEventRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn all(&self) -> Vec<TaskEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TaskEventRepository for InMemoryTaskEventRepository {
        async fn insert(&self, event: &TaskEvent) -> Result<()> {
            self.events.lock().unwrap().push(event.clone());
            Ok(())
        }

        async fn find_by_deposit_id(&self, deposit_id: &str) -> Result<Vec<TaskEvent>> {
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.deposit_id == deposit_id)
                .cloned()
                .collect())
        }

        async fn find_recent(&self, limit: i64) -> Result<Vec<TaskEvent>> {
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .rev()
                .take(limit.max(0) as usize)
                .cloned()
                .collect())
        }
    }
}
