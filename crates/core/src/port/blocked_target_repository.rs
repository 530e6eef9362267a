// Blocked Target Repository Port (Interface)

use crate::domain::BlockedTarget;
use crate::error::Result;
use async_trait::async_trait;

/// Durable registry of blocked targets.
///
/// Reads must observe the latest committed write.
#[async_trait]
pub trait BlockedTargetRepository: Send + Sync {
    /// True iff an active (not unblocked) record exists for `target`
    async fn is_blocked(&self, target: &str) -> Result<bool>;

    /// Insert a new active record
    async fn block(&self, record: &BlockedTarget) -> Result<()>;

    /// Resolve all active records of `target`; returns how many were resolved
    async fn unblock(&self, target: &str, unblocked_at: i64) -> Result<u64>;

    /// Full history of `target`, oldest first
    async fn find_by_target(&self, target: &str) -> Result<Vec<BlockedTarget>>;

    /// All active records, oldest first
    async fn find_active(&self) -> Result<Vec<BlockedTarget>>;
}

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct InMemoryBlockedTargetRepository {
        records: Arc<Mutex<Vec<BlockedTarget>>>,
    }

    impl InMemoryBlockedTargetRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn all(&self) -> Vec<BlockedTarget> {
            self.records.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BlockedTargetRepository for InMemoryBlockedTargetRepository {
        async fn is_blocked(&self, target: &str) -> Result<bool> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .any(|r| r.target == target && r.is_active()))
        }

        async fn block(&self, record: &BlockedTarget) -> Result<()> {
            self.records.lock().unwrap().push(record.clone());
            Ok(())
        }

        async fn unblock(&self, target: &str, unblocked_at: i64) -> Result<u64> {
            let mut count = 0;
            for record in self.records.lock().unwrap().iter_mut() {
                if record.target == target && record.is_active() {
                    record.unblocked_at = Some(unblocked_at);
                    count += 1;
                }
            }
            Ok(count)
        }

        async fn find_by_target(&self, target: &str) -> Result<Vec<BlockedTarget>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.target == target)
                .cloned()
                .collect())
        }

        async fn find_active(&self) -> Result<Vec<BlockedTarget>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.is_active())
                .cloned()
                .collect())
        }
    }
}
