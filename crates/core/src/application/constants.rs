// Ingest constants (no magic values)
use std::time::Duration;

/// Worker pool size shared by all targets
pub const DEFAULT_WORKER_POOL_SIZE: usize = 4;

/// Batches that may be listed and enqueued at the same time (one per area)
pub const DEFAULT_MAX_CONCURRENT_ENQUEUES: usize = 3;

/// Sleep between two lock-state polls of the remote backend
pub const DEFAULT_UNLOCK_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lock-state polls before giving up on a dataset
pub const DEFAULT_UNLOCK_MAX_RETRIES: u32 = 30;

/// Interval between two scans of the auto-ingest inbox
pub const DEFAULT_AUTO_INGEST_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Sleep after a failed inbox scan before the next attempt
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Bounded wait for in-flight task sequences on shutdown
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);
