// Application Layer - Ingest use cases and scheduling

pub mod area;
pub mod blocked;
pub mod constants;
pub mod enqueue;
pub mod events;
pub mod ingest;
pub mod sequence;
pub mod shutdown;

// Re-exports
pub use area::{Area, AreaConfig, AreaKind, AutoIngestScanner, ImportRequest};
pub use blocked::BlockedTargetService;
pub use enqueue::{BatchRequest, BatchSource, EnqueueSummary, EnqueuingService};
pub use events::TaskEventService;
pub use ingest::{
    AuthorizationSettings, DepositIngestTask, IngestContext, IngestError, IngestSettings,
    TaskOptions,
};
pub use sequence::{SequenceStats, TargetedTask, TargetedTaskSequenceManager};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
